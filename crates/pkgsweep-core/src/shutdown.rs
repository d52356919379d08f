//! Graceful shutdown support via atomic flag

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, LazyLock};

use signal_hook::consts::{SIGINT, SIGTERM};

/// Exit status on a second signal, as shells report an interrupt
const FORCE_EXIT_CODE: i32 = 130;

static FLAG: LazyLock<Arc<AtomicBool>> = LazyLock::new(|| Arc::new(AtomicBool::new(false)));

/// Process-wide shutdown flag, set by SIGTERM/SIGINT once
/// [`install_signal_handlers`] ran
pub fn shutdown_flag() -> &'static AtomicBool {
    &FLAG
}

/// Route SIGINT/SIGTERM to the shutdown flag.
///
/// First signal: set the flag. The pipeline polls it between shards, so the
/// shard in flight is still written before the process stops.
/// Second signal: exit immediately with status 130.
pub fn install_signal_handlers() -> std::io::Result<()> {
    for sig in [SIGINT, SIGTERM] {
        // Registered first so it sees the flag as it was before this signal.
        signal_hook::flag::register_conditional_shutdown(
            sig,
            FORCE_EXIT_CODE,
            Arc::clone(&FLAG),
        )?;
        signal_hook::flag::register(sig, Arc::clone(&FLAG))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    // Only one signal may be raised in this test binary: a second one
    // would take the force-exit path.
    #[test]
    fn first_signal_sets_flag_without_exiting() {
        install_signal_handlers().unwrap();
        assert!(!shutdown_flag().load(Ordering::Relaxed));

        signal_hook::low_level::raise(SIGTERM).unwrap();

        assert!(shutdown_flag().load(Ordering::Relaxed));
    }
}
