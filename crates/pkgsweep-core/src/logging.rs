//! Logging utilities with indicatif integration

use std::fs::File;

use indicatif::MultiProgress;

/// Where log lines go.
pub enum LogTarget<'a> {
    /// Interactive terminal: colored, routed around progress bars
    Tty(&'a MultiProgress),
    /// Plain stderr (pipes, CI)
    Stderr,
    /// Log file: plain lines with timestamps
    File(File),
}

/// ANSI color code and padded label for a log level.
fn level_style(level: log::Level, color: bool) -> (&'static str, &'static str, &'static str) {
    let label = match level {
        log::Level::Error => "ERROR",
        log::Level::Warn => "WARN ",
        log::Level::Info => "INFO ",
        log::Level::Debug => "DEBUG",
        log::Level::Trace => "TRACE",
    };
    if !color {
        return ("", label, "");
    }
    let ansi = match level {
        log::Level::Error => "\x1b[31m",
        log::Level::Warn => "\x1b[33m",
        log::Level::Info => "\x1b[32m",
        log::Level::Debug => "\x1b[36m",
        log::Level::Trace => "\x1b[35m",
    };
    (ansi, label, "\x1b[0m")
}

/// Logger that prints through indicatif MultiProgress to avoid mixing with progress bars.
pub struct IndicatifLogger {
    inner: env_logger::Logger,
    multi: MultiProgress,
}

impl IndicatifLogger {
    pub fn new(inner: env_logger::Logger, multi: MultiProgress) -> Self {
        Self { inner, multi }
    }
}

impl log::Log for IndicatifLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.inner.enabled(metadata)
    }

    fn log(&self, record: &log::Record) {
        if self.inner.enabled(record.metadata()) {
            let (pre, label, post) = level_style(record.level(), true);
            let line = format!("[{pre}{label}{post}] {}", record.args());
            self.multi.suspend(|| eprintln!("{line}"));
        }
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

/// Default filter: `debug` wins over `quiet`, `RUST_LOG` overrides both.
fn default_level(quiet: bool, debug: bool) -> &'static str {
    if debug {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    }
}

/// Initialize logging for the given target.
pub fn init_logging(quiet: bool, debug: bool, target: LogTarget<'_>) {
    use std::io::Write;

    let env = env_logger::Env::default().default_filter_or(default_level(quiet, debug));

    match target {
        LogTarget::Tty(multi) => {
            let logger = env_logger::Builder::from_env(env)
                .format_timestamp_millis()
                .build();
            let max_level = logger.filter();

            log::set_boxed_logger(Box::new(IndicatifLogger::new(logger, multi.clone())))
                .expect("failed to init logger");
            log::set_max_level(max_level);
        }
        LogTarget::Stderr => {
            env_logger::Builder::from_env(env)
                .format(|buf, record| {
                    let (_, label, _) = level_style(record.level(), false);
                    writeln!(buf, "[{label}] {}", record.args())
                })
                .init();
        }
        LogTarget::File(file) => {
            env_logger::Builder::from_env(env)
                .format(|buf, record| {
                    let (_, label, _) = level_style(record.level(), false);
                    writeln!(buf, "{} [{label}] {}", buf.timestamp_millis(), record.args())
                })
                .target(env_logger::Target::Pipe(Box::new(file)))
                .init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_labels_are_padded() {
        for level in [
            log::Level::Error,
            log::Level::Warn,
            log::Level::Info,
            log::Level::Debug,
            log::Level::Trace,
        ] {
            let (_, label, _) = level_style(level, false);
            assert_eq!(label.len(), 5);
        }
    }

    #[test]
    fn no_color_has_no_escapes() {
        let (pre, _, post) = level_style(log::Level::Error, false);
        assert!(pre.is_empty() && post.is_empty());
    }

    #[test]
    fn debug_overrides_quiet() {
        assert_eq!(default_level(true, true), "debug");
        assert_eq!(default_level(true, false), "warn");
        assert_eq!(default_level(false, false), "info");
    }
}
