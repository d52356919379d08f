//! Staggered fan-out: one task per item, started on an absolute schedule.
//!
//! Item `i` starts `i * interval` after the call, independent of how fast
//! earlier items finish. The number of requests in flight therefore ramps
//! up linearly instead of being fixed by a worker count; the shard size
//! bounds the total. [`Pacing::max_in_flight`] adds an optional hard
//! ceiling on top of the schedule.
//!
//! All tasks are joined on the caller's task (nothing is spawned), so on a
//! current-thread runtime the whole shard runs on one thread and results
//! come back in input order regardless of completion order.

use std::future::Future;
use std::num::NonZeroUsize;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::sync::Semaphore;
use tokio::time::Instant;

use crate::progress::Tracker;

/// Request pacing for one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    /// Offset between consecutive task starts
    pub interval: Duration,
    /// Optional ceiling on tasks running at once; `None` = schedule only
    pub max_in_flight: Option<NonZeroUsize>,
}

impl Pacing {
    pub fn every(interval: Duration) -> Self {
        Self {
            interval,
            max_in_flight: None,
        }
    }

    /// Start offset of item `i` relative to the schedule origin
    pub fn offset_of(&self, i: usize) -> Duration {
        self.interval
            .saturating_mul(u32::try_from(i).unwrap_or(u32::MAX))
    }
}

/// Run `task` once per item and wait for all of them.
///
/// Returns after every task has produced its value; there is no overall
/// deadline. `tracker` is advanced once per completion.
pub async fn stagger<'a, T, R, F, Fut>(
    items: &'a [T],
    pacing: &Pacing,
    tracker: &Tracker,
    task: F,
) -> Vec<R>
where
    F: Fn(&'a T) -> Fut,
    Fut: Future<Output = R>,
{
    let origin = Instant::now();
    let limiter = pacing.max_in_flight.map(|n| Semaphore::new(n.get()));
    let limiter = limiter.as_ref();
    let task = &task;

    let pending = items.iter().enumerate().map(|(i, item)| {
        let start_at = origin + pacing.offset_of(i);
        async move {
            tokio::time::sleep_until(start_at).await;
            // The semaphore is never closed, so acquire only fails if it were.
            let _permit = match limiter {
                Some(sem) => sem.acquire().await.ok(),
                None => None,
            };
            let result = task(item).await;
            tracker.complete();
            result
        }
    });

    join_all(pending).await
}
