//! Capacity-bounded task engine.
//!
//! Every network phase in spyglass funnels through [`run_all`]: spawn one
//! task per work item, bound the remote-I/O section with a [`Limiter`], and
//! join every task before returning. Nothing outlives the call, and one
//! item's failure never takes down its siblings.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tracing::warn;

/// Invoked once per completed work item, regardless of outcome. Used for
/// operator-facing progress bars.
pub type ProgressFn = Arc<dyn Fn() + Send + Sync>;

/// Bounds the number of work items simultaneously inside their remote-I/O
/// section. Created per logical phase and discarded at phase end.
///
/// The permit is RAII: it is released exactly once, including on failure and
/// timeout paths.
#[derive(Clone)]
pub struct Limiter {
    slots: Arc<Semaphore>,
}

impl Limiter {
    pub fn new(ceiling: usize) -> Self {
        Self {
            slots: Arc::new(Semaphore::new(ceiling)),
        }
    }

    pub async fn acquire(&self) -> OwnedSemaphorePermit {
        self.slots
            .clone()
            .acquire_owned()
            .await
            .expect("limiter semaphore closed")
    }
}

/// Append-only collection written concurrently by the tasks of one phase.
/// Readers drain it only after the phase has fully joined; completion order
/// within a phase is unspecified, so contents are order-independent.
pub struct ResultSink<T> {
    entries: Arc<Mutex<Vec<T>>>,
}

impl<T> Clone for ResultSink<T> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<T> Default for ResultSink<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ResultSink<T> {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub async fn push(&self, item: T) {
        self.entries.lock().await.push(item);
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Takes everything collected so far. Call after the owning phase joined.
    pub async fn drain(&self) -> Vec<T> {
        std::mem::take(&mut *self.entries.lock().await)
    }
}

/// Runs every item to completion and returns only once all spawned tasks
/// have finished. An empty input completes immediately.
///
/// Handlers are expected to be independently fault-tolerant and record their
/// results through a shared [`ResultSink`]; a panicking handler is logged
/// and counts as completed.
pub async fn run_all<T, F, Fut>(items: Vec<T>, handler: F, progress: Option<ProgressFn>)
where
    T: Send + 'static,
    F: Fn(T) -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    let mut tasks = JoinSet::new();
    for item in items {
        tasks.spawn(handler(item));
    }

    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            warn!("worker task failed: {}", e);
        }
        if let Some(ref progress) = progress {
            progress();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// The number of items simultaneously past the acquire point never
    /// exceeds the limiter's ceiling.
    #[tokio::test]
    async fn limiter_ceiling_is_never_exceeded() {
        const CEILING: usize = 5;
        const ITEMS: usize = 40;

        let limiter = Limiter::new(CEILING);
        let in_flight = Arc::new(AtomicUsize::new(0));
        let high_water = Arc::new(AtomicUsize::new(0));

        run_all(
            (0..ITEMS).collect(),
            |_| {
                let limiter = limiter.clone();
                let in_flight = in_flight.clone();
                let high_water = high_water.clone();
                async move {
                    let _permit = limiter.acquire().await;
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    high_water.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                }
            },
            None,
        )
        .await;

        assert!(
            high_water.load(Ordering::SeqCst) <= CEILING,
            "observed {} concurrent items with ceiling {}",
            high_water.load(Ordering::SeqCst),
            CEILING
        );
    }

    /// The phase returns only after every item reached a terminal outcome,
    /// and the progress callback fires once per item even for failures.
    #[tokio::test]
    async fn every_item_reaches_a_terminal_outcome() {
        const ITEMS: usize = 30;

        let completed = Arc::new(AtomicUsize::new(0));
        let progressed = Arc::new(AtomicUsize::new(0));

        let progressed_clone = progressed.clone();
        let progress: ProgressFn = Arc::new(move || {
            progressed_clone.fetch_add(1, Ordering::SeqCst);
        });

        run_all(
            (0..ITEMS).collect(),
            |i: usize| {
                let completed = completed.clone();
                async move {
                    // Odd items "fail" by bailing early; they still count.
                    if i % 2 == 0 {
                        tokio::time::sleep(Duration::from_millis(2)).await;
                    }
                    completed.fetch_add(1, Ordering::SeqCst);
                }
            },
            Some(progress),
        )
        .await;

        assert_eq!(completed.load(Ordering::SeqCst), ITEMS);
        assert_eq!(progressed.load(Ordering::SeqCst), ITEMS);
    }

    #[tokio::test]
    async fn a_panicking_item_does_not_abort_its_siblings() {
        let completed = Arc::new(AtomicUsize::new(0));

        run_all(
            (0..10).collect(),
            |i: usize| {
                let completed = completed.clone();
                async move {
                    if i == 3 {
                        panic!("boom");
                    }
                    completed.fetch_add(1, Ordering::SeqCst);
                }
            },
            None,
        )
        .await;

        assert_eq!(completed.load(Ordering::SeqCst), 9);
    }

    #[tokio::test]
    async fn empty_input_completes_immediately() {
        let touched = Arc::new(AtomicUsize::new(0));
        let touched_clone = touched.clone();
        run_all(
            Vec::<u32>::new(),
            move |_| {
                let touched = touched_clone.clone();
                async move {
                    touched.fetch_add(1, Ordering::SeqCst);
                }
            },
            None,
        )
        .await;
        assert_eq!(touched.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn concurrent_sink_appends_lose_nothing() {
        let sink: ResultSink<usize> = ResultSink::new();
        run_all(
            (0..100).collect(),
            |i: usize| {
                let sink = sink.clone();
                async move {
                    sink.push(i).await;
                }
            },
            None,
        )
        .await;

        let mut entries = sink.drain().await;
        entries.sort_unstable();
        assert_eq!(entries, (0..100).collect::<Vec<_>>());
    }
}
