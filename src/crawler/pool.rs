//! Worker pool for draining a self-feeding task queue
//!
//! This module handles:
//! - Running a fixed number of concurrent workers over one shared queue
//! - Letting task handlers enqueue more tasks while the pool runs
//! - Detecting quiescence (nothing queued, nothing in flight) by polling
//! - Isolating handler panics so a failing task never costs a worker
//! - Honoring an external cancellation token

use crate::crawler::queue::{PoolError, TaskQueue};
use crate::state::WorkerState;
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// How a [`WorkerPool::process_tasks`] call ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolOutcome {
    /// Tasks taken off the queue and handed to the handler
    ///
    /// Counts every dispatched task, including handlers that panicked or
    /// returned early because of cancellation.
    pub tasks_processed: u64,

    /// Whether the run was stopped by the cancellation token
    pub cancelled: bool,

    /// Queued tasks dropped without being dispatched because of cancellation
    pub discarded_tasks: usize,
}

/// Fixed-size pool of workers sharing one growing task queue
///
/// Tasks may be added before [`WorkerPool::process_tasks`] starts and from
/// inside running handlers. Termination is detected by a supervisor that wakes
/// every `poll_interval` and closes the queue once no task is queued and every
/// worker is idle. A worker stays processing until its handler future has
/// completed, so tasks a handler enqueues are always visible to the check
/// before the worker goes idle.
///
/// The queue is closed exactly once; a pool is good for one run.
pub struct WorkerPool<T> {
    queue: Arc<TaskQueue<T>>,
    workers: Vec<Arc<WorkerState>>,
    poll_interval: Duration,
}

impl<T> WorkerPool<T>
where
    T: Clone + Send + 'static,
{
    /// Creates a new pool
    ///
    /// # Arguments
    ///
    /// * `worker_count` - Number of concurrent workers, at least one
    /// * `queue_capacity` - Queue bound, `None` for unbounded; never below `worker_count`
    /// * `poll_interval` - Time between quiescence checks
    ///
    /// # Returns
    ///
    /// * `Ok(WorkerPool)` - Ready to accept tasks
    /// * `Err(PoolError)` - No workers, or a queue smaller than the worker count
    pub fn new(
        worker_count: usize,
        queue_capacity: Option<usize>,
        poll_interval: Duration,
    ) -> Result<Self, PoolError> {
        if worker_count == 0 {
            return Err(PoolError::NoWorkers);
        }
        if let Some(capacity) = queue_capacity {
            if capacity < worker_count {
                return Err(PoolError::CapacityBelowWorkers {
                    capacity,
                    workers: worker_count,
                });
            }
        }

        let workers = (0..worker_count)
            .map(|id| Arc::new(WorkerState::new(id)))
            .collect();

        Ok(Self {
            queue: Arc::new(TaskQueue::new(queue_capacity)),
            workers,
            poll_interval: poll_interval.max(Duration::from_millis(1)),
        })
    }

    /// Adds a task to the shared queue
    ///
    /// Safe to call before the pool starts and concurrently from handlers.
    /// Waits for room when the queue is bounded and full.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The task was queued
    /// * `Err(PoolError::Closed)` - The pool has already shut down
    pub async fn add_task(&self, task: T) -> Result<(), PoolError> {
        self.queue.push(task).await
    }

    /// Runs the workers until the queue drains or `cancel` fires
    ///
    /// Each worker loops: dequeue a task (suspending while the queue is empty
    /// and open), run `handler` on it, go idle, repeat. A panic inside the
    /// handler is caught at the worker boundary and passed to `on_panic`
    /// together with the task; the worker then carries on. A panic inside
    /// `on_panic` itself is caught and logged as well.
    ///
    /// On cancellation the queue is closed and every queued task discarded.
    /// Handlers already running are awaited, so they should watch the same
    /// token to return promptly.
    ///
    /// Blocks until every worker has exited.
    pub async fn process_tasks<F, Fut, P>(
        &self,
        handler: F,
        on_panic: P,
        cancel: &CancellationToken,
    ) -> PoolOutcome
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
        P: Fn(T, String) + Send + Sync + 'static,
    {
        let handler = Arc::new(handler);
        let on_panic = Arc::new(on_panic);

        let handles: Vec<_> = self
            .workers
            .iter()
            .map(|worker| {
                tokio::spawn(run_worker(
                    worker.clone(),
                    self.queue.clone(),
                    handler.clone(),
                    on_panic.clone(),
                    cancel.clone(),
                ))
            })
            .collect();

        tracing::debug!("Started {} workers", handles.len());

        let discarded_tasks = self.supervise(cancel).await;

        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!("Worker task failed: {}", e);
            }
        }

        PoolOutcome {
            tasks_processed: self.workers.iter().map(|w| w.tasks_completed()).sum(),
            cancelled: discarded_tasks.is_some(),
            discarded_tasks: discarded_tasks.unwrap_or(0),
        }
    }

    /// Polls for quiescence until the queue is closed
    ///
    /// Returns `Some(discarded)` when the run was cancelled, `None` when the
    /// queue drained normally.
    async fn supervise(&self, cancel: &CancellationToken) -> Option<usize> {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    let discarded = self.queue.close_and_discard();
                    tracing::warn!(
                        "Cancellation requested, discarded {} queued tasks",
                        discarded
                    );
                    return Some(discarded);
                }

                _ = ticker.tick() => {
                    if self.queue.close_if_quiescent(&self.workers) {
                        tracing::debug!("Queue empty and all workers idle, shutting down");
                        return None;
                    }
                    tracing::trace!(
                        "Not quiescent yet: {} queued, {} busy workers",
                        self.queue.len(),
                        self.workers.iter().filter(|w| w.is_processing()).count()
                    );
                }
            }
        }
    }
}

/// Worker loop: dequeue, handle, go idle, until the queue is closed and drained
///
/// A cancelled worker stops taking tasks even if the supervisor has not
/// discarded the queue yet.
async fn run_worker<T, F, Fut, P>(
    worker: Arc<WorkerState>,
    queue: Arc<TaskQueue<T>>,
    handler: Arc<F>,
    on_panic: Arc<P>,
    cancel: CancellationToken,
) where
    T: Clone + Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
    P: Fn(T, String) + Send + Sync + 'static,
{
    while !cancel.is_cancelled() {
        let Some(task) = queue.pop(&worker).await else {
            break;
        };
        let _busy = BusyGuard(worker.as_ref());

        let input = task.clone();
        let outcome = AssertUnwindSafe(async { handler(input).await })
            .catch_unwind()
            .await;

        if let Err(payload) = outcome {
            let message = panic_message(payload.as_ref());
            tracing::error!("Worker {} task handler panicked: {}", worker.id(), message);

            let reported = panic::catch_unwind(AssertUnwindSafe(|| on_panic(task, message)));
            if let Err(payload) = reported {
                tracing::error!(
                    "Worker {} panic callback panicked: {}",
                    worker.id(),
                    panic_message(payload.as_ref())
                );
            }
        }
    }

    tracing::trace!("Worker {} exiting", worker.id());
}

/// Marks the worker idle when dropped, whichever way the task ended
struct BusyGuard<'a>(&'a WorkerState);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.finish_task();
    }
}

/// Extracts a readable message from a panic payload
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::time::{sleep, timeout};

    const POLL: Duration = Duration::from_millis(5);

    fn no_panic<T: 'static>() -> impl Fn(T, String) + Send + Sync + 'static {
        |_: T, message: String| panic!("unexpected handler panic: {}", message)
    }

    #[tokio::test]
    async fn test_process_tasks_with_reentrant_add() {
        let pool = Arc::new(WorkerPool::new(10, None, POLL).unwrap());

        for task in ["a", "b", "c", "d", "e", "f"] {
            pool.add_task(task.to_string()).await.unwrap();
        }

        let results = Arc::new(Mutex::new(Vec::new()));
        let handler = {
            let pool = pool.clone();
            let results = results.clone();
            move |letter: String| {
                let pool = pool.clone();
                let results = results.clone();
                async move {
                    let doubled = format!("{}{}", letter, letter);
                    results.lock().unwrap().push(doubled.clone());
                    if doubled == "ee" {
                        pool.add_task(doubled).await.unwrap();
                    }
                }
            }
        };

        let outcome = pool
            .process_tasks(handler, no_panic(), &CancellationToken::new())
            .await;

        let results = results.lock().unwrap();
        for expected in ["aa", "bb", "cc", "dd", "ee", "ff", "eeee"] {
            assert!(results.contains(&expected.to_string()), "missing {}", expected);
        }
        assert_eq!(results.len(), 7);
        assert_eq!(outcome.tasks_processed, 7);
        assert!(!outcome.cancelled);
    }

    #[tokio::test]
    async fn test_empty_pool_returns() {
        let pool: WorkerPool<u32> = WorkerPool::new(4, None, POLL).unwrap();

        let outcome = timeout(
            Duration::from_secs(2),
            pool.process_tasks(|_| async {}, no_panic(), &CancellationToken::new()),
        )
        .await
        .expect("pool with no tasks should shut down");

        assert_eq!(outcome.tasks_processed, 0);
    }

    /// Each task `n > 0` enqueues two children `n - 1`; the total is 2^(depth+1) - 1.
    async fn run_fan_out(workers: usize, capacity: Option<usize>, depth: u32) -> usize {
        let pool = Arc::new(WorkerPool::new(workers, capacity, POLL).unwrap());
        let processed = Arc::new(AtomicUsize::new(0));

        pool.add_task(depth).await.unwrap();

        let handler = {
            let pool = pool.clone();
            let processed = processed.clone();
            move |n: u32| {
                let pool = pool.clone();
                let processed = processed.clone();
                async move {
                    processed.fetch_add(1, Ordering::SeqCst);
                    if n > 0 {
                        pool.add_task(n - 1).await.unwrap();
                        pool.add_task(n - 1).await.unwrap();
                    }
                }
            }
        };

        pool.process_tasks(handler, no_panic(), &CancellationToken::new())
            .await;
        processed.load(Ordering::SeqCst)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_fan_out_is_complete_for_any_worker_count() {
        for workers in [1, 2, 3, 8, 32] {
            assert_eq!(run_fan_out(workers, None, 7).await, 255, "workers = {}", workers);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_fan_out_with_bounded_queue() {
        // a depth-3 tree never holds more than 8 queued tasks
        assert_eq!(run_fan_out(4, Some(8), 3).await, 15);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_late_enqueue_is_not_lost() {
        // The handler enqueues its follow-up only after sleeping across
        // several poll intervals, so the supervisor repeatedly observes an
        // empty queue while the enqueue is still pending.
        for _ in 0..20 {
            let pool = Arc::new(WorkerPool::new(3, None, Duration::from_millis(1)).unwrap());
            let processed = Arc::new(Mutex::new(Vec::new()));

            pool.add_task(0u32).await.unwrap();

            let handler = {
                let pool = pool.clone();
                let processed = processed.clone();
                move |n: u32| {
                    let pool = pool.clone();
                    let processed = processed.clone();
                    async move {
                        processed.lock().unwrap().push(n);
                        if n < 3 {
                            sleep(Duration::from_millis(10)).await;
                            pool.add_task(n + 1).await.unwrap();
                        }
                    }
                }
            };

            pool.process_tasks(handler, no_panic(), &CancellationToken::new())
                .await;

            let mut processed = processed.lock().unwrap().clone();
            processed.sort();
            assert_eq!(processed, vec![0, 1, 2, 3]);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_enqueue_racing_idle_flip() {
        // The enqueue is the very last thing the handler does, so the idle flip
        // follows it immediately while the supervisor polls every millisecond.
        for _ in 0..200 {
            let pool = Arc::new(WorkerPool::new(2, None, Duration::from_millis(1)).unwrap());
            let processed = Arc::new(AtomicUsize::new(0));

            pool.add_task(0u32).await.unwrap();

            let handler = {
                let pool = pool.clone();
                let processed = processed.clone();
                move |n: u32| {
                    let pool = pool.clone();
                    let processed = processed.clone();
                    async move {
                        processed.fetch_add(1, Ordering::SeqCst);
                        tokio::task::yield_now().await;
                        if n < 5 {
                            pool.add_task(n + 1).await.unwrap();
                        }
                    }
                }
            };

            pool.process_tasks(handler, no_panic(), &CancellationToken::new())
                .await;
            assert_eq!(processed.load(Ordering::SeqCst), 6);
        }
    }

    #[tokio::test]
    async fn test_panic_is_isolated() {
        let pool = Arc::new(WorkerPool::new(1, None, POLL).unwrap());
        for n in 0..5u32 {
            pool.add_task(n).await.unwrap();
        }

        let processed = Arc::new(AtomicUsize::new(0));
        let panicked = Arc::new(Mutex::new(Vec::new()));

        let handler = {
            let processed = processed.clone();
            move |n: u32| {
                let processed = processed.clone();
                async move {
                    if n % 2 == 0 {
                        panic!("task {} exploded", n);
                    }
                    processed.fetch_add(1, Ordering::SeqCst);
                }
            }
        };
        let on_panic = {
            let panicked = panicked.clone();
            move |n: u32, message: String| panicked.lock().unwrap().push((n, message))
        };

        let outcome = pool
            .process_tasks(handler, on_panic, &CancellationToken::new())
            .await;

        // the single worker survived every panic
        assert_eq!(processed.load(Ordering::SeqCst), 2);
        assert_eq!(outcome.tasks_processed, 5);

        let panicked = panicked.lock().unwrap();
        assert_eq!(panicked.len(), 3);
        assert!(panicked.contains(&(2, "task 2 exploded".to_string())));
    }

    #[tokio::test]
    async fn test_cancellation_discards_queued_tasks() {
        let pool = Arc::new(WorkerPool::new(1, None, POLL).unwrap());
        for n in 0..10u32 {
            pool.add_task(n).await.unwrap();
        }

        let cancel = CancellationToken::new();
        let processed = Arc::new(AtomicUsize::new(0));

        let handler = {
            let cancel = cancel.clone();
            let processed = processed.clone();
            move |_: u32| {
                let cancel = cancel.clone();
                let processed = processed.clone();
                async move {
                    processed.fetch_add(1, Ordering::SeqCst);
                    cancel.cancel();
                }
            }
        };

        let outcome = timeout(
            Duration::from_secs(2),
            pool.process_tasks(handler, no_panic(), &cancel),
        )
        .await
        .expect("cancelled pool should return promptly");

        assert!(outcome.cancelled);
        assert_eq!(processed.load(Ordering::SeqCst), 1);
        assert_eq!(outcome.discarded_tasks, 9);
        assert_eq!(pool.queue.len(), 0);
    }

    #[tokio::test]
    async fn test_add_task_after_shutdown_fails() {
        let pool: WorkerPool<u32> = WorkerPool::new(2, None, POLL).unwrap();
        pool.process_tasks(|_| async {}, no_panic(), &CancellationToken::new())
            .await;

        assert_eq!(pool.add_task(1).await, Err(PoolError::Closed));
        assert!(pool.workers.iter().all(|w| !w.is_processing()));
    }

    #[tokio::test]
    async fn test_panicking_panic_callback_still_shuts_down() {
        let pool = Arc::new(WorkerPool::new(2, None, POLL).unwrap());
        for n in 0..6u32 {
            pool.add_task(n).await.unwrap();
        }

        let processed = Arc::new(AtomicUsize::new(0));
        let handler = {
            let processed = processed.clone();
            move |n: u32| {
                let processed = processed.clone();
                async move {
                    if n == 1 {
                        panic!("task {} exploded", n);
                    }
                    processed.fetch_add(1, Ordering::SeqCst);
                }
            }
        };
        let on_panic = |n: u32, _: String| panic!("reporting task {} failed", n);

        let outcome = timeout(
            Duration::from_secs(2),
            pool.process_tasks(handler, on_panic, &CancellationToken::new()),
        )
        .await
        .expect("pool should shut down after a failing panic callback");

        assert!(!outcome.cancelled);
        assert_eq!(outcome.tasks_processed, 6);
        assert_eq!(processed.load(Ordering::SeqCst), 5);
        assert!(pool.workers.iter().all(|w| !w.is_processing()));
    }

    #[test]
    fn test_zero_workers_rejected() {
        let result: Result<WorkerPool<u32>, _> = WorkerPool::new(0, None, POLL);
        assert!(matches!(result, Err(PoolError::NoWorkers)));
    }

    #[test]
    fn test_capacity_below_worker_count_rejected() {
        let result: Result<WorkerPool<u32>, _> = WorkerPool::new(4, Some(3), POLL);
        assert!(matches!(
            result,
            Err(PoolError::CapacityBelowWorkers {
                capacity: 3,
                workers: 4
            })
        ));
        assert!(WorkerPool::<u32>::new(4, Some(4), POLL).is_ok());
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("static str");
        assert_eq!(panic_message(payload.as_ref()), "static str");

        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");

        let payload: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic payload");
    }
}
