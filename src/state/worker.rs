use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Idle/processing flag of one pool worker
///
/// The flag is written only by the worker that owns it and read by the pool's
/// quiescence check. A worker is processing from the moment it dequeues a task
/// until its handler has returned, including every task the handler enqueued.
///
/// The transition to processing happens inside the task queue's lock (see
/// `TaskQueue::pop`), so the quiescence check, which holds the same lock,
/// never sees a dequeued task that is not yet accounted for.
#[derive(Debug)]
pub struct WorkerState {
    id: usize,
    processing: AtomicBool,
    tasks_completed: AtomicU64,
}

impl WorkerState {
    /// Creates an idle worker state
    pub fn new(id: usize) -> Self {
        Self {
            id,
            processing: AtomicBool::new(false),
            tasks_completed: AtomicU64::new(0),
        }
    }

    /// Returns the worker's id
    pub fn id(&self) -> usize {
        self.id
    }

    /// Returns true while the worker is handling a task
    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::Acquire)
    }

    /// Returns how many tasks this worker has finished
    pub fn tasks_completed(&self) -> u64 {
        self.tasks_completed.load(Ordering::Relaxed)
    }

    /// Marks the worker as processing
    pub(crate) fn begin_task(&self) {
        self.processing.store(true, Ordering::Release);
    }

    /// Marks the worker as idle
    ///
    /// Must only be called after every side effect of the task, enqueues in
    /// particular, has completed.
    pub(crate) fn finish_task(&self) {
        self.tasks_completed.fetch_add(1, Ordering::Relaxed);
        self.processing.store(false, Ordering::Release);
    }
}
