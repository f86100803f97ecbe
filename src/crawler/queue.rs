//! Shared task queue for the worker pool
//!
//! This module provides a multi-producer, multi-consumer FIFO queue with:
//! - Optional capacity with backpressure on producers
//! - Suspension of consumers while the queue is empty and open
//! - Worker accounting done atomically with dequeue
//! - One-shot closing, on quiescence or with the remaining tasks discarded

use crate::state::WorkerState;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio::sync::{Notify, Semaphore};

/// Errors returned by the task queue and the worker pool
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    /// A task was pushed after the queue was closed
    #[error("Task queue is closed")]
    Closed,

    #[error("Worker pool needs at least one worker")]
    NoWorkers,

    /// A smaller queue can leave every worker blocked on a full queue
    #[error("Queue capacity {capacity} is below the worker count {workers}")]
    CapacityBelowWorkers { capacity: usize, workers: usize },
}

struct QueueState<T> {
    pending: VecDeque<T>,
    closed: bool,
}

/// FIFO task queue shared by the pool's workers and task producers
///
/// With a capacity, [`TaskQueue::push`] waits for a free slot, which throttles
/// frontier growth. Without one the queue grows without limit.
pub struct TaskQueue<T> {
    state: Mutex<QueueState<T>>,
    /// Wakes consumers on push and on close
    available: Notify,
    /// Free slots when bounded
    slots: Option<Semaphore>,
}

impl<T> TaskQueue<T> {
    /// Creates a queue
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum number of queued tasks, `None` for unbounded
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            state: Mutex::new(QueueState {
                pending: VecDeque::new(),
                closed: false,
            }),
            available: Notify::new(),
            slots: capacity.map(|c| Semaphore::new(c.clamp(1, Semaphore::MAX_PERMITS))),
        }
    }

    /// Creates an unbounded queue
    pub fn unbounded() -> Self {
        Self::new(None)
    }

    /// Pushes a task to the back of the queue
    ///
    /// Waits for a free slot when the queue is bounded and full.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The task was queued
    /// * `Err(PoolError::Closed)` - The queue was closed before the task got in
    pub async fn push(&self, task: T) -> Result<(), PoolError> {
        if let Some(slots) = &self.slots {
            // The slot is handed back by `pop`, not by the permit's drop.
            slots.acquire().await.map_err(|_| PoolError::Closed)?.forget();
        }

        {
            let mut state = self.lock();
            if state.closed {
                return Err(PoolError::Closed);
            }
            state.pending.push_back(task);
        }

        self.available.notify_one();
        Ok(())
    }

    /// Pops the next task on behalf of a worker
    ///
    /// The worker is marked as processing under the queue lock, in the same
    /// critical section that removes the task. Suspends while the queue is
    /// empty and open.
    ///
    /// # Returns
    ///
    /// * `Some(T)` - The next task; `worker` is now processing
    /// * `None` - The queue is closed and drained
    pub async fn pop(&self, worker: &WorkerState) -> Option<T> {
        loop {
            // Register interest before looking at the state so a push or close
            // landing between the check and the await is not missed.
            let notified = self.available.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.lock();
                if let Some(task) = state.pending.pop_front() {
                    worker.begin_task();
                    drop(state);
                    if let Some(slots) = &self.slots {
                        slots.add_permits(1);
                    }
                    return Some(task);
                }
                if state.closed {
                    return None;
                }
            }

            notified.await;
        }
    }

    /// Closes the queue if nothing is queued and no worker is processing
    ///
    /// Both conditions are evaluated under the queue lock. Workers only become
    /// processing inside that lock, and a processing worker only goes idle
    /// after its pushes have landed, so a `true` answer is final.
    ///
    /// # Returns
    ///
    /// `true` if this call closed the queue
    pub fn close_if_quiescent(&self, workers: &[Arc<WorkerState>]) -> bool {
        let mut state = self.lock();
        if state.closed
            || !state.pending.is_empty()
            || workers.iter().any(|w| w.is_processing())
        {
            return false;
        }

        state.closed = true;
        drop(state);
        self.wake_all();
        true
    }

    /// Closes the queue and drops every task still waiting in it
    ///
    /// # Returns
    ///
    /// The number of tasks discarded
    pub fn close_and_discard(&self) -> usize {
        let discarded = {
            let mut state = self.lock();
            state.closed = true;
            let discarded = state.pending.len();
            state.pending.clear();
            discarded
        };
        self.wake_all();
        discarded
    }

    /// Returns the number of queued tasks
    pub fn len(&self) -> usize {
        self.lock().pending.len()
    }

    /// Returns whether the queue holds no task
    pub fn is_empty(&self) -> bool {
        self.lock().pending.is_empty()
    }

    /// Returns whether the queue has been closed
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    fn wake_all(&self) {
        if let Some(slots) = &self.slots {
            slots.close();
        }
        self.available.notify_waiters();
    }

    fn lock(&self) -> MutexGuard<'_, QueueState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
