//! Blocking FIFO of tasks with a shutdown/restart state machine.

use super::handle::ResultHandle;
use super::task::Task;
use crate::error::BoxError;
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::collections::VecDeque;
use std::fmt;
use std::mem;

// sequence and flag always change together under one lock
#[derive(Default)]
struct QueueState {
    tasks: VecDeque<Task>,
    done: bool,
}

/// Unbounded task queue shared between producers and one consumer.
///
/// Once [`shutdown`](TaskQueue::shutdown) is called, [`wait_and_pop`]
/// returns `None` without blocking until the queue is
/// [`restart`](TaskQueue::restart)ed. Tasks left in the queue stay there;
/// they are not handed out while the queue is shut down.
///
/// [`wait_and_pop`]: TaskQueue::wait_and_pop
#[derive(Default)]
pub struct TaskQueue {
    state: Mutex<QueueState>,
    available: Condvar,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move construction: takes `donor`'s tasks and shutdown flag, then
    /// marks `donor` done and wakes anything blocked on it.
    pub fn take(donor: &TaskQueue) -> TaskQueue {
        let (tasks, done) = {
            let mut theirs = donor.state.lock();
            let tasks = mem::take(&mut theirs.tasks);
            let done = mem::replace(&mut theirs.done, true);
            (tasks, done)
        };
        donor.available.notify_all();

        TaskQueue {
            state: Mutex::new(QueueState { tasks, done }),
            available: Condvar::new(),
        }
    }

    /// Move assignment: replaces this queue's contents with `donor`'s.
    ///
    /// Both locks are held for the transfer. The tasks this queue held
    /// before are returned so the caller can drop them outside the lock.
    /// Assigning a queue from itself is a no-op.
    pub fn take_from(&self, donor: &TaskQueue) -> Vec<Task> {
        if std::ptr::eq(self, donor) {
            return Vec::new();
        }

        let displaced = {
            let (mut mine, mut theirs) = self.lock_pair(donor);
            let incoming = mem::take(&mut theirs.tasks);
            let displaced = mem::replace(&mut mine.tasks, incoming);
            mine.done = mem::replace(&mut theirs.done, true);
            displaced
        };

        donor.available.notify_all();
        self.available.notify_all();

        displaced.into()
    }

    // always lock in address order so two opposite transfers cannot deadlock
    fn lock_pair<'a>(
        &'a self,
        other: &'a TaskQueue,
    ) -> (MutexGuard<'a, QueueState>, MutexGuard<'a, QueueState>) {
        if (self as *const TaskQueue) < (other as *const TaskQueue) {
            let mine = self.state.lock();
            let theirs = other.state.lock();
            (mine, theirs)
        } else {
            let theirs = other.state.lock();
            let mine = self.state.lock();
            (mine, theirs)
        }
    }

    pub fn push(&self, task: Task) {
        self.state.lock().tasks.push_back(task);
        self.available.notify_one();
    }

    /// Build a task from `f`, queue it, and return its handle.
    pub fn push_task<F, T>(&self, f: F) -> ResultHandle<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (task, handle) = Task::new(f);
        self.push(task);
        handle
    }

    pub fn push_fallible<F, T, E>(&self, f: F) -> ResultHandle<T>
    where
        F: FnOnce() -> std::result::Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: Into<BoxError>,
    {
        let (task, handle) = Task::fallible(f);
        self.push(task);
        handle
    }

    /// Non-blocking pop. `None` if the queue is empty or shut down.
    pub fn try_pop(&self) -> Option<Task> {
        let mut state = self.state.lock();
        if state.done {
            return None;
        }
        state.tasks.pop_front()
    }

    /// Block until a task is available or the queue is shut down.
    ///
    /// `None` means shut down.
    pub fn wait_and_pop(&self) -> Option<Task> {
        let mut state = self.state.lock();
        self.available
            .wait_while(&mut state, |s| !s.done && s.tasks.is_empty());

        if state.done {
            return None;
        }
        state.tasks.pop_front()
    }

    /// Idempotent. Wakes every blocked consumer.
    pub fn shutdown(&self) {
        self.state.lock().done = true;
        self.available.notify_all();
    }

    /// Clear the shutdown flag.
    ///
    /// Only call this when no thread is popping from the queue.
    pub fn restart(&self) {
        self.state.lock().done = false;
    }

    pub fn is_done(&self) -> bool {
        self.state.lock().done
    }

    pub fn len(&self) -> usize {
        self.state.lock().tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().tasks.is_empty()
    }

    /// Remove every queued task regardless of the shutdown flag.
    pub fn drain(&self) -> Vec<Task> {
        mem::take(&mut self.state.lock().tasks).into()
    }
}

impl fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("TaskQueue")
            .field("len", &state.tasks.len())
            .field("done", &state.done)
            .finish()
    }
}
