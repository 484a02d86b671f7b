//! Task representation and execution.

use super::handle::ResultHandle;
use super::panic_handler::PanicHandler;
use crate::error::{BoxError, Error, Result};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Global task ID counter
static TASK_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    fn next() -> Self {
        TaskId(TASK_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

type TaskFn = Box<dyn FnOnce(&PanicHandler) -> bool + Send + 'static>;

/// A deferred unit of work paired with the sending side of its outcome
/// channel.
///
/// Dropping a task without executing it closes the channel, which resolves
/// its [`ResultHandle`] to [`Error::QueueClosed`].
pub struct Task {
    id: TaskId,
    func: TaskFn,
    spawn_time: Instant,
}

impl Task {
    /// Wrap infallible work. The handle is live before the task is queued.
    pub fn new<F, T>(f: F) -> (Task, ResultHandle<T>)
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        Self::with_outcome(move || Ok(f()))
    }

    /// Wrap work that reports failure through `Err`.
    pub fn fallible<F, T, E>(f: F) -> (Task, ResultHandle<T>)
    where
        F: FnOnce() -> std::result::Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: Into<BoxError>,
    {
        Self::with_outcome(move || f().map_err(|e| Error::TaskFailed(e.into())))
    }

    fn with_outcome<F, T>(f: F) -> (Task, ResultHandle<T>)
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let id = TaskId::next();

        let func: TaskFn = Box::new(move |handler: &PanicHandler| {
            let outcome = match handler.execute(f) {
                Ok(outcome) => outcome,
                Err(info) => Err(Error::TaskPanicked(info)),
            };
            let ok = outcome.is_ok();
            // the handle may already be gone; nobody is listening then
            let _ = tx.send(outcome);
            ok
        });

        let task = Task {
            id,
            func,
            spawn_time: Instant::now(),
        };

        (task, ResultHandle::new(id, rx))
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Time elapsed since the task was created, i.e. its queueing delay
    /// when read just before execution.
    pub fn age(&self) -> std::time::Duration {
        self.spawn_time.elapsed()
    }

    /// Run the task, delivering its outcome to the handle.
    ///
    /// Returns `true` if the work completed with `Ok`. Panics are caught by
    /// `handler` and never escape this call.
    pub fn execute(self, handler: &PanicHandler) -> bool {
        (self.func)(handler)
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("spawn_time", &self.spawn_time)
            .finish()
    }
}
