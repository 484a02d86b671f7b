//! Single-worker task manager and its ownership-transfer protocol.

use super::handle::ResultHandle;
use super::panic_handler::PanicHandler;
use super::queue::TaskQueue;
use super::task::Task;
use super::worker::{Worker, WorkerStats, WorkerStatsSnapshot};
use crate::config::Config;
use crate::error::{BoxError, Error, Result};
use std::fmt;
use std::sync::Arc;
use std::thread::JoinHandle;

/// Owns one [`TaskQueue`] and the single worker thread draining it.
///
/// Tasks run one at a time, in submission order, on the worker thread.
/// The worker holds its own `Arc` to the queue, so a `TaskManager` value
/// can be moved freely. [`relocate`] and [`reassign`] transfer queued work
/// between managers: the old worker is stopped and joined, the tasks move,
/// and a fresh worker is started. A thread is never relocated while it runs.
///
/// Dropping the manager stops and joins the worker. Tasks still queued at
/// that point are discarded and their handles fail with
/// [`Error::QueueClosed`]. Shutdown does not drain the queue.
///
/// [`relocate`]: TaskManager::relocate
/// [`reassign`]: TaskManager::reassign
pub struct TaskManager {
    queue: Arc<TaskQueue>,
    worker: Option<JoinHandle<()>>,
    config: Config,
    panic_handler: Arc<PanicHandler>,
    stats: Arc<WorkerStats>,
}

impl TaskManager {
    pub fn new() -> Result<Self> {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Result<Self> {
        config.validate()?;

        let panic_handler = Arc::new(PanicHandler::new(config.panic_strategy));
        Self::launch(
            Arc::new(TaskQueue::new()),
            config,
            panic_handler,
            Arc::new(WorkerStats::default()),
        )
    }

    fn launch(
        queue: Arc<TaskQueue>,
        config: Config,
        panic_handler: Arc<PanicHandler>,
        stats: Arc<WorkerStats>,
    ) -> Result<Self> {
        let mut manager = Self {
            queue,
            worker: None,
            config,
            panic_handler,
            stats,
        };
        manager.start_worker()?;
        Ok(manager)
    }

    /// Move construction: take over `donor`'s queued tasks.
    ///
    /// The donor's worker is stopped and joined before anything moves, so
    /// handles for tasks the donor had queued stay valid and are fulfilled
    /// by the new worker in their original order. The new manager keeps the
    /// donor's configuration and counters.
    pub fn relocate(mut donor: TaskManager) -> Result<TaskManager> {
        donor.stop_worker();

        let queue = Arc::new(TaskQueue::take(&donor.queue));
        tracing::debug!(transferred = queue.len(), "relocating task manager");

        Self::launch(
            queue,
            donor.config.clone(),
            donor.panic_handler.clone(),
            donor.stats.clone(),
        )
    }

    /// Move assignment: replace this manager's work with `donor`'s.
    ///
    /// Both workers are stopped and joined. Tasks still queued on `self`
    /// are discarded and their handles fail with [`Error::QueueClosed`];
    /// the donor's tasks then run on a new worker owned by `self`. `self`
    /// keeps its own configuration and counters.
    pub fn reassign(&mut self, mut donor: TaskManager) -> Result<()> {
        donor.queue.shutdown();
        self.stop_worker();
        donor.stop_worker();

        let abandoned = self.queue.take_from(&donor.queue);
        if !abandoned.is_empty() {
            tracing::warn!(
                abandoned = abandoned.len(),
                "reassignment discarded queued tasks"
            );
        }
        drop(abandoned);

        tracing::debug!(transferred = self.queue.len(), "reassigned task manager");
        self.start_worker()
    }

    fn start_worker(&mut self) -> Result<()> {
        debug_assert!(self.worker.is_none());

        // no thread pops from the queue until the spawn below
        self.queue.restart();

        let worker = Worker::new(
            self.queue.clone(),
            self.panic_handler.clone(),
            self.stats.clone(),
        );
        match worker.spawn(&self.config) {
            Ok(thread) => {
                self.worker = Some(thread);
                Ok(())
            }
            Err(e) => {
                self.queue.shutdown();
                Err(e)
            }
        }
    }

    // signal, then join; queued tasks are left in place
    fn stop_worker(&mut self) {
        self.queue.shutdown();

        if let Some(thread) = self.worker.take() {
            if thread.join().is_err() {
                tracing::error!("worker thread panicked");
            }
        }
    }

    /// Queue infallible work. The handle yields its return value.
    pub fn submit<F, T>(&self, f: F) -> Result<ResultHandle<T>>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        self.enqueue(Task::new(f))
    }

    /// Queue work that returns `Result`; an `Err` is surfaced by
    /// [`ResultHandle::get`] as [`Error::TaskFailed`].
    pub fn submit_fallible<F, T, E>(&self, f: F) -> Result<ResultHandle<T>>
    where
        F: FnOnce() -> std::result::Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: Into<BoxError>,
    {
        self.enqueue(Task::fallible(f))
    }

    fn enqueue<T>(&self, (task, handle): (Task, ResultHandle<T>)) -> Result<ResultHandle<T>> {
        if self.worker.is_none() {
            tracing::warn!(task_id = %task.id(), "task rejected, manager is shut down");
            return Err(Error::rejected("task manager is shut down"));
        }

        tracing::trace!(task_id = %task.id(), "task submitted");
        self.queue.push(task);
        Ok(handle)
    }

    /// Stop the worker and discard queued tasks. Idempotent.
    ///
    /// A task already running is allowed to finish first.
    pub fn shutdown(&mut self) {
        let was_running = self.worker.is_some();
        self.stop_worker();

        let discarded = self.queue.drain();
        if was_running || !discarded.is_empty() {
            tracing::debug!(discarded = discarded.len(), "task manager shut down");
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Number of tasks queued and not yet picked up by the worker.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn stats(&self) -> WorkerStatsSnapshot {
        self.stats.snapshot(self.panic_handler.panic_count())
    }
}

impl Drop for TaskManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for TaskManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskManager")
            .field("queue", &self.queue)
            .field("running", &self.worker.is_some())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::PanicStrategy;
    use parking_lot::Mutex;
    use std::thread;
    use std::time::Duration;

    fn quiet() -> TaskManager {
        let config = Config::builder()
            .panic_strategy(PanicStrategy::Isolate)
            .build()
            .unwrap();
        TaskManager::with_config(config).unwrap()
    }

    // occupies the worker until the manager's queue is shut down
    fn block_until_shutdown(manager: &TaskManager) -> ResultHandle<()> {
        let queue = manager.queue.clone();
        manager
            .submit(move || {
                while !queue.is_done() {
                    thread::sleep(Duration::from_millis(1));
                }
            })
            .unwrap()
    }

    fn record(manager: &TaskManager, log: &Arc<Mutex<Vec<i32>>>, value: i32) -> ResultHandle<()> {
        let log = log.clone();
        manager.submit(move || log.lock().push(value)).unwrap()
    }

    #[test]
    fn test_submit_and_get() {
        let manager = TaskManager::new().unwrap();

        let handle = manager.submit(|| 2 + 2).unwrap();
        assert_eq!(handle.get().unwrap(), 4);
        assert!(manager.is_running());
    }

    #[test]
    fn test_failure_does_not_stop_worker() {
        let mut manager = quiet();

        let failing = manager.submit(|| -> i32 { panic!("test") }).unwrap();
        let erroring = manager
            .submit_fallible(|| Err::<i32, _>("no value"))
            .unwrap();
        let next = manager.submit(|| 5).unwrap();

        assert!(matches!(failing.get(), Err(Error::TaskPanicked(_))));
        assert!(matches!(erroring.get(), Err(Error::TaskFailed(_))));
        assert_eq!(next.get().unwrap(), 5);

        // joining the worker makes the counters final
        manager.shutdown();
        let stats = manager.stats();
        assert_eq!(stats.executed, 3);
        assert_eq!(stats.failed, 2);
        assert_eq!(stats.panicked, 1);
    }

    #[test]
    fn test_relocate_keeps_queued_tasks() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let donor = quiet();

        let gate = block_until_shutdown(&donor);
        let first = record(&donor, &log, 1);
        let second = record(&donor, &log, 2);

        let manager = TaskManager::relocate(donor).unwrap();
        let third = record(&manager, &log, 3);

        gate.get().unwrap();
        first.get().unwrap();
        second.get().unwrap();
        third.get().unwrap();

        assert_eq!(*log.lock(), vec![1, 2, 3]);
        assert_eq!(manager.stats().relaunches, 1);
    }

    #[test]
    fn test_reassign_discards_own_queue() {
        let log = Arc::new(Mutex::new(Vec::new()));

        let mut manager = quiet();
        let _own_gate = block_until_shutdown(&manager);
        let abandoned = record(&manager, &log, 100);

        let donor = quiet();
        let _donor_gate = block_until_shutdown(&donor);
        let moved = record(&donor, &log, 1);

        manager.reassign(donor).unwrap();
        let after = record(&manager, &log, 2);

        assert!(matches!(abandoned.get(), Err(Error::QueueClosed)));
        moved.get().unwrap();
        after.get().unwrap();
        assert_eq!(*log.lock(), vec![1, 2]);
        assert!(manager.is_running());
    }

    #[test]
    fn test_drop_with_pending_tasks() {
        let manager = quiet();
        let _gate = block_until_shutdown(&manager);
        let pending: Vec<_> = (0..10).map(|i| manager.submit(move || i).unwrap()).collect();

        drop(manager);

        for handle in pending {
            assert!(matches!(handle.get(), Err(Error::QueueClosed)));
        }
    }

    #[test]
    fn test_shutdown_rejects_new_work() {
        let mut manager = TaskManager::new().unwrap();
        let done = manager.submit(|| ()).unwrap();
        done.wait();

        manager.shutdown();
        manager.shutdown();

        assert!(!manager.is_running());
        assert_eq!(manager.pending(), 0);
        assert!(matches!(manager.submit(|| ()), Err(Error::Rejected(_))));
    }

    #[test]
    fn test_manager_moves_across_threads() {
        let manager = TaskManager::new().unwrap();
        let early = manager.submit(|| "before").unwrap();

        let late = thread::spawn(move || {
            let late = manager.submit(|| "after").unwrap();
            (manager, late)
        });
        let (manager, late) = late.join().unwrap();

        assert_eq!(early.get().unwrap(), "before");
        assert_eq!(late.get().unwrap(), "after");
        drop(manager);
    }

    #[test]
    fn test_relocate_keeps_config() {
        let config = Config::builder().thread_name("relocated").build().unwrap();
        let donor = TaskManager::with_config(config).unwrap();

        let manager = TaskManager::relocate(donor).unwrap();
        assert_eq!(manager.config().thread_name, "relocated");

        let name = manager
            .submit(|| thread::current().name().map(str::to_owned))
            .unwrap();
        assert_eq!(name.get().unwrap().as_deref(), Some("relocated"));
    }

    #[test]
    fn test_spawn_failure_is_reported() {
        let config = Config::builder().stack_size(1 << 60).build().unwrap();

        assert!(matches!(
            TaskManager::with_config(config),
            Err(Error::Spawn(_))
        ));
    }

    #[test]
    fn test_failed_relaunch_rejects_new_work() {
        let mut manager = quiet();
        manager.config.stack_size = Some(1 << 60);

        let donor = quiet();
        let _donor_gate = block_until_shutdown(&donor);
        let moved = donor.submit(|| 1).unwrap();

        assert!(matches!(manager.reassign(donor), Err(Error::Spawn(_))));
        assert!(!manager.is_running());
        assert!(manager.queue.is_done());
        assert!(matches!(manager.submit(|| ()), Err(Error::Rejected(_))));

        drop(manager);
        assert!(matches!(moved.get(), Err(Error::QueueClosed)));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = Config {
            thread_name: String::new(),
            ..Config::default()
        };
        assert!(matches!(
            TaskManager::with_config(config),
            Err(Error::Config(_))
        ));
    }
}
