//! Worker thread that drains a task queue.

use super::panic_handler::PanicHandler;
use super::queue::TaskQueue;
use crate::config::Config;
use crate::error::{Error, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

// counters shared by every worker a manager launches
#[derive(Debug, Default)]
pub struct WorkerStats {
    pub tasks_executed: AtomicU64,
    pub tasks_failed: AtomicU64,
    pub launches: AtomicU64,
}

impl WorkerStats {
    pub fn snapshot(&self, panicked: usize) -> WorkerStatsSnapshot {
        WorkerStatsSnapshot {
            executed: self.tasks_executed.load(Ordering::Relaxed),
            failed: self.tasks_failed.load(Ordering::Relaxed),
            panicked: panicked as u64,
            relaunches: self.launches.load(Ordering::Relaxed).saturating_sub(1),
        }
    }
}

/// Point-in-time copy of a manager's worker counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WorkerStatsSnapshot {
    /// Tasks invoked, whatever their outcome.
    pub executed: u64,
    /// Tasks that panicked or returned `Err`.
    pub failed: u64,
    pub panicked: u64,
    /// Workers launched after the first one (ownership transfers).
    pub relaunches: u64,
}

pub(crate) struct Worker {
    queue: Arc<TaskQueue>,
    panic_handler: Arc<PanicHandler>,
    stats: Arc<WorkerStats>,
}

impl Worker {
    pub fn new(
        queue: Arc<TaskQueue>,
        panic_handler: Arc<PanicHandler>,
        stats: Arc<WorkerStats>,
    ) -> Self {
        Self {
            queue,
            panic_handler,
            stats,
        }
    }

    /// Start the worker on its own thread.
    pub fn spawn(self, config: &Config) -> Result<JoinHandle<()>> {
        let mut builder = thread::Builder::new().name(config.thread_name.clone());

        if let Some(stack_size) = config.stack_size {
            builder = builder.stack_size(stack_size);
        }

        let stats = self.stats.clone();
        let handle = builder.spawn(move || self.run()).map_err(Error::Spawn)?;
        stats.launches.fetch_add(1, Ordering::Relaxed);

        Ok(handle)
    }

    // main loop
    fn run(self) {
        tracing::debug!("worker started");

        while !self.queue.is_done() {
            // None is the shutdown signal
            let Some(task) = self.queue.wait_and_pop() else {
                continue;
            };

            let tid = task.id();
            let queued_us = task.age().as_micros() as u64;
            let start = Instant::now();
            let ok = task.execute(&self.panic_handler);

            self.stats.tasks_executed.fetch_add(1, Ordering::Relaxed);
            if !ok {
                self.stats.tasks_failed.fetch_add(1, Ordering::Relaxed);
            }

            tracing::trace!(
                task_id = %tid,
                ok,
                queued_us,
                duration_us = start.elapsed().as_micros() as u64,
                "task executed"
            );
        }

        tracing::debug!(remaining = self.queue.len(), "worker stopped");
    }
}
