//! Task execution infrastructure.
//!
//! This module provides the execution primitives: the task and its result
//! handle, the blocking task queue, the worker loop, and the task manager
//! that ties one queue to one worker thread.

pub mod handle;
pub mod manager;
pub mod panic_handler;
pub mod queue;
pub mod task;
pub mod worker;

pub use handle::ResultHandle;
pub use manager::TaskManager;
pub use panic_handler::{PanicHandler, PanicInfo, PanicStrategy};
pub use queue::TaskQueue;
pub use task::{Task, TaskId};
pub use worker::WorkerStatsSnapshot;
