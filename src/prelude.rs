pub use crate::config::{Config, ConfigBuilder};
pub use crate::error::{Error, Result};
pub use crate::executor::{
    PanicStrategy, ResultHandle, Task, TaskId, TaskManager, TaskQueue, WorkerStatsSnapshot,
};
