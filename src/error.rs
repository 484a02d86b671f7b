use crate::executor::PanicInfo;

pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error produced by a fallible task.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("submission rejected: {0}")]
    Rejected(String),

    #[error("task panicked: {0}")]
    TaskPanicked(PanicInfo),

    #[error("task failed: {0}")]
    TaskFailed(#[source] BoxError),

    #[error("queue closed before the task ran")]
    QueueClosed,

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}

impl Error {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    pub fn rejected<S: Into<String>>(msg: S) -> Self {
        Error::Rejected(msg.into())
    }

    /// True for errors raised by the task itself rather than by the manager.
    pub fn is_execution_error(&self) -> bool {
        matches!(self, Error::TaskPanicked(_) | Error::TaskFailed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_task_failed_keeps_source() {
        let err = Error::TaskFailed("disk full".into());
        assert_eq!(err.to_string(), "task failed: disk full");
        assert!(err.source().is_some());
        assert!(err.is_execution_error());
    }

    #[test]
    fn test_manager_errors_are_not_execution_errors() {
        assert!(!Error::QueueClosed.is_execution_error());
        assert!(!Error::rejected("stopped").is_execution_error());
        assert_eq!(Error::config("bad").to_string(), "config error: bad");
    }
}
