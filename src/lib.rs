//! taskmgr - a single-worker task manager
//!
//! Callers on any thread submit work to a [`TaskManager`]; one dedicated
//! worker thread runs it strictly in submission order. Each submission
//! returns a [`ResultHandle`] that can be waited on and that yields either
//! the work's return value or the failure it raised.
//!
//! # Quick Start
//!
//! ```no_run
//! use taskmgr::prelude::*;
//!
//! let manager = TaskManager::new().unwrap();
//!
//! let handle = manager.submit(|| 6 * 7).unwrap();
//! assert_eq!(handle.get().unwrap(), 42);
//! ```
//!
//! # Failures
//!
//! A task that panics, or that returns `Err` when submitted with
//! [`TaskManager::submit_fallible`], never takes the worker down. The
//! failure is stored in the task's handle and returned by
//! [`ResultHandle::get`]. Tasks that are still queued when their manager
//! shuts down never run; their handles yield [`Error::QueueClosed`].
//!
//! # Moving work between managers
//!
//! [`TaskManager::relocate`] and [`TaskManager::reassign`] hand queued work
//! to another manager. The old worker is stopped and joined first, the
//! queue contents move unchanged, and a new worker picks them up in their
//! original order.

// Lint configuration
#![warn(missing_debug_implementations)]

pub mod config;
pub mod error;
pub mod executor;
pub mod prelude;

// Re-export key types at crate root
pub use config::{Config, ConfigBuilder};
pub use error::{Error, Result};
pub use executor::{PanicStrategy, ResultHandle, Task, TaskId, TaskManager, TaskQueue};

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn test_basic_submit() {
        let manager = TaskManager::new().unwrap();

        let sum = manager.submit(|| (0i32..100).sum::<i32>()).unwrap();
        assert_eq!(sum.get().unwrap(), 4950);
    }

    #[test]
    fn test_shared_state() {
        let manager = TaskManager::new().unwrap();
        let counter = Arc::new(Mutex::new(0));

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let counter = counter.clone();
                manager.submit(move || *counter.lock() += 1).unwrap()
            })
            .collect();

        for handle in handles {
            handle.wait();
        }

        assert_eq!(*counter.lock(), 10);
    }
}
