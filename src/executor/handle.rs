//! Consumer side of a task's one-shot outcome channel.

use super::task::TaskId;
use crate::error::{Error, Result};
use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};
use parking_lot::Mutex;
use std::fmt;
use std::time::{Duration, Instant};

/// Handle for awaiting a task's outcome.
///
/// The outcome is cached on first receipt, so `wait` and friends can be
/// called any number of times. Errors are only surfaced by [`get`].
///
/// [`get`]: ResultHandle::get
pub struct ResultHandle<T> {
    id: TaskId,
    receiver: Receiver<Result<T>>,
    outcome: Mutex<Option<Result<T>>>,
}

impl<T> ResultHandle<T> {
    pub(crate) fn new(id: TaskId, receiver: Receiver<Result<T>>) -> Self {
        Self {
            id,
            receiver,
            outcome: Mutex::new(None),
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Block until the task has run (or was discarded).
    pub fn wait(&self) {
        let mut outcome = self.outcome.lock();
        if outcome.is_none() {
            // a closed channel means the task was dropped unexecuted
            *outcome = Some(self.receiver.recv().unwrap_or(Err(Error::QueueClosed)));
        }
    }

    /// Block for at most `timeout`. Returns `true` if the outcome is known.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            // no representable deadline, so this is an unbounded wait
            self.wait();
            return true;
        };

        let Some(mut outcome) = self.outcome.try_lock_until(deadline) else {
            return false;
        };
        if outcome.is_some() {
            return true;
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        match self.receiver.recv_timeout(remaining) {
            Ok(result) => {
                *outcome = Some(result);
                true
            }
            Err(RecvTimeoutError::Timeout) => false,
            Err(RecvTimeoutError::Disconnected) => {
                *outcome = Some(Err(Error::QueueClosed));
                true
            }
        }
    }

    /// Non-blocking check for completion.
    pub fn is_finished(&self) -> bool {
        let Some(mut outcome) = self.outcome.try_lock() else {
            // another thread is receiving right now
            return false;
        };
        if outcome.is_some() {
            return true;
        }

        match self.receiver.try_recv() {
            Ok(result) => {
                *outcome = Some(result);
                true
            }
            Err(TryRecvError::Empty) => false,
            Err(TryRecvError::Disconnected) => {
                *outcome = Some(Err(Error::QueueClosed));
                true
            }
        }
    }

    /// Wait for the task and return its value, or the error it raised.
    pub fn get(self) -> Result<T> {
        self.wait();
        self.outcome.into_inner().unwrap_or(Err(Error::QueueClosed))
    }
}

impl<T> fmt::Debug for ResultHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.outcome.try_lock().as_deref() {
            Some(Some(Ok(_))) => "fulfilled",
            Some(Some(Err(_))) => "failed",
            Some(None) => "pending",
            None => "busy",
        };
        f.debug_struct("ResultHandle")
            .field("id", &self.id)
            .field("state", &state)
            .finish()
    }
}
