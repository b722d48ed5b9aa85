//! Wake Signal
//!
//! Manual-reset event used by the receiver to wake a consumer that is
//! waiting for a full batch. The consumer resets the signal while holding
//! the ring lock, releases the lock, then waits. A post issued between the
//! release and the wait is therefore never lost.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use crate::error::EngineError;

#[derive(Debug, Default)]
struct WakeState {
    posted: bool,
    closed: bool,
}

/// Manual-reset event with a terminal closed state
#[derive(Debug, Default)]
pub struct WakeSignal {
    state: Mutex<WakeState>,
    cond: Condvar,
}

impl WakeSignal {
    /// Create an unposted, open signal
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, WakeState>, EngineError> {
        self.state
            .lock()
            .map_err(|_| EngineError::Synchronization("wake signal lock poisoned".to_string()))
    }

    /// Set the signal and wake the waiter
    pub fn post(&self) -> Result<(), EngineError> {
        let mut state = self.lock()?;
        state.posted = true;
        self.cond.notify_all();
        Ok(())
    }

    /// Clear the signal
    pub fn reset(&self) -> Result<(), EngineError> {
        self.lock()?.posted = false;
        Ok(())
    }

    /// Block until the signal is posted
    ///
    /// Returns [`EngineError::Shutdown`] once the signal has been closed.
    /// Waiting does not clear the signal.
    pub fn wait(&self) -> Result<(), EngineError> {
        let state = self.lock()?;
        let state = self
            .cond
            .wait_while(state, |s| !s.posted && !s.closed)
            .map_err(|_| EngineError::Synchronization("wake signal lock poisoned".to_string()))?;
        if state.closed {
            return Err(EngineError::Shutdown);
        }
        Ok(())
    }

    /// Close the signal, releasing every current and future waiter
    pub fn close(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.closed = true;
        self.cond.notify_all();
    }

    /// Whether [`close`](Self::close) has been called
    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).closed
    }

    /// Whether the signal is currently posted
    pub fn is_posted(&self) -> bool {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).posted
    }
}
