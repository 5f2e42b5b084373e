//! In-flight flag for the confirm step.
//!
//! Acquiring the flag moves the state to `Executing` and hands back a guard.
//! The guard records the outcome, and if it is dropped without one (the
//! confirm future was cancelled or panicked) it puts the state back to
//! `Idle`, so the confirmer can never stay stuck in `Executing`.

use crate::core::error::{Error, Result};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionState {
    Idle,
    Executing,
    Succeeded,
    Failed { reason: String },
}

impl ExecutionState {
    /// Confirm and Cancel are both available.
    pub fn is_actionable(&self) -> bool {
        matches!(self, ExecutionState::Idle | ExecutionState::Failed { .. })
    }
}

#[derive(Debug, Clone)]
pub struct ExecutionFlag {
    state: Arc<Mutex<ExecutionState>>,
}

impl Default for ExecutionFlag {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionFlag {
    pub fn new() -> Self {
        ExecutionFlag {
            state: Arc::new(Mutex::new(ExecutionState::Idle)),
        }
    }

    pub fn state(&self) -> ExecutionState {
        lock_state(&self.state).clone()
    }

    /// Move to `Executing`. Fails with `Busy` while another call is in flight
    /// and with `AlreadyCompleted` once an execution has succeeded.
    pub fn try_acquire(&self) -> Result<ExecutingGuard> {
        let mut state = lock_state(&self.state);
        match *state {
            ExecutionState::Executing => Err(Error::Busy),
            ExecutionState::Succeeded => Err(Error::AlreadyCompleted),
            ExecutionState::Idle | ExecutionState::Failed { .. } => {
                *state = ExecutionState::Executing;
                Ok(ExecutingGuard {
                    state: Arc::clone(&self.state),
                    released: false,
                })
            }
        }
    }
}

/// Guard that releases the `Executing` state when dropped
pub struct ExecutingGuard {
    state: Arc<Mutex<ExecutionState>>,
    released: bool,
}

impl ExecutingGuard {
    pub fn succeed(mut self) {
        self.release(ExecutionState::Succeeded);
    }

    pub fn fail(mut self, reason: impl Into<String>) {
        self.release(ExecutionState::Failed {
            reason: reason.into(),
        });
    }

    fn release(&mut self, next: ExecutionState) {
        *lock_state(&self.state) = next;
        self.released = true;
    }
}

impl Drop for ExecutingGuard {
    fn drop(&mut self) {
        if !self.released {
            log::warn!("ExecutingGuard dropped without an outcome, returning to Idle");
            self.release(ExecutionState::Idle);
        }
    }
}

// A panic while holding the lock cannot leave the state half-written (it is a
// single assignment), so recover the inner value instead of propagating poison.
fn lock_state(state: &Mutex<ExecutionState>) -> MutexGuard<'_, ExecutionState> {
    state.lock().unwrap_or_else(|poisoned| {
        log::warn!("ExecutionFlag: state mutex is poisoned, recovering");
        poisoned.into_inner()
    })
}
