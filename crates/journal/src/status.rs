//! Save status machine
//!
//! Pure presentation state. `Saved` and `Error` revert to `Idle` after their
//! reset interval; the reset is a deadline polled by the owning loop, so it
//! cannot fire once the loop is gone.

use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

/// Status shown in the save pill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveStatus {
    Idle,
    Saving,
    Saved,
    Error,
}

impl fmt::Display for SaveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SaveStatus::Idle => "idle",
            SaveStatus::Saving => "saving",
            SaveStatus::Saved => "saved",
            SaveStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// Status plus the pending reset deadline
pub struct StatusMachine {
    status: SaveStatus,
    reset_at: Option<Instant>,
    saved_reset: Duration,
    error_reset: Duration,
}

impl StatusMachine {
    pub fn new(saved_reset: Duration, error_reset: Duration) -> Self {
        Self {
            status: SaveStatus::Idle,
            reset_at: None,
            saved_reset,
            error_reset,
        }
    }

    pub fn status(&self) -> SaveStatus {
        self.status
    }

    /// Enter `Saving`, cancelling any pending reset
    pub fn begin_saving(&mut self) {
        self.status = SaveStatus::Saving;
        self.reset_at = None;
    }

    /// Enter `Saved` or `Error` and schedule the reset to `Idle`
    pub fn finish(&mut self, success: bool, now: Instant) {
        if success {
            self.status = SaveStatus::Saved;
            self.reset_at = Some(now + self.saved_reset);
        } else {
            self.status = SaveStatus::Error;
            self.reset_at = Some(now + self.error_reset);
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.reset_at
    }

    /// Revert to `Idle` if the reset is due; returns `true` on change
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.reset_at {
            Some(at) if at <= now => {
                self.reset_at = None;
                self.status = SaveStatus::Idle;
                true
            }
            _ => false,
        }
    }

    /// Drop the pending reset (teardown)
    pub fn cancel_timers(&mut self) {
        self.reset_at = None;
    }
}
