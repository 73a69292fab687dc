//! Deadline-based debouncing
//!
//! A `Debouncer` holds at most one pending value. Every push replaces it and
//! moves the deadline to `now + window`; the owner polls with the current time
//! and gets the value back once the window has passed without another push.
//! The debouncer never sleeps itself: whoever owns it sleeps until
//! `deadline()`, so dropping the owner drops the timer too.

use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

struct Pending<T> {
    value: T,
    fire_at: Instant,
}

/// Last-write-wins debouncer for one input stream
pub struct Debouncer<T> {
    /// Stream name, for log lines
    name: &'static str,
    window: Duration,
    pending: Option<Pending<T>>,
}

impl<T> Debouncer<T> {
    /// Create a debouncer with the given quiescence window
    pub fn new(name: &'static str, window: Duration) -> Self {
        Self {
            name,
            window,
            pending: None,
        }
    }

    /// Push a new value, restarting the window
    pub fn push(&mut self, value: T) {
        self.push_at(value, Instant::now());
    }

    /// Push a new value at an explicit time
    pub fn push_at(&mut self, value: T, now: Instant) {
        let fire_at = now + self.window;
        if self.pending.is_some() {
            trace!(stream = self.name, "debounce restarted");
        }
        self.pending = Some(Pending { value, fire_at });
    }

    /// When the pending value becomes due, if any
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.fire_at)
    }

    /// Take the pending value if its window has elapsed at `now`
    pub fn poll_due(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some(p) if p.fire_at <= now => {
                trace!(stream = self.name, "debounce settled");
                self.pending.take().map(|p| p.value)
            }
            _ => None,
        }
    }

    /// Take the pending value immediately, ignoring the window
    pub fn flush(&mut self) -> Option<T> {
        self.pending.take().map(|p| p.value)
    }

    /// Drop the pending value without emitting it
    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}
