//! Edit stream watching for profile autosave
//!
//! This crate provides:
//! - A generic deadline-based debouncer, one instance per input stream
//! - The handle validation gate (tri-state availability keyed by candidate)

pub mod debounce;
pub mod validation;

pub use debounce::Debouncer;
pub use validation::{
    Resolution, SettleOutcome, SkipReason, ValidationGate, ValidationResult, ValidationState,
};

use tokio::time::Instant;

/// Earliest of a set of optional deadlines
pub fn earliest_deadline<I>(deadlines: I) -> Option<Instant>
where
    I: IntoIterator<Item = Option<Instant>>,
{
    deadlines.into_iter().flatten().min()
}
