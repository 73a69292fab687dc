//! Persistence side of profile autosave
//!
//! This crate provides:
//! - The baseline cell (single writer, atomic replace on confirmed writes)
//! - The persistence coordinator (write guard, at most one write in flight)
//! - The save status machine (idle/saving/saved/error with timed reset)
//! - A bounded history of save attempts

pub mod baseline;
pub mod coordinator;
pub mod history;
pub mod status;

// Re-exports
pub use baseline::{baseline, BaselineReader, BaselineWriter};
pub use coordinator::{Blocked, Decision, PersistenceCoordinator, WriteOutcome, WriteTicket};
pub use history::{SaveEntry, SaveLog, SaveOutcome};
pub use status::{SaveStatus, StatusMachine};
