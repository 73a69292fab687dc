//! Profile editing session with debounced autosave
//!
//! `EditSession::mount` spawns one task that owns the draft, the debouncers,
//! the validation gate and the persistence coordinator. Everything it does is
//! interleaved on that task; the only suspension points are its timers and
//! the remote lookups and writes it spawns. Dropping or unmounting the handle
//! ends the task, and every timer with it.

pub mod memory;
pub mod session;

pub use session::{Collaborators, EditSession, SessionError, SessionHandle, SessionReport};

// Re-exported for UI code that only depends on this crate
pub use autosave_journal::SaveStatus;
pub use autosave_watcher::{ValidationResult, ValidationState};
