//! Core types for profile autosave
//!
//! This crate provides:
//! - The editable profile record and its input handlers
//! - Handle shape rules (length, `[a-z0-9_]`)
//! - Snapshot codec with normalized equality and BLAKE3 fingerprints
//! - The change detector (snapshot vs. baseline)
//! - Sync configuration
//! - Traits for the remote collaborators (identity, store, handle directory)

pub mod config;
pub mod detect;
pub mod error;
pub mod handle;
pub mod hash;
pub mod record;
pub mod remote;
pub mod snapshot;

// Re-exports
pub use config::{example_config, SyncConfig};
pub use detect::{changed_fields, is_dirty, Field};
pub use error::{ConfigError, CoreError, RemoteError};
pub use handle::{normalize_handle_input, HandleRules, HandleShape};
pub use hash::Fingerprint;
pub use record::{
    FieldEdit, OwnerId, ProfileDraft, ProfileFields, ProfileRecord, SocialPlatform, TagId,
    TagSelection,
};
pub use remote::{HandleDirectory, IdentityProvider, ProfileSource, ProfileStore};
pub use snapshot::Snapshot;
