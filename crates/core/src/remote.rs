//! Remote collaborators consumed by the autosave engine
//!
//! Implementations live outside this workspace (auth provider, datastore).
//! `autosave-session` ships in-memory versions for tests and the CLI.

use crate::error::RemoteError;
use crate::record::{OwnerId, ProfileRecord};
use async_trait::async_trait;

/// Supplies the signed-in identity, if any
pub trait IdentityProvider: Send + Sync {
    fn current_owner(&self) -> Option<OwnerId>;
}

/// Persists the editable surface of a profile
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Full-surface upsert of every editable field
    async fn update_profile(&self, owner: &OwnerId, record: &ProfileRecord)
        -> Result<(), RemoteError>;
}

/// Global handle uniqueness lookup
#[async_trait]
pub trait HandleDirectory: Send + Sync {
    /// True when `candidate` belongs to someone other than `excluding`
    async fn is_handle_taken(
        &self,
        candidate: &str,
        excluding: Option<&OwnerId>,
    ) -> Result<bool, RemoteError>;
}

/// Loads the persisted record used to hydrate a session
#[async_trait]
pub trait ProfileSource: Send + Sync {
    async fn load_profile(&self, owner: &OwnerId) -> Result<Option<ProfileRecord>, RemoteError>;
}
