//! In-memory collaborators
//!
//! Used by the integration tests and by the `profile-sync` script runner.
//! Latency is simulated with `tokio::time::sleep`, so paused-clock tests
//! control exactly when each call resolves.

use async_trait::async_trait;
use autosave_core::{
    HandleDirectory, IdentityProvider, OwnerId, ProfileRecord, ProfileSource, ProfileStore,
    RemoteError,
};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Identity provider with a switchable signed-in owner
#[derive(Default)]
pub struct StaticIdentity {
    owner: RwLock<Option<OwnerId>>,
}

impl StaticIdentity {
    pub fn signed_in(owner: impl Into<String>) -> Self {
        Self {
            owner: RwLock::new(Some(OwnerId(owner.into()))),
        }
    }

    pub fn signed_out() -> Self {
        Self::default()
    }

    pub fn sign_in(&self, owner: impl Into<String>) {
        *self.owner.write() = Some(OwnerId(owner.into()));
    }

    pub fn sign_out(&self) {
        *self.owner.write() = None;
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_owner(&self) -> Option<OwnerId> {
        self.owner.read().clone()
    }
}

/// A write the store accepted or rejected
#[derive(Debug, Clone)]
pub struct RecordedWrite {
    pub owner: OwnerId,
    pub record: ProfileRecord,
    pub succeeded: bool,
}

/// Profile store keeping records in a map
///
/// A successful write also claims the record's handle in the linked
/// directory, the way a real backend's uniqueness index would.
pub struct MemoryProfileStore {
    latency: Duration,
    profiles: Mutex<HashMap<OwnerId, ProfileRecord>>,
    writes: Mutex<Vec<RecordedWrite>>,
    failures: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    directory: Option<Arc<MemoryHandleDirectory>>,
}

impl MemoryProfileStore {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            profiles: Mutex::new(HashMap::new()),
            writes: Mutex::new(Vec::new()),
            failures: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            directory: None,
        }
    }

    /// Keep `directory` in sync with saved handles
    pub fn with_directory(mut self, directory: Arc<MemoryHandleDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    /// Seed a persisted profile
    pub fn insert(&self, owner: &OwnerId, record: ProfileRecord) {
        if let Some(directory) = &self.directory {
            directory.claim(&record.username, owner);
        }
        self.profiles.lock().insert(owner.clone(), record);
    }

    /// Reject the next `n` writes
    pub fn fail_next(&self, n: usize) {
        self.failures.store(n, Ordering::SeqCst);
    }

    pub fn profile(&self, owner: &OwnerId) -> Option<ProfileRecord> {
        self.profiles.lock().get(owner).cloned()
    }

    pub fn writes(&self) -> Vec<RecordedWrite> {
        self.writes.lock().clone()
    }

    pub fn write_count(&self) -> usize {
        self.writes.lock().len()
    }

    /// Highest number of writes ever observed in flight at once
    pub fn max_concurrent_writes(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn take_failure(&self) -> bool {
        self.failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn update_profile(
        &self,
        owner: &OwnerId,
        record: &ProfileRecord,
    ) -> Result<(), RemoteError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.latency).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let fail = self.take_failure();
        self.writes.lock().push(RecordedWrite {
            owner: owner.clone(),
            record: record.clone(),
            succeeded: !fail,
        });
        if fail {
            debug!(%owner, "memory store rejecting write");
            return Err(RemoteError::Unavailable("injected failure".into()));
        }

        let previous = self.profiles.lock().insert(owner.clone(), record.clone());
        if let Some(directory) = &self.directory {
            if let Some(previous) = previous.filter(|p| p.username != record.username) {
                directory.release(&previous.username, owner);
            }
            directory.claim(&record.username, owner);
        }
        Ok(())
    }
}

#[async_trait]
impl ProfileSource for MemoryProfileStore {
    async fn load_profile(&self, owner: &OwnerId) -> Result<Option<ProfileRecord>, RemoteError> {
        tokio::time::sleep(self.latency).await;
        Ok(self.profile(owner))
    }
}

/// Handle directory backed by a handle to owner map
pub struct MemoryHandleDirectory {
    latency: Duration,
    overrides: Mutex<HashMap<String, Duration>>,
    handles: Mutex<HashMap<String, OwnerId>>,
    lookups: Mutex<Vec<String>>,
    failing: Mutex<bool>,
}

impl MemoryHandleDirectory {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            overrides: Mutex::new(HashMap::new()),
            handles: Mutex::new(HashMap::new()),
            lookups: Mutex::new(Vec::new()),
            failing: Mutex::new(false),
        }
    }

    /// Register `handle` as belonging to `owner`
    pub fn claim(&self, handle: &str, owner: &OwnerId) {
        self.handles.lock().insert(handle.to_string(), owner.clone());
    }

    /// Drop `handle` if `owner` holds it
    pub fn release(&self, handle: &str, owner: &OwnerId) {
        let mut handles = self.handles.lock();
        if handles.get(handle) == Some(owner) {
            handles.remove(handle);
        }
    }

    /// Answer lookups for `candidate` after `latency` instead of the default
    pub fn set_latency_for(&self, candidate: &str, latency: Duration) {
        self.overrides.lock().insert(candidate.to_string(), latency);
    }

    /// Make every lookup fail until switched back
    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock() = failing;
    }

    /// Candidates looked up so far, in call order
    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().clone()
    }

    pub fn lookup_count(&self, candidate: &str) -> usize {
        self.lookups.lock().iter().filter(|c| *c == candidate).count()
    }
}

#[async_trait]
impl HandleDirectory for MemoryHandleDirectory {
    async fn is_handle_taken(
        &self,
        candidate: &str,
        excluding: Option<&OwnerId>,
    ) -> Result<bool, RemoteError> {
        self.lookups.lock().push(candidate.to_string());
        let latency = self
            .overrides
            .lock()
            .get(candidate)
            .copied()
            .unwrap_or(self.latency);
        tokio::time::sleep(latency).await;

        if *self.failing.lock() {
            return Err(RemoteError::Unavailable("directory offline".into()));
        }
        let taken = match self.handles.lock().get(candidate) {
            Some(holder) => Some(holder) != excluding,
            None => false,
        };
        Ok(taken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner(id: &str) -> OwnerId {
        OwnerId(id.into())
    }

    #[tokio::test(start_paused = true)]
    async fn test_directory_excludes_own_handle() {
        let directory = MemoryHandleDirectory::new(Duration::from_millis(50));
        directory.claim("ragnar", &owner("u2"));

        assert!(directory.is_handle_taken("ragnar", Some(&owner("u1"))).await.unwrap());
        assert!(!directory.is_handle_taken("ragnar", Some(&owner("u2"))).await.unwrap());
        assert!(!directory.is_handle_taken("free_name", None).await.unwrap());
        assert_eq!(directory.lookup_count("ragnar"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_failure_injection() {
        let store = MemoryProfileStore::new(Duration::from_millis(10));
        let record = ProfileRecord {
            username: "spacewolf99".into(),
            ..Default::default()
        };
        store.fail_next(1);

        assert!(store.update_profile(&owner("u1"), &record).await.is_err());
        assert!(store.profile(&owner("u1")).is_none());
        assert!(store.update_profile(&owner("u1"), &record).await.is_ok());
        assert_eq!(store.profile(&owner("u1")), Some(record));
        assert_eq!(store.write_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_saved_handle_moves_in_directory() {
        let directory = Arc::new(MemoryHandleDirectory::new(Duration::ZERO));
        let store = MemoryProfileStore::new(Duration::ZERO).with_directory(Arc::clone(&directory));
        let mut record = ProfileRecord {
            username: "spacewolf99".into(),
            ..Default::default()
        };
        store.insert(&owner("u1"), record.clone());

        record.username = "grey_knight".into();
        store.update_profile(&owner("u1"), &record).await.unwrap();

        assert!(!directory.is_handle_taken("spacewolf99", Some(&owner("u2"))).await.unwrap());
        assert!(directory.is_handle_taken("grey_knight", Some(&owner("u2"))).await.unwrap());
    }
}
