//! Timed edit scripts replayed against the in-memory backend
//!
//! A script is a JSON document describing a hydrated profile, the handles
//! already claimed by other users, backend latencies, and a list of timed
//! user actions. Replaying it mounts a real session over the in-memory
//! collaborators and records every status and validation transition.

use anyhow::{Context, Result};
use autosave_core::{FieldEdit, OwnerId, ProfileRecord, SyncConfig, TagId};
use autosave_journal::SaveEntry;
use autosave_session::memory::{MemoryHandleDirectory, MemoryProfileStore, StaticIdentity};
use autosave_session::{
    Collaborators, EditSession, SaveStatus, SessionError, ValidationResult,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep, sleep_until, Instant};
use tracing::{debug, info};

fn default_owner() -> Option<OwnerId> {
    Some(OwnerId("local-user".into()))
}

fn default_store_latency() -> u64 {
    150
}

fn default_directory_latency() -> u64 {
    100
}

/// A replayable editing script
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Script {
    /// Signed-in owner; `null` replays signed out
    #[serde(default = "default_owner")]
    pub owner: Option<OwnerId>,
    /// Persisted profile the session hydrates from
    pub profile: ProfileRecord,
    /// Handle to holder, for handles owned by someone else
    #[serde(default)]
    pub taken_handles: BTreeMap<String, OwnerId>,
    #[serde(default = "default_store_latency")]
    pub store_latency_ms: u64,
    #[serde(default = "default_directory_latency")]
    pub directory_latency_ms: u64,
    /// Number of writes the store rejects before accepting
    #[serde(default)]
    pub fail_writes: usize,
    /// Extra time to run after the last step; derived from the config if unset
    #[serde(default)]
    pub tail_ms: Option<u64>,
    pub steps: Vec<Step>,
}

/// One timed user action
#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    /// Offset from mount
    pub at_ms: u64,
    #[serde(flatten)]
    pub action: Action,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Edit { edit: FieldEdit },
    ToggleTag { tag: TagId },
    SetTags { tags: Vec<TagId> },
    Flush,
    SignIn { owner: OwnerId },
    SignOut,
}

impl Script {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("Invalid script")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read script {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("In {}", path.display()))
    }

    fn tail(&self, config: &SyncConfig) -> Duration {
        let ms = self.tail_ms.unwrap_or_else(|| {
            // long enough for the last edit to settle, be checked, be
            // written, and for the status pill to reset
            config.fields_debounce_ms.max(config.tags_debounce_ms)
                + config.handle_check_debounce_ms
                + self.directory_latency_ms
                + 2 * self.store_latency_ms
                + config.saved_reset_ms.max(config.error_reset_ms)
                + 100
        });
        Duration::from_millis(ms)
    }
}

/// A value observed at an offset from mount
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Timed<T> {
    pub at_ms: u64,
    pub value: T,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationView {
    pub candidate: String,
    pub state: String,
}

impl From<&ValidationResult> for ValidationView {
    fn from(result: &ValidationResult) -> Self {
        Self {
            candidate: result.candidate.clone(),
            state: result.state.to_string(),
        }
    }
}

/// A write as the store saw it
#[derive(Debug, Clone, Serialize)]
pub struct WriteView {
    pub owner: OwnerId,
    pub succeeded: bool,
    pub record: ProfileRecord,
}

/// Everything a replay observed
#[derive(Debug, Clone, Serialize)]
pub struct Replay {
    pub statuses: Vec<Timed<SaveStatus>>,
    pub validations: Vec<Timed<ValidationView>>,
    /// Actions the session refused, such as a tag past the limit
    pub rejected: Vec<Timed<String>>,
    pub writes: Vec<WriteView>,
    pub history: Vec<SaveEntry>,
    /// Last confirmed profile
    pub baseline: ProfileRecord,
    pub final_status: SaveStatus,
    pub discarded_edits: bool,
    pub abandoned_write: bool,
}

impl Replay {
    /// Final validation state of the handle, if it was ever touched
    pub fn final_validation(&self) -> Option<&ValidationView> {
        self.validations.last().map(|t| &t.value)
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

/// Record every value a watch channel takes until its sender is dropped
fn observe<T, U, F>(mut rx: watch::Receiver<T>, start: Instant, map: F) -> JoinHandle<Vec<Timed<U>>>
where
    T: Send + Sync + 'static,
    U: Send + 'static,
    F: Fn(&T) -> U + Send + 'static,
{
    tokio::spawn(async move {
        let mut seen = Vec::new();
        while rx.changed().await.is_ok() {
            let value = map(&rx.borrow_and_update());
            seen.push(Timed {
                at_ms: elapsed_ms(start),
                value,
            });
        }
        seen
    })
}

/// Replay `script` with `config` and collect what happened
pub async fn replay(script: Script, config: SyncConfig) -> Result<Replay> {
    let directory = Arc::new(MemoryHandleDirectory::new(Duration::from_millis(
        script.directory_latency_ms,
    )));
    for (handle, holder) in &script.taken_handles {
        directory.claim(handle, holder);
    }

    let store = Arc::new(
        MemoryProfileStore::new(Duration::from_millis(script.store_latency_ms))
            .with_directory(Arc::clone(&directory)),
    );
    let identity = Arc::new(StaticIdentity::signed_out());
    if let Some(owner) = &script.owner {
        identity.sign_in(owner.0.clone());
        store.insert(owner, script.profile.clone());
    }
    store.fail_next(script.fail_writes);

    let collaborators = Collaborators {
        identity: identity.clone(),
        store: store.clone(),
        directory: directory.clone(),
    };

    let tail = script.tail(&config);
    let mut steps = script.steps;
    steps.sort_by_key(|s| s.at_ms);

    info!(steps = steps.len(), "replaying script");
    let start = Instant::now();
    let session = EditSession::mount(config, script.profile, collaborators);
    let statuses = observe(session.subscribe_status(), start, |s: &SaveStatus| *s);
    let validations = observe(session.subscribe_validation(), start, |v: &ValidationResult| {
        ValidationView::from(v)
    });

    let mut rejected = Vec::new();
    for step in steps {
        sleep_until(start + Duration::from_millis(step.at_ms)).await;
        debug!(at_ms = step.at_ms, action = ?step.action, "applying step");

        let outcome = match step.action {
            Action::Edit { edit } => session.edit(edit),
            Action::ToggleTag { tag } => session.toggle_tag(tag).await.map(|_| ()),
            Action::SetTags { tags } => session.set_tags(tags).await,
            Action::Flush => session.flush(),
            Action::SignIn { owner } => {
                identity.sign_in(owner.0);
                Ok(())
            }
            Action::SignOut => {
                identity.sign_out();
                Ok(())
            }
        };
        match outcome {
            Ok(()) => {}
            Err(SessionError::Core(e)) => rejected.push(Timed {
                at_ms: step.at_ms,
                value: e.to_string(),
            }),
            Err(e) => return Err(e).context("Session stopped during replay"),
        }
    }

    sleep(tail).await;
    let report = session.unmount().await?;

    let statuses = statuses.await.context("Status observer failed")?;
    let validations = validations.await.context("Validation observer failed")?;
    let writes = store
        .writes()
        .into_iter()
        .map(|w| WriteView {
            owner: w.owner,
            succeeded: w.succeeded,
            record: w.record,
        })
        .collect();

    Ok(Replay {
        statuses,
        validations,
        rejected,
        writes,
        history: report.history.entries().cloned().collect(),
        baseline: report.baseline.to_record(),
        final_status: report.final_status,
        discarded_edits: report.discarded_edits,
        abandoned_write: report.abandoned_write,
    })
}
