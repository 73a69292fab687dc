//! Session event loop and the handle the UI talks to

use autosave_core::{
    CoreError, FieldEdit, HandleDirectory, IdentityProvider, ProfileDraft, ProfileFields,
    ProfileRecord, ProfileSource, ProfileStore, RemoteError, Snapshot, SyncConfig, TagId,
    TagSelection,
};
use autosave_journal::{
    baseline, BaselineReader, Decision, PersistenceCoordinator, SaveLog, SaveStatus,
    StatusMachine, WriteOutcome, WriteTicket,
};
use autosave_watcher::{
    earliest_deadline, Debouncer, Resolution, SettleOutcome, ValidationGate, ValidationResult,
    ValidationState,
};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::{self, JoinHandle, JoinSet};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};
use ulid::Ulid;

/// Errors surfaced to the UI layer
#[derive(Debug, Error)]
pub enum SessionError {
    /// Session was unmounted or its task ended
    #[error("editing session is closed")]
    Closed,

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("failed to hydrate profile: {0}")]
    Hydrate(#[from] RemoteError),

    #[error("session task terminated abnormally: {0}")]
    Terminated(String),
}

/// Remote collaborators used by a session
#[derive(Clone)]
pub struct Collaborators {
    pub identity: Arc<dyn IdentityProvider>,
    pub store: Arc<dyn ProfileStore>,
    pub directory: Arc<dyn HandleDirectory>,
}

/// Final state handed back on unmount
#[derive(Debug, Clone)]
pub struct SessionReport {
    /// Last confirmed snapshot
    pub baseline: Snapshot,
    pub history: SaveLog,
    pub final_status: SaveStatus,
    /// Edits that had not settled yet were dropped
    pub discarded_edits: bool,
    /// A write was still in flight; its result will be ignored
    pub abandoned_write: bool,
}

enum Command {
    Edit(FieldEdit),
    ToggleTag(TagId, oneshot::Sender<Result<bool, CoreError>>),
    SetTags(Vec<TagId>, oneshot::Sender<Result<(), CoreError>>),
    Flush,
    Unmount,
}

/// Entry point for mounting an editing session
pub struct EditSession;

impl EditSession {
    /// Mount a session over an already hydrated record
    ///
    /// Must be called from within a tokio runtime.
    pub fn mount(
        config: SyncConfig,
        hydrated: ProfileRecord,
        collaborators: Collaborators,
    ) -> SessionHandle {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let session = SessionLoop::new(config, &hydrated, collaborators);
        let status = session.status_tx.subscribe();
        let validation = session.validation_tx.subscribe();
        let baseline = session.coordinator.baseline_reader();

        info!(handle = %hydrated.username, "mounting profile editing session");
        let task = tokio::spawn(session.run(command_rx));

        SessionHandle {
            commands,
            status,
            validation,
            baseline,
            task,
        }
    }

    /// Load the current owner's profile, then mount
    ///
    /// With no signed-in owner, or no stored profile, the session starts
    /// from an empty record.
    pub async fn hydrate_and_mount(
        config: SyncConfig,
        source: &dyn ProfileSource,
        collaborators: Collaborators,
    ) -> Result<SessionHandle, SessionError> {
        let record = match collaborators.identity.current_owner() {
            Some(owner) => source.load_profile(&owner).await?.unwrap_or_default(),
            None => ProfileRecord::default(),
        };
        Ok(Self::mount(config, record, collaborators))
    }
}

/// Handle held by the UI for the lifetime of the editing surface
///
/// Dropping the handle unmounts the session.
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<SaveStatus>,
    validation: watch::Receiver<ValidationResult>,
    baseline: BaselineReader,
    task: JoinHandle<SessionReport>,
}

impl SessionHandle {
    /// Apply a text field edit
    pub fn edit(&self, edit: FieldEdit) -> Result<(), SessionError> {
        self.send(Command::Edit(edit))
    }

    /// Select or deselect an affinity tag; returns whether it is now selected
    pub async fn toggle_tag(&self, tag: TagId) -> Result<bool, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::ToggleTag(tag, tx))?;
        Ok(rx.await.map_err(|_| SessionError::Closed)??)
    }

    /// Replace the whole tag selection
    pub async fn set_tags(&self, tags: Vec<TagId>) -> Result<(), SessionError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::SetTags(tags, tx))?;
        Ok(rx.await.map_err(|_| SessionError::Closed)??)
    }

    /// Settle every pending edit now and run the save guard
    pub fn flush(&self) -> Result<(), SessionError> {
        self.send(Command::Flush)
    }

    pub fn status(&self) -> SaveStatus {
        *self.status.borrow()
    }

    pub fn validation(&self) -> ValidationResult {
        self.validation.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<SaveStatus> {
        self.status.clone()
    }

    pub fn subscribe_validation(&self) -> watch::Receiver<ValidationResult> {
        self.validation.clone()
    }

    /// Last snapshot confirmed persisted
    pub fn baseline(&self) -> Arc<Snapshot> {
        self.baseline.current()
    }

    /// Stop the session and collect its final state
    pub async fn unmount(self) -> Result<SessionReport, SessionError> {
        // Already-closed sessions still have a report to collect
        let _ = self.commands.send(Command::Unmount);
        self.task
            .await
            .map_err(|e| SessionError::Terminated(e.to_string()))
    }

    fn send(&self, command: Command) -> Result<(), SessionError> {
        self.commands.send(command).map_err(|_| SessionError::Closed)
    }
}

type WriteResult = (Ulid, Result<(), RemoteError>);

struct SessionLoop {
    config: SyncConfig,
    identity: Arc<dyn IdentityProvider>,
    store: Arc<dyn ProfileStore>,
    directory: Arc<dyn HandleDirectory>,

    /// Mutated only by command handlers
    draft: ProfileDraft,
    fields: Debouncer<ProfileFields>,
    tags: Debouncer<TagSelection>,
    handle: Debouncer<String>,
    settled_fields: ProfileFields,
    settled_tags: TagSelection,

    gate: ValidationGate,
    coordinator: PersistenceCoordinator,
    status: StatusMachine,

    lookups: JoinSet<Result<bool, RemoteError>>,
    /// Candidate each lookup task is checking
    lookup_candidates: HashMap<task::Id, String>,
    writes: JoinSet<WriteResult>,

    status_tx: watch::Sender<SaveStatus>,
    validation_tx: watch::Sender<ValidationResult>,
}

impl SessionLoop {
    fn new(config: SyncConfig, hydrated: &ProfileRecord, collaborators: Collaborators) -> Self {
        let draft = ProfileDraft::from_record(hydrated, config.max_tags);
        let rules = config.handle_rules();
        if draft.tags.len() != hydrated.tags.len() {
            warn!(
                stored = hydrated.tags.len(),
                kept = draft.tags.len(),
                max_tags = config.max_tags,
                "stored tags exceed the limit or repeat; the next save writes the trimmed selection"
            );
        }
        // Baseline is what the store holds, so a trimmed selection is dirty
        let (writer, _) = baseline(Snapshot::from_record(hydrated));
        let gate = ValidationGate::new(rules, draft.username());
        let (status_tx, _) = watch::channel(SaveStatus::Idle);
        let (validation_tx, _) = watch::channel(gate.result().clone());

        Self {
            fields: Debouncer::new("fields", config.fields_debounce()),
            tags: Debouncer::new("tags", config.tags_debounce()),
            handle: Debouncer::new("handle", config.handle_check_debounce()),
            settled_fields: draft.fields.clone(),
            settled_tags: draft.tags.clone(),
            coordinator: PersistenceCoordinator::new(writer, rules, config.history_limit),
            status: StatusMachine::new(config.saved_reset(), config.error_reset()),
            identity: collaborators.identity,
            store: collaborators.store,
            directory: collaborators.directory,
            lookups: JoinSet::new(),
            lookup_candidates: HashMap::new(),
            writes: JoinSet::new(),
            draft,
            gate,
            config,
            status_tx,
            validation_tx,
        }
    }

    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) -> SessionReport {
        loop {
            let deadline = earliest_deadline([
                self.fields.deadline(),
                self.tags.deadline(),
                self.handle.deadline(),
                self.status.deadline(),
            ]);

            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Unmount) | None => break,
                    Some(command) => self.on_command(command),
                },
                Some(joined) = self.lookups.join_next_with_id(), if !self.lookups.is_empty() => {
                    let (id, result) = match joined {
                        Ok((id, result)) => (id, result),
                        Err(e) => {
                            warn!(error = %e, "handle lookup task failed");
                            (e.id(), Err(RemoteError::Unavailable(e.to_string())))
                        }
                    };
                    if let Some(candidate) = self.lookup_candidates.remove(&id) {
                        self.on_lookup(candidate, result);
                    }
                }
                Some(joined) = self.writes.join_next(), if !self.writes.is_empty() => match joined {
                    Ok((id, result)) => self.on_write(id, result),
                    Err(e) => {
                        warn!(error = %e, "profile write task failed");
                        if let Some(id) = self.coordinator.in_flight_id() {
                            self.on_write(id, Err(RemoteError::Unavailable(e.to_string())));
                        }
                    }
                },
                _ = sleep_until_deadline(deadline), if deadline.is_some() => {
                    self.on_timers(Instant::now());
                }
            }
        }

        self.teardown()
    }

    fn on_command(&mut self, command: Command) {
        match command {
            Command::Edit(edit) => {
                let is_handle = matches!(edit, FieldEdit::Username(_));
                self.draft.apply(edit);
                self.fields.push(self.draft.fields.clone());
                if is_handle {
                    let candidate = self.draft.username().to_string();
                    if self.gate.track(&candidate) {
                        self.publish_validation();
                    }
                    self.handle.push(candidate);
                }
            }
            Command::ToggleTag(tag, reply) => {
                let result = self.draft.tags.toggle(tag, self.config.max_tags);
                if result.is_ok() {
                    self.tags.push(self.draft.tags.clone());
                }
                let _ = reply.send(result);
            }
            Command::SetTags(tags, reply) => {
                let result = self.draft.tags.replace(tags, self.config.max_tags);
                if result.is_ok() {
                    self.tags.push(self.draft.tags.clone());
                }
                let _ = reply.send(result);
            }
            Command::Flush => self.flush(),
            // handled by the loop
            Command::Unmount => {}
        }
    }

    fn flush(&mut self) {
        debug!("flushing pending edits");
        if let Some(fields) = self.fields.flush() {
            self.settled_fields = fields;
        }
        if let Some(tags) = self.tags.flush() {
            self.settled_tags = tags;
        }
        if let Some(candidate) = self.handle.flush() {
            self.settle_handle(candidate);
        }
        self.retry_handle_lookup();
        self.evaluate();
    }

    fn on_timers(&mut self, now: Instant) {
        let mut settled = false;
        if let Some(fields) = self.fields.poll_due(now) {
            self.settled_fields = fields;
            settled = true;
        }
        if let Some(tags) = self.tags.poll_due(now) {
            self.settled_tags = tags;
            settled = true;
        }
        if let Some(candidate) = self.handle.poll_due(now) {
            self.settle_handle(candidate);
        }
        if self.status.poll(now) {
            self.publish_status();
        }
        if settled {
            self.retry_handle_lookup();
            self.evaluate();
        }
    }

    /// Re-check a settled handle whose last lookup failed
    fn retry_handle_lookup(&mut self) {
        if self.handle.is_pending() {
            return;
        }
        let candidate = self.settled_fields.username.clone();
        if self.gate.retry_due(&candidate) {
            debug!(%candidate, "retrying failed handle lookup");
            self.settle_handle(candidate);
        }
    }

    fn settle_handle(&mut self, candidate: String) {
        let baseline = self.coordinator.baseline();
        match self.gate.settle(&candidate, baseline.username()) {
            SettleOutcome::Check(candidate) => {
                debug!(%candidate, "checking handle availability");
                let directory = Arc::clone(&self.directory);
                let owner = self.identity.current_owner();
                let checking = candidate.clone();
                let task = self.lookups.spawn(async move {
                    directory.is_handle_taken(&checking, owner.as_ref()).await
                });
                self.lookup_candidates.insert(task.id(), candidate);
            }
            SettleOutcome::Skip(reason) => {
                debug!(%candidate, ?reason, "handle lookup skipped");
            }
        }
        self.publish_validation();
    }

    fn on_lookup(&mut self, candidate: String, result: Result<bool, RemoteError>) {
        match self.gate.resolve(&candidate, result) {
            Resolution::Applied(state) => {
                debug!(%candidate, %state, "handle lookup resolved");
                self.publish_validation();
                if state == ValidationState::Available {
                    self.evaluate();
                }
            }
            Resolution::Stale => {}
            Resolution::Failed(_) => self.publish_validation(),
        }
    }

    /// Latest settled snapshot
    fn settled_snapshot(&self) -> Snapshot {
        Snapshot::capture(&self.settled_fields, &self.settled_tags)
    }

    fn evaluate(&mut self) {
        let snapshot = self.settled_snapshot();
        let owner = self.identity.current_owner();
        match self.coordinator.evaluate(&snapshot, owner, &self.gate) {
            Decision::Write(ticket) => self.start_write(ticket),
            Decision::Blocked(reason) => debug!(%reason, "save skipped"),
        }
    }

    fn start_write(&mut self, ticket: WriteTicket) {
        self.status.begin_saving();
        self.publish_status();

        let store = Arc::clone(&self.store);
        self.writes.spawn(async move {
            let result = store.update_profile(&ticket.owner, &ticket.record).await;
            (ticket.id, result)
        });
    }

    fn on_write(&mut self, id: Ulid, result: Result<(), RemoteError>) {
        let attempted = self.coordinator.in_flight_snapshot().cloned();
        let now = Instant::now();

        match self.coordinator.complete(id, result) {
            WriteOutcome::Saved => {
                self.status.finish(true, now);
                self.publish_status();
                // picks up anything that settled while the write was in flight
                self.evaluate();
            }
            WriteOutcome::Failed(_) => {
                self.status.finish(false, now);
                self.publish_status();
                // Retry right away only if newer edits settled meanwhile;
                // otherwise the next settle is the retry path.
                if attempted.as_ref() != Some(&self.settled_snapshot()) {
                    self.evaluate();
                }
            }
            WriteOutcome::Unknown => {}
        }
    }

    fn publish_status(&self) {
        self.status_tx.send_replace(self.status.status());
    }

    fn publish_validation(&self) {
        let result = self.gate.result().clone();
        self.validation_tx.send_if_modified(|current| {
            if *current == result {
                return false;
            }
            *current = result;
            true
        });
    }

    fn teardown(mut self) -> SessionReport {
        let discarded_fields = self.fields.cancel();
        let discarded_tags = self.tags.cancel();
        let discarded_handle = self.handle.cancel();
        self.status.cancel_timers();

        let abandoned_write = self.coordinator.is_saving();
        // in-flight calls run to completion; nobody is left to apply them
        self.lookups.detach_all();
        self.lookup_candidates.clear();
        self.writes.detach_all();

        let final_status = self.status.status();
        let (baseline, history) = self.coordinator.into_parts();
        info!(
            saves = history.len(),
            failed = history.failed(),
            abandoned_write,
            "profile editing session unmounted"
        );

        SessionReport {
            baseline: (*baseline).clone(),
            history,
            final_status,
            discarded_edits: discarded_fields || discarded_tags || discarded_handle,
            abandoned_write,
        }
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
