//! Persistence coordinator
//!
//! Decides when the debounced snapshot is written. A write is issued only if
//! no other write is in flight, the snapshot differs from the baseline, an
//! owner is signed in, the handle passes shape rules, and the validation gate
//! permits the handle. The baseline advances only on a confirmed success, so
//! an edit that lands while a write is in flight is still dirty once that
//! write resolves and is picked up by the next evaluation.

use crate::baseline::{BaselineReader, BaselineWriter};
use crate::history::{SaveLog, SaveOutcome};
use autosave_core::{
    changed_fields, is_dirty, HandleRules, HandleShape, OwnerId, ProfileRecord, RemoteError,
    Snapshot,
};
use autosave_watcher::{ValidationGate, ValidationState};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};
use ulid::Ulid;

/// Why no write was issued
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Blocked {
    /// A write is already in flight
    InFlight,
    /// Debounced snapshot equals the baseline
    Clean,
    /// No signed-in owner
    NoOwner,
    HandleShape(HandleShape),
    /// Handle changed and has no `available` answer yet
    HandleUnverified(ValidationState),
}

impl fmt::Display for Blocked {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Blocked::InFlight => write!(f, "write in flight"),
            Blocked::Clean => write!(f, "no changes"),
            Blocked::NoOwner => write!(f, "not signed in"),
            Blocked::HandleShape(shape) => write!(f, "handle {shape}"),
            Blocked::HandleUnverified(state) => write!(f, "handle availability {state}"),
        }
    }
}

/// A write the caller must send to the store
#[derive(Debug, Clone)]
pub struct WriteTicket {
    pub id: Ulid,
    pub owner: OwnerId,
    /// Full-surface payload
    pub record: ProfileRecord,
}

#[derive(Debug, Clone)]
pub enum Decision {
    Write(WriteTicket),
    Blocked(Blocked),
}

/// Result of completing a write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Baseline advanced to the written snapshot
    Saved,
    /// Baseline untouched
    Failed(RemoteError),
    /// Completion for a ticket that is not in flight; ignored
    Unknown,
}

struct InFlight {
    id: Ulid,
    snapshot: Snapshot,
}

/// Owns the baseline and the write guard
pub struct PersistenceCoordinator {
    baseline: BaselineWriter,
    rules: HandleRules,
    in_flight: Option<InFlight>,
    history: SaveLog,
}

impl PersistenceCoordinator {
    pub fn new(baseline: BaselineWriter, rules: HandleRules, history_limit: usize) -> Self {
        Self {
            baseline,
            rules,
            in_flight: None,
            history: SaveLog::new(history_limit),
        }
    }

    /// Last confirmed snapshot
    pub fn baseline(&self) -> Arc<Snapshot> {
        self.baseline.current()
    }

    pub fn baseline_reader(&self) -> BaselineReader {
        self.baseline.reader()
    }

    pub fn is_saving(&self) -> bool {
        self.in_flight.is_some()
    }

    /// The snapshot currently being written, if any
    pub fn in_flight_snapshot(&self) -> Option<&Snapshot> {
        self.in_flight.as_ref().map(|f| &f.snapshot)
    }

    pub fn in_flight_id(&self) -> Option<Ulid> {
        self.in_flight.as_ref().map(|f| f.id)
    }

    pub fn history(&self) -> &SaveLog {
        &self.history
    }

    /// Run the write guard against the latest debounced snapshot
    pub fn evaluate(
        &mut self,
        debounced: &Snapshot,
        owner: Option<OwnerId>,
        gate: &ValidationGate,
    ) -> Decision {
        if self.in_flight.is_some() {
            return Decision::Blocked(Blocked::InFlight);
        }

        let baseline = self.baseline.current();
        if !is_dirty(debounced, &baseline) {
            return Decision::Blocked(Blocked::Clean);
        }

        let Some(owner) = owner else {
            debug!("dirty snapshot but no owner, not saving");
            return Decision::Blocked(Blocked::NoOwner);
        };

        let handle = debounced.username();
        let shape = self.rules.check(handle);
        if !shape.is_valid() {
            debug!(handle, %shape, "handle blocks save");
            return Decision::Blocked(Blocked::HandleShape(shape));
        }

        if !gate.permits(handle, baseline.username()) {
            let result = gate.result();
            let state = if result.candidate == handle {
                result.state
            } else {
                ValidationState::Unchecked
            };
            debug!(handle, %state, "handle not verified, not saving");
            return Decision::Blocked(Blocked::HandleUnverified(state));
        }

        let id = Ulid::new();
        let changed = changed_fields(debounced, &baseline);
        let fingerprint = debounced.fingerprint();
        info!(
            save_id = %id,
            snapshot = %fingerprint.short(),
            changed = ?changed,
            "issuing profile write"
        );
        self.history.start(id, fingerprint, changed);
        self.in_flight = Some(InFlight {
            id,
            snapshot: debounced.clone(),
        });

        Decision::Write(WriteTicket {
            id,
            owner,
            record: debounced.to_record(),
        })
    }

    /// Resolve the in-flight write
    pub fn complete(&mut self, id: Ulid, result: Result<(), RemoteError>) -> WriteOutcome {
        let in_flight = match self.in_flight.take() {
            Some(f) if f.id == id => f,
            other => {
                self.in_flight = other;
                warn!(save_id = %id, "completion for unknown write ignored");
                return WriteOutcome::Unknown;
            }
        };

        match result {
            Ok(()) => {
                info!(save_id = %id, "profile write confirmed");
                self.history.finish(&id, SaveOutcome::Succeeded);
                self.baseline.replace(in_flight.snapshot);
                WriteOutcome::Saved
            }
            Err(e) => {
                warn!(save_id = %id, error = %e, "profile write failed, baseline kept");
                self.history.finish(&id, SaveOutcome::Failed(e.to_string()));
                WriteOutcome::Failed(e)
            }
        }
    }

    /// Tear down, returning the final baseline and history
    pub fn into_parts(self) -> (Arc<Snapshot>, SaveLog) {
        (self.baseline.current(), self.history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::baseline::baseline;
    use autosave_core::{FieldEdit, ProfileDraft};

    fn record() -> ProfileRecord {
        ProfileRecord {
            username: "spacewolf99".into(),
            ..Default::default()
        }
    }

    fn owner() -> Option<OwnerId> {
        Some(OwnerId("user-1".into()))
    }

    fn setup() -> (PersistenceCoordinator, ValidationGate) {
        let (writer, _) = baseline(Snapshot::from_record(&record()));
        let rules = HandleRules::default();
        (
            PersistenceCoordinator::new(writer, rules, 10),
            ValidationGate::new(rules, "spacewolf99"),
        )
    }

    fn edited(edits: Vec<FieldEdit>) -> Snapshot {
        let mut draft = ProfileDraft::from_record(&record(), 3);
        for edit in edits {
            draft.apply(edit);
        }
        Snapshot::capture(&draft.fields, &draft.tags)
    }

    fn expect_write(decision: Decision) -> WriteTicket {
        match decision {
            Decision::Write(ticket) => ticket,
            Decision::Blocked(reason) => panic!("expected write, blocked: {reason}"),
        }
    }

    #[test]
    fn test_clean_snapshot_is_not_written() {
        let (mut coordinator, gate) = setup();
        let snapshot = Snapshot::from_record(&record());
        assert!(matches!(
            coordinator.evaluate(&snapshot, owner(), &gate),
            Decision::Blocked(Blocked::Clean)
        ));
    }

    #[test]
    fn test_dirty_snapshot_is_written_and_baseline_advances() {
        let (mut coordinator, gate) = setup();
        let snapshot = edited(vec![FieldEdit::Bio("Veteran painter".into())]);

        let ticket = expect_write(coordinator.evaluate(&snapshot, owner(), &gate));
        assert_eq!(ticket.record.bio.as_deref(), Some("Veteran painter"));
        assert_eq!(ticket.record.username, "spacewolf99");
        assert!(coordinator.is_saving());

        assert_eq!(coordinator.complete(ticket.id, Ok(())), WriteOutcome::Saved);
        assert!(!coordinator.is_saving());
        assert_eq!(*coordinator.baseline(), snapshot);
        assert!(matches!(
            coordinator.evaluate(&snapshot, owner(), &gate),
            Decision::Blocked(Blocked::Clean)
        ));
    }

    #[test]
    fn test_failure_keeps_baseline() {
        let (mut coordinator, gate) = setup();
        let snapshot = edited(vec![FieldEdit::Location("Fenris".into())]);

        let ticket = expect_write(coordinator.evaluate(&snapshot, owner(), &gate));
        let outcome = coordinator.complete(ticket.id, Err(RemoteError::Unavailable("503".into())));
        assert!(matches!(outcome, WriteOutcome::Failed(_)));
        assert_eq!(coordinator.baseline().location(), None);
        assert_eq!(coordinator.history().failed(), 1);

        // still dirty, so the next evaluation retries
        expect_write(coordinator.evaluate(&snapshot, owner(), &gate));
    }

    #[test]
    fn test_only_one_write_in_flight() {
        let (mut coordinator, gate) = setup();
        let first = edited(vec![FieldEdit::Bio("one".into())]);
        let second = edited(vec![FieldEdit::Bio("two".into())]);

        let ticket = expect_write(coordinator.evaluate(&first, owner(), &gate));
        assert!(matches!(
            coordinator.evaluate(&second, owner(), &gate),
            Decision::Blocked(Blocked::InFlight)
        ));

        coordinator.complete(ticket.id, Ok(()));
        // baseline is the written snapshot, so the newer one is still dirty
        assert_eq!(coordinator.baseline().bio(), Some("one"));
        let ticket = expect_write(coordinator.evaluate(&second, owner(), &gate));
        assert_eq!(ticket.record.bio.as_deref(), Some("two"));
    }

    #[test]
    fn test_no_owner_blocks() {
        let (mut coordinator, gate) = setup();
        let snapshot = edited(vec![FieldEdit::Bio("x".into())]);
        assert!(matches!(
            coordinator.evaluate(&snapshot, None, &gate),
            Decision::Blocked(Blocked::NoOwner)
        ));
    }

    #[test]
    fn test_short_handle_blocks_even_with_other_changes() {
        let (mut coordinator, gate) = setup();
        let snapshot = edited(vec![
            FieldEdit::Username("az".into()),
            FieldEdit::Bio("Veteran painter".into()),
        ]);
        assert!(matches!(
            coordinator.evaluate(&snapshot, owner(), &gate),
            Decision::Blocked(Blocked::HandleShape(HandleShape::TooShort { .. }))
        ));
    }

    #[test]
    fn test_changed_handle_needs_available_answer() {
        let (mut coordinator, mut gate) = setup();
        let snapshot = edited(vec![FieldEdit::Username("grey_knight".into())]);

        assert!(matches!(
            coordinator.evaluate(&snapshot, owner(), &gate),
            Decision::Blocked(Blocked::HandleUnverified(ValidationState::Unchecked))
        ));

        gate.settle("grey_knight", "spacewolf99");
        assert!(matches!(
            coordinator.evaluate(&snapshot, owner(), &gate),
            Decision::Blocked(Blocked::HandleUnverified(ValidationState::Pending))
        ));

        gate.resolve("grey_knight", Ok(true));
        assert!(matches!(
            coordinator.evaluate(&snapshot, owner(), &gate),
            Decision::Blocked(Blocked::HandleUnverified(ValidationState::Taken))
        ));

        gate.track("grey_knight_2");
        gate.settle("grey_knight_2", "spacewolf99");
        gate.resolve("grey_knight_2", Ok(false));
        let snapshot = edited(vec![FieldEdit::Username("grey_knight_2".into())]);
        expect_write(coordinator.evaluate(&snapshot, owner(), &gate));
    }

    #[test]
    fn test_unknown_completion_is_ignored() {
        let (mut coordinator, gate) = setup();
        let snapshot = edited(vec![FieldEdit::Bio("x".into())]);
        let ticket = expect_write(coordinator.evaluate(&snapshot, owner(), &gate));

        assert_eq!(coordinator.complete(Ulid::new(), Ok(())), WriteOutcome::Unknown);
        assert!(coordinator.is_saving());
        assert_eq!(coordinator.complete(ticket.id, Ok(())), WriteOutcome::Saved);
    }
}
