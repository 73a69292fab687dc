//! Handle availability gate
//!
//! The gate tracks exactly one candidate handle at a time. Results are keyed
//! by candidate value: a lookup that resolves for anything other than the
//! currently tracked, pending candidate is discarded as stale. There is no
//! cancellation of the lookup itself, only of its effect.

use autosave_core::{HandleRules, HandleShape, RemoteError};
use std::fmt;
use tracing::{debug, warn};

/// Availability of the tracked handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationState {
    /// No lookup needed or none has settled yet
    Unchecked,
    /// Lookup issued (or failed) and not yet answered
    Pending,
    Available,
    Taken,
}

impl fmt::Display for ValidationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ValidationState::Unchecked => "unchecked",
            ValidationState::Pending => "pending",
            ValidationState::Available => "available",
            ValidationState::Taken => "taken",
        };
        f.write_str(s)
    }
}

/// Validation state together with the candidate it describes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub candidate: String,
    pub state: ValidationState,
}

impl ValidationResult {
    pub fn unchecked(candidate: impl Into<String>) -> Self {
        Self {
            candidate: candidate.into(),
            state: ValidationState::Unchecked,
        }
    }
}

/// Why a settled candidate did not need a lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Candidate equals the persisted handle
    Unchanged,
    /// Candidate fails local shape rules
    Shape(HandleShape),
    /// A lookup for this candidate is already in flight
    InFlight,
    /// This candidate already has an answer
    Resolved(ValidationState),
}

/// What the owner should do after a candidate settles
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettleOutcome {
    /// Issue exactly one remote lookup for this candidate
    Check(String),
    Skip(SkipReason),
}

/// Effect of a lookup response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Applied(ValidationState),
    /// Response belongs to a superseded candidate; ignored
    Stale,
    /// Lookup failed; state stays pending so writes remain gated
    Failed(RemoteError),
}

/// Tri-state availability gate for the handle field
pub struct ValidationGate {
    rules: HandleRules,
    current: ValidationResult,
    in_flight: bool,
}

impl ValidationGate {
    /// Start tracking the hydrated handle
    pub fn new(rules: HandleRules, initial: &str) -> Self {
        Self {
            rules,
            current: ValidationResult::unchecked(initial),
            in_flight: false,
        }
    }

    pub fn result(&self) -> &ValidationResult {
        &self.current
    }

    /// Follow the handle as it is typed
    ///
    /// A different candidate invalidates whatever the gate knew, including
    /// any lookup still in flight. Returns `true` if the result changed.
    pub fn track(&mut self, candidate: &str) -> bool {
        if self.current.candidate == candidate {
            return false;
        }
        self.current = ValidationResult::unchecked(candidate);
        self.in_flight = false;
        true
    }

    /// A candidate has settled; decide whether it needs a lookup
    pub fn settle(&mut self, candidate: &str, persisted: &str) -> SettleOutcome {
        self.track(candidate);

        if candidate == persisted {
            self.current.state = ValidationState::Unchecked;
            self.in_flight = false;
            return SettleOutcome::Skip(SkipReason::Unchanged);
        }

        let shape = self.rules.check(candidate);
        if !shape.is_valid() {
            debug!(candidate, %shape, "handle fails shape rules, skipping lookup");
            return SettleOutcome::Skip(SkipReason::Shape(shape));
        }

        match self.current.state {
            ValidationState::Available | ValidationState::Taken => {
                SettleOutcome::Skip(SkipReason::Resolved(self.current.state))
            }
            ValidationState::Pending if self.in_flight => SettleOutcome::Skip(SkipReason::InFlight),
            // Unchecked, or pending after a failed lookup
            _ => {
                self.current.state = ValidationState::Pending;
                self.in_flight = true;
                SettleOutcome::Check(candidate.to_string())
            }
        }
    }

    /// Apply a lookup response, discarding it if the candidate moved on
    pub fn resolve(&mut self, candidate: &str, outcome: Result<bool, RemoteError>) -> Resolution {
        if self.current.candidate != candidate || self.current.state != ValidationState::Pending {
            debug!(
                candidate,
                tracked = %self.current.candidate,
                "discarding stale handle lookup"
            );
            return Resolution::Stale;
        }

        self.in_flight = false;
        match outcome {
            Ok(taken) => {
                self.current.state = if taken {
                    ValidationState::Taken
                } else {
                    ValidationState::Available
                };
                Resolution::Applied(self.current.state)
            }
            Err(e) => {
                warn!(candidate, error = %e, "handle lookup failed, keeping save gated");
                Resolution::Failed(e)
            }
        }
    }

    /// Whether `candidate` is pending after a failed lookup with nothing in flight
    ///
    /// The owner re-settles such a candidate on the next settle of any
    /// stream, so further edits retry the lookup.
    pub fn retry_due(&self, candidate: &str) -> bool {
        self.current.candidate == candidate
            && self.current.state == ValidationState::Pending
            && !self.in_flight
    }

    /// Whether a write carrying `candidate` may proceed
    ///
    /// The persisted handle never needs a lookup. Any other candidate needs
    /// an `available` answer for that exact value; pending, taken, failed or
    /// not-yet-settled all block.
    pub fn permits(&self, candidate: &str, persisted: &str) -> bool {
        if candidate == persisted {
            return true;
        }
        self.current.candidate == candidate && self.current.state == ValidationState::Available
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate() -> ValidationGate {
        ValidationGate::new(HandleRules::default(), "spacewolf99")
    }

    #[test]
    fn test_unchanged_candidate_is_skipped() {
        let mut gate = gate();
        assert_eq!(
            gate.settle("spacewolf99", "spacewolf99"),
            SettleOutcome::Skip(SkipReason::Unchanged)
        );
        assert_eq!(gate.result().state, ValidationState::Unchecked);
        assert!(gate.permits("spacewolf99", "spacewolf99"));
    }

    #[test]
    fn test_short_candidate_never_checks() {
        let mut gate = gate();
        let outcome = gate.settle("az", "spacewolf99");
        assert_eq!(
            outcome,
            SettleOutcome::Skip(SkipReason::Shape(HandleShape::TooShort { len: 2, min: 3 }))
        );
        assert_eq!(gate.result().state, ValidationState::Unchecked);
        assert!(!gate.permits("az", "spacewolf99"));
    }

    #[test]
    fn test_check_then_available() {
        let mut gate = gate();
        assert_eq!(
            gate.settle("grey_knight", "spacewolf99"),
            SettleOutcome::Check("grey_knight".into())
        );
        assert_eq!(gate.result().state, ValidationState::Pending);
        assert!(!gate.permits("grey_knight", "spacewolf99"));

        assert_eq!(
            gate.resolve("grey_knight", Ok(false)),
            Resolution::Applied(ValidationState::Available)
        );
        assert!(gate.permits("grey_knight", "spacewolf99"));
    }

    #[test]
    fn test_taken_blocks() {
        let mut gate = gate();
        gate.settle("ragnar", "spacewolf99");
        gate.resolve("ragnar", Ok(true));
        assert_eq!(gate.result().state, ValidationState::Taken);
        assert!(!gate.permits("ragnar", "spacewolf99"));
    }

    #[test]
    fn test_stale_result_is_discarded() {
        let mut gate = gate();
        gate.settle("aaa", "spacewolf99");
        gate.track("bbb");
        gate.settle("bbb", "spacewolf99");

        assert_eq!(gate.resolve("bbb", Ok(false)), Resolution::Applied(ValidationState::Available));
        // late answer for the superseded candidate
        assert_eq!(gate.resolve("aaa", Ok(true)), Resolution::Stale);
        assert_eq!(gate.result().candidate, "bbb");
        assert_eq!(gate.result().state, ValidationState::Available);
    }

    #[test]
    fn test_answer_for_unsettled_candidate_is_stale() {
        let mut gate = gate();
        gate.settle("aaa", "spacewolf99");
        gate.track("aaab");
        gate.track("aaa");
        // back to the same text, but no lookup pending for it anymore
        assert_eq!(gate.resolve("aaa", Ok(false)), Resolution::Stale);
        assert_eq!(gate.result().state, ValidationState::Unchecked);
    }

    #[test]
    fn test_failure_keeps_pending_and_allows_retry() {
        let mut gate = gate();
        gate.settle("grey_knight", "spacewolf99");
        let resolution = gate.resolve("grey_knight", Err(RemoteError::Unavailable("timeout".into())));
        assert!(matches!(resolution, Resolution::Failed(_)));
        assert_eq!(gate.result().state, ValidationState::Pending);
        assert!(!gate.permits("grey_knight", "spacewolf99"));

        // next settle of the same candidate is the retry path
        assert_eq!(
            gate.settle("grey_knight", "spacewolf99"),
            SettleOutcome::Check("grey_knight".into())
        );
    }

    #[test]
    fn test_retry_due_only_after_failure() {
        let mut gate = gate();
        assert!(!gate.retry_due("grey_knight"));

        gate.settle("grey_knight", "spacewolf99");
        // lookup still in flight
        assert!(!gate.retry_due("grey_knight"));

        gate.resolve("grey_knight", Err(RemoteError::Unavailable("offline".into())));
        assert!(gate.retry_due("grey_knight"));
        assert!(!gate.retry_due("other_name"));

        assert_eq!(
            gate.settle("grey_knight", "spacewolf99"),
            SettleOutcome::Check("grey_knight".into())
        );
        assert!(!gate.retry_due("grey_knight"));
        gate.resolve("grey_knight", Ok(false));
        assert!(!gate.retry_due("grey_knight"));
    }

    #[test]
    fn test_settle_while_in_flight_does_not_duplicate_lookup() {
        let mut gate = gate();
        gate.settle("grey_knight", "spacewolf99");
        assert_eq!(
            gate.settle("grey_knight", "spacewolf99"),
            SettleOutcome::Skip(SkipReason::InFlight)
        );
        gate.resolve("grey_knight", Ok(false));
        assert_eq!(
            gate.settle("grey_knight", "spacewolf99"),
            SettleOutcome::Skip(SkipReason::Resolved(ValidationState::Available))
        );
    }

    #[test]
    fn test_track_same_candidate_keeps_result() {
        let mut gate = gate();
        gate.settle("grey_knight", "spacewolf99");
        gate.resolve("grey_knight", Ok(false));
        assert!(!gate.track("grey_knight"));
        assert_eq!(gate.result().state, ValidationState::Available);
        assert!(gate.track("grey_knigh"));
        assert_eq!(gate.result().state, ValidationState::Unchecked);
    }
}
