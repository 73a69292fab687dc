//! Bounded history of save attempts
//!
//! Every write the coordinator issues gets an entry keyed by ULID. Entries
//! are appended in issue order and the oldest are dropped once the log holds
//! `limit` entries.

use autosave_core::{Field, Fingerprint};
use serde::Serialize;
use std::collections::VecDeque;
use ulid::Ulid;

/// Outcome of a save attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "error", rename_all = "snake_case")]
pub enum SaveOutcome {
    InFlight,
    Succeeded,
    Failed(String),
}

/// One save attempt
#[derive(Debug, Clone, Serialize)]
pub struct SaveEntry {
    pub id: Ulid,
    /// Fingerprint of the snapshot that was sent
    pub fingerprint: Fingerprint,
    /// Fields that differed from the baseline at issue time
    pub changed: Vec<Field>,
    pub outcome: SaveOutcome,
}

/// Append-only, size-bounded save log
#[derive(Debug, Clone)]
pub struct SaveLog {
    entries: VecDeque<SaveEntry>,
    limit: usize,
}

impl SaveLog {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            limit: limit.max(1),
        }
    }

    /// Append a new in-flight attempt
    pub fn start(&mut self, id: Ulid, fingerprint: Fingerprint, changed: Vec<Field>) {
        if self.entries.len() == self.limit {
            self.entries.pop_front();
        }
        self.entries.push_back(SaveEntry {
            id,
            fingerprint,
            changed,
            outcome: SaveOutcome::InFlight,
        });
    }

    /// Record the outcome of an attempt; returns `false` if it was evicted
    pub fn finish(&mut self, id: &Ulid, outcome: SaveOutcome) -> bool {
        match self.entries.iter_mut().rev().find(|e| e.id == *id) {
            Some(entry) => {
                entry.outcome = outcome;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: &Ulid) -> Option<&SaveEntry> {
        self.entries.iter().find(|e| e.id == *id)
    }

    pub fn latest(&self) -> Option<&SaveEntry> {
        self.entries.back()
    }

    /// Entries oldest first
    pub fn entries(&self) -> impl Iterator<Item = &SaveEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn succeeded(&self) -> usize {
        self.count(|o| matches!(o, SaveOutcome::Succeeded))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, SaveOutcome::Failed(_)))
    }

    fn count(&self, pred: impl Fn(&SaveOutcome) -> bool) -> usize {
        self.entries.iter().filter(|e| pred(&e.outcome)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autosave_core::hash::hash_bytes;

    #[test]
    fn test_start_and_finish() {
        let mut log = SaveLog::new(10);
        let id = Ulid::new();
        log.start(id, hash_bytes(b"a"), vec![Field::Bio]);
        assert_eq!(log.latest().map(|e| &e.outcome), Some(&SaveOutcome::InFlight));

        assert!(log.finish(&id, SaveOutcome::Succeeded));
        assert_eq!(log.succeeded(), 1);
        assert_eq!(log.failed(), 0);
        assert_eq!(log.get(&id).map(|e| e.changed.clone()), Some(vec![Field::Bio]));
    }

    #[test]
    fn test_retention_drops_oldest() {
        let mut log = SaveLog::new(3);
        let ids: Vec<Ulid> = (0..5).map(|_| Ulid::new()).collect();
        for (i, id) in ids.iter().enumerate() {
            log.start(*id, hash_bytes(&[i as u8]), Vec::new());
        }

        assert_eq!(log.len(), 3);
        assert!(log.get(&ids[0]).is_none());
        assert!(log.get(&ids[1]).is_none());
        assert!(!log.finish(&ids[0], SaveOutcome::Succeeded));
        assert_eq!(log.entries().next().map(|e| e.id), Some(ids[2]));
    }

    #[test]
    fn test_failed_outcome_counted() {
        let mut log = SaveLog::new(5);
        let id = Ulid::new();
        log.start(id, hash_bytes(b"x"), Vec::new());
        log.finish(&id, SaveOutcome::Failed("backend down".into()));
        assert_eq!(log.failed(), 1);
        assert_eq!(log.succeeded(), 0);
    }
}
