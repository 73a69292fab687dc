//! Baseline snapshot cell
//!
//! The baseline is the last snapshot confirmed persisted (or the hydrated
//! one). Exactly one `BaselineWriter` exists per cell and it is not `Clone`;
//! replacing the baseline swaps a whole `Arc<Snapshot>`, so readers see
//! either the old or the new snapshot, never a mix.

use autosave_core::Snapshot;
use parking_lot::RwLock;
use std::sync::Arc;

type Shared = Arc<RwLock<Arc<Snapshot>>>;

/// Create a baseline cell seeded with the hydrated snapshot
pub fn baseline(initial: Snapshot) -> (BaselineWriter, BaselineReader) {
    let shared: Shared = Arc::new(RwLock::new(Arc::new(initial)));
    (
        BaselineWriter {
            shared: Arc::clone(&shared),
        },
        BaselineReader { shared },
    )
}

/// Sole writer of the baseline
pub struct BaselineWriter {
    shared: Shared,
}

impl BaselineWriter {
    pub fn current(&self) -> Arc<Snapshot> {
        Arc::clone(&*self.shared.read())
    }

    /// Swap in a newly confirmed snapshot, returning the previous one
    pub fn replace(&mut self, next: Snapshot) -> Arc<Snapshot> {
        std::mem::replace(&mut *self.shared.write(), Arc::new(next))
    }

    pub fn reader(&self) -> BaselineReader {
        BaselineReader {
            shared: Arc::clone(&self.shared),
        }
    }
}

/// Read-only view of the baseline
#[derive(Clone)]
pub struct BaselineReader {
    shared: Shared,
}

impl BaselineReader {
    pub fn current(&self) -> Arc<Snapshot> {
        Arc::clone(&*self.shared.read())
    }
}
