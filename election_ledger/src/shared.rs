use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::debug;

use crate::{Candidate, Ledger, LedgerResult, Standings, Vote};

/// A handle to a ledger that can be shared between threads.
///
/// Cloning the handle does not copy the ledger. Every mutation holds the write
/// lock for its whole duration, so readers only ever see the ledger before or
/// after an operation, never in between.
#[derive(Debug, Clone, Default)]
pub struct SharedLedger {
    inner: Arc<RwLock<Ledger>>,
}

impl SharedLedger {
    pub fn new(ledger: Ledger) -> SharedLedger {
        SharedLedger {
            inner: Arc::new(RwLock::new(ledger)),
        }
    }

    // The ledger validates before it mutates, so a writer that panicked
    // cannot have left a partial update behind. The poison flag is ignored.
    fn read(&self) -> RwLockReadGuard<'_, Ledger> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Ledger> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_candidate(&self, id: &str, name: &str) -> LedgerResult<Candidate> {
        self.write().add_candidate(id, name)
    }

    pub fn cast_vote(&self, voter: &str, candidate: &str) -> LedgerResult<Candidate> {
        self.write().cast_vote(voter, candidate)
    }

    pub fn list_candidates(&self) -> Vec<Candidate> {
        self.read().list_candidates().to_vec()
    }

    pub fn list_votes(&self) -> Vec<Vote> {
        self.read().list_votes().to_vec()
    }

    pub fn results(&self) -> LedgerResult<Standings> {
        self.read().results()
    }

    pub fn reset(&self) {
        self.write().reset()
    }

    /// A consistent copy of the whole ledger.
    pub fn snapshot(&self) -> Ledger {
        let ledger = self.read().clone();
        debug!(
            "snapshot: {} candidates, {} votes",
            ledger.list_candidates().len(),
            ledger.vote_count()
        );
        ledger
    }

    /// Unwraps the ledger if this is the last handle, otherwise returns a copy.
    pub fn into_ledger(self) -> Ledger {
        match Arc::try_unwrap(self.inner) {
            Ok(lock) => lock.into_inner().unwrap_or_else(PoisonError::into_inner),
            Err(inner) => SharedLedger { inner }.snapshot(),
        }
    }
}

impl From<Ledger> for SharedLedger {
    fn from(ledger: Ledger) -> SharedLedger {
        SharedLedger::new(ledger)
    }
}
