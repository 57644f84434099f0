pub use crate::config::*;
use crate::Ledger;

use log::debug;

/// A builder for assembling a ledger from recorded data.
///
/// The builder does not trust its input: `build` replays every registration
/// and every vote through the ledger, so the counts of the result are always
/// derived from the votes.
///
/// ```
/// use election_ledger::builder::Builder;
/// # use election_ledger::LedgerError;
///
/// let mut builder = Builder::new()
///     .candidates(&[("1".to_string(), "Anna".to_string()), ("2".to_string(), "Bob".to_string())])?;
///
/// builder.add_vote("voter-1", "2")?;
/// builder.add_vote("voter-2", "2")?;
///
/// let ledger = builder.build()?;
/// assert_eq!(ledger.candidate("2").unwrap().vote_count, 2);
///
/// # Ok::<(), LedgerError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Builder {
    pub(crate) _candidates: Vec<(String, String)>,
    pub(crate) _votes: Vec<(String, String)>,
}

impl Builder {
    pub fn new() -> Builder {
        Builder::default()
    }

    /// Sets the candidates, as (id, name) pairs, in registration order.
    ///
    /// Replaces the candidates that were set before. Votes already added are kept.
    pub fn candidates(self, cands: &[(String, String)]) -> LedgerResult<Builder> {
        for (id, name) in cands.iter() {
            required(id, "id")?;
            required(name, "name")?;
        }
        Ok(Builder {
            _candidates: cands.to_vec(),
            _votes: self._votes,
        })
    }

    /// Adds a vote to the builder. Votes are replayed in the order they were added.
    pub fn add_vote(&mut self, voter: &str, candidate: &str) -> LedgerResult<()> {
        required(voter, "voterId")?;
        required(candidate, "candidateId")?;
        self._votes.push((voter.to_string(), candidate.to_string()));
        Ok(())
    }

    /// Adds all the votes of a log, such as the one returned by [`Ledger::list_votes`].
    pub fn add_votes(&mut self, votes: &[Vote]) -> LedgerResult<()> {
        for v in votes {
            self.add_vote(v.voter_id.as_str(), v.candidate_id.as_str())?;
        }
        Ok(())
    }

    /// Creates the ledger.
    ///
    /// Fails with the error of the first registration or vote that the
    /// ledger refuses.
    pub fn build(&self) -> LedgerResult<Ledger> {
        let mut ledger = Ledger::new();
        for (id, name) in self._candidates.iter() {
            ledger.add_candidate(id, name)?;
        }
        for (voter, candidate) in self._votes.iter() {
            ledger.cast_vote(voter, candidate)?;
        }
        debug!(
            "build: replayed {} candidates and {} votes",
            self._candidates.len(),
            self._votes.len()
        );
        Ok(ledger)
    }
}
