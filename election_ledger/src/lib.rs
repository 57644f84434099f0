/*!
An in-memory election ledger: candidate registration, one vote per voter,
vote counting and winner determination.

```
use election_ledger::Ledger;
# use election_ledger::LedgerError;

let mut ledger = Ledger::new();
ledger.add_candidate("1", "Alice")?;
ledger.add_candidate("2", "Bob")?;
ledger.cast_vote("voter-100", "1")?;

let standings = ledger.results()?;
assert_eq!(standings.winners[0].name, "Alice");
# Ok::<(), LedgerError>(())
```

See the [manual] for the command line program built on top of this crate.
*/

pub mod builder;
mod config;
pub mod manual;
mod shared;

use log::{debug, info, warn};

use std::collections::{HashMap, HashSet};

pub use crate::config::*;
pub use crate::shared::SharedLedger;

/// The authoritative state of an election.
///
/// Candidates are kept in registration order. The vote log only grows, until
/// the next [`Ledger::reset`].
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct Ledger {
    candidates: Vec<Candidate>,
    // Position of each candidate in `candidates`.
    index: HashMap<CandidateId, usize>,
    votes: Vec<Vote>,
    voted: HashSet<VoterId>,
}

impl Ledger {
    pub fn new() -> Ledger {
        Ledger::default()
    }

    /// Registers a new candidate with no votes.
    ///
    /// Fails if the identifier is already taken. The returned value is a copy
    /// of the new candidate.
    pub fn add_candidate(&mut self, id: &str, name: &str) -> LedgerResult<Candidate> {
        let id = CandidateId::from(required(id, "id")?);
        let name = required(name, "name")?;
        if self.index.contains_key(&id) {
            warn!("add_candidate: candidate {} is already registered", id);
            return DuplicateCandidateSnafu { id }.fail();
        }

        let candidate = Candidate {
            id: id.clone(),
            name: name.to_string(),
            vote_count: 0,
        };
        self.index.insert(id, self.candidates.len());
        self.candidates.push(candidate.clone());
        info!(
            "Candidate registered: {}: {} ({} candidates)",
            candidate.id,
            candidate.name,
            self.candidates.len()
        );
        Ok(candidate)
    }

    /// Records the vote of a voter for a candidate, and returns the candidate
    /// with its updated count.
    ///
    /// A voter who already voted is rejected before the candidate is even
    /// looked up, so repeated attempts reveal nothing about the candidates.
    pub fn cast_vote(&mut self, voter: &str, candidate: &str) -> LedgerResult<Candidate> {
        let voter = VoterId::from(required(voter, "voterId")?);
        let candidate_id = CandidateId::from(required(candidate, "candidateId")?);

        if self.voted.contains(&voter) {
            warn!("cast_vote: voter {} has already voted", voter);
            return AlreadyVotedSnafu { voter }.fail();
        }
        let pos = match self.index.get(&candidate_id) {
            Some(pos) => *pos,
            None => {
                warn!("cast_vote: candidate {} does not exist", candidate_id);
                return CandidateNotFoundSnafu { id: candidate_id }.fail();
            }
        };

        // All the checks passed: nothing below can fail.
        let c = &mut self.candidates[pos];
        c.vote_count += 1;
        self.votes.push(Vote {
            voter_id: voter.clone(),
            candidate_id,
        });
        self.voted.insert(voter);
        debug!(
            "cast_vote: {} now has {} votes ({} votes in total)",
            c.id,
            c.vote_count,
            self.votes.len()
        );
        Ok(c.clone())
    }

    /// The registered candidates, in registration order.
    pub fn list_candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    /// The accepted votes, in the order they were cast.
    pub fn list_votes(&self) -> &[Vote] {
        &self.votes
    }

    pub fn candidate(&self, id: &str) -> Option<&Candidate> {
        self.index
            .get(&CandidateId::from(id))
            .map(|pos| &self.candidates[*pos])
    }

    pub fn has_voted(&self, voter: &str) -> bool {
        self.voted.contains(&VoterId::from(voter))
    }

    pub fn vote_count(&self) -> u64 {
        self.votes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty() && self.votes.is_empty()
    }

    /// Tallies the election.
    ///
    /// The ranking is sorted by decreasing votes. The sort is stable, so equal
    /// counts stay in registration order. The winners are all the candidates
    /// with the top count, provided that this count is not zero.
    pub fn results(&self) -> LedgerResult<Standings> {
        snafu::ensure!(!self.candidates.is_empty(), NoCandidatesSnafu);

        let mut ranking: Vec<Candidate> = self.candidates.clone();
        ranking.sort_by(|a, b| b.vote_count.cmp(&a.vote_count));

        let top = ranking.first().map(|c| c.vote_count).unwrap_or(0);
        let winners: Vec<Candidate> = if top > 0 {
            ranking
                .iter()
                .take_while(|c| c.vote_count == top)
                .cloned()
                .collect()
        } else {
            Vec::new()
        };
        info!(
            "Results: {} candidates, {} votes, winners: {:?}",
            ranking.len(),
            self.votes.len(),
            winners.iter().map(|c| c.name.as_str()).collect::<Vec<&str>>()
        );
        Ok(Standings {
            ranking,
            winners,
            total_votes: self.vote_count(),
        })
    }

    /// Removes all the candidates, votes and voters.
    pub fn reset(&mut self) {
        info!(
            "Resetting ledger ({} candidates, {} votes)",
            self.candidates.len(),
            self.votes.len()
        );
        *self = Ledger::default();
    }

    /// Recomputes the count of each candidate from the vote log.
    ///
    /// Returns the first candidate whose stored count disagrees with the log,
    /// along with the count found in the log. A disagreement is a bug in the
    /// ledger itself.
    pub fn verify_counts(&self) -> Option<(CandidateId, u64)> {
        let mut from_log: HashMap<&CandidateId, u64> = HashMap::new();
        for v in self.votes.iter() {
            *from_log.entry(&v.candidate_id).or_insert(0) += 1;
        }
        for c in self.candidates.iter() {
            let expected = from_log.get(&c.id).cloned().unwrap_or(0);
            if expected != c.vote_count {
                return Some((c.id.clone(), expected));
            }
        }
        let unknown = from_log.keys().find(|cid| !self.index.contains_key(**cid));
        unknown.map(|cid| ((*cid).clone(), 0))
    }

    /// A SHA-256 digest (hex encoded) over the candidates and the vote log.
    ///
    /// Two ledgers that went through the same sequence of successful
    /// operations have the same fingerprint.
    pub fn fingerprint(&self) -> String {
        let mut data = String::new();
        for c in self.candidates.iter() {
            push_field(&mut data, "c");
            push_field(&mut data, c.id.as_str());
            push_field(&mut data, c.name.as_str());
        }
        for v in self.votes.iter() {
            push_field(&mut data, "v");
            push_field(&mut data, v.voter_id.as_str());
            push_field(&mut data, v.candidate_id.as_str());
        }
        sha256::digest(data.as_str())
    }
}

// Length-prefixed so that no two distinct ledgers serialize to the same string.
fn push_field(data: &mut String, field: &str) {
    data.push_str(&format!("{}:{};", field.len(), field));
}
