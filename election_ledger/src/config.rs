// ********* Identifiers ***********

use serde::{Deserialize, Serialize};
use snafu::Snafu;
use std::fmt::Display;

/// The identifier of a candidate, as supplied by the caller.
///
/// The ledger never generates identifiers. Surrounding whitespace is not
/// significant and is removed when the identifier is read from user input.
#[derive(Eq, PartialEq, Debug, Clone, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateId(String);

/// The identifier of a voter, as supplied by the caller.
#[derive(Eq, PartialEq, Debug, Clone, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoterId(String);

macro_rules! impl_identifier {
    ($t:ident) => {
        impl $t {
            pub fn as_str(&self) -> &str {
                self.0.as_str()
            }
        }

        impl Display for $t {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $t {
            fn from(s: &str) -> $t {
                $t(s.trim().to_string())
            }
        }

        impl From<String> for $t {
            fn from(s: String) -> $t {
                $t::from(s.as_str())
            }
        }
    };
}

impl_identifier!(CandidateId);
impl_identifier!(VoterId);

// ********* Ledger records ***********

/// A registered candidate.
///
/// `vote_count` is maintained by the ledger and always equals the number of
/// accepted votes that reference this candidate.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub id: CandidateId,
    pub name: String,
    pub vote_count: u64,
}

/// An accepted ballot. Votes are never modified once recorded.
#[derive(Eq, PartialEq, Debug, Clone, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub voter_id: VoterId,
    pub candidate_id: CandidateId,
}

// ******** Output data structures *********

/// The outcome of tallying the ledger.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Standings {
    /// All the candidates, by decreasing number of votes. Candidates with the
    /// same number of votes keep their registration order.
    pub ranking: Vec<Candidate>,
    /// The candidates sharing the highest number of votes, in registration order.
    /// Empty if nobody received a vote.
    pub winners: Vec<Candidate>,
    pub total_votes: u64,
}

impl Standings {
    pub fn has_winner(&self) -> bool {
        !self.winners.is_empty()
    }

    /// True if more than one candidate shares the top spot.
    /// Ties are reported as such and never broken.
    pub fn is_tie(&self) -> bool {
        self.winners.len() > 1
    }
}

// ********* Errors **********

/// The reasons for which the ledger may refuse an operation.
///
/// All of them are expected conditions: the ledger state is left untouched
/// when one of them is returned.
#[derive(Eq, PartialEq, Debug, Clone, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum LedgerError {
    #[snafu(display("Missing required field: {field}"))]
    MissingField { field: &'static str },

    #[snafu(display("Candidate {id} is already registered"))]
    DuplicateCandidate { id: CandidateId },

    #[snafu(display("Candidate {id} does not exist"))]
    CandidateNotFound { id: CandidateId },

    #[snafu(display("Voter {voter} has already voted"))]
    AlreadyVoted { voter: VoterId },

    #[snafu(display("No candidates registered"))]
    NoCandidates {},
}

impl LedgerError {
    /// A short, stable code for this error, suitable for machine consumption.
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::MissingField { .. } => "missing_field",
            LedgerError::DuplicateCandidate { .. } => "candidate_exists",
            LedgerError::CandidateNotFound { .. } => "candidate_not_found",
            LedgerError::AlreadyVoted { .. } => "already_voted",
            LedgerError::NoCandidates { .. } => "no_candidates",
        }
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Reads a required field from user input.
///
/// Blank input is treated the same as missing input.
pub(crate) fn required<'a>(value: &'a str, field: &'static str) -> LedgerResult<&'a str> {
    let trimmed = value.trim();
    snafu::ensure!(!trimmed.is_empty(), MissingFieldSnafu { field });
    Ok(trimmed)
}
