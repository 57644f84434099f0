use clap::{Parser, Subcommand};

/// This is an election ledger: register candidates, record votes and tally the results.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, default election.json) The file holding the state of the election. It is created
    /// by the first command that changes the election.
    #[clap(short, long, value_parser)]
    pub state: Option<String>,

    /// (file path, optional) A JSON configuration file. See the manual for the options.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (file path) A reference file containing the outcome of an election in JSON format. If provided with
    /// the results command, elector will check that the results match the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// If passed as an argument, will turn on verbose logging to the standard error.
    #[clap(long, takes_value = false)]
    pub verbose: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, Eq, PartialEq)]
pub enum Command {
    /// Registers a new candidate.
    Add {
        /// The identifier of the candidate. It must not be used by another candidate.
        #[clap(value_parser)]
        id: String,
        /// The name of the candidate. Multiple words are joined with spaces.
        #[clap(value_parser, required = true)]
        name: Vec<String>,
    },
    /// Records the vote of a voter. Every voter may only vote once.
    Vote {
        #[clap(value_parser)]
        voter: String,
        #[clap(value_parser)]
        candidate: String,
    },
    /// Lists the candidates, in registration order.
    ListCandidates,
    /// Lists the votes, in the order they were cast.
    ListVotes,
    /// Tallies the election.
    Results,
    /// Removes all the candidates and votes.
    Reset,
    /// Imports candidates and votes from CSV files.
    Import {
        /// (file path) Rows of `id,name`, without header.
        #[clap(long, value_parser)]
        candidates: Option<String>,
        /// (file path) Rows of `voterId,candidateId`, without header.
        #[clap(long, value_parser)]
        votes: Option<String>,
    },
}

#[cfg(test)]
impl Args {
    pub fn for_command(command: Command) -> Args {
        Args {
            state: None,
            config: None,
            reference: None,
            verbose: false,
            command,
        }
    }
}
