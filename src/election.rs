use log::{debug, info, warn};

use election_ledger::*;
use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::{Args, Command};
use crate::election::config_reader::*;
use crate::election::io_csv::*;
use crate::election::snapshot::*;

pub mod config_reader;
pub mod io_csv;
pub mod snapshot;

#[derive(Debug, Snafu)]
pub enum ElectorError {
    #[snafu(display("Error reading state file {path}"))]
    OpeningState {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error writing state file {path}"))]
    WritingState {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error locking state file {path}"))]
    LockingState {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error reading configuration file {path}"))]
    OpeningConfig {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error reading JSON file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Invalid JSON in {path}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Expected a string or an integer as identifier, found {value}"))]
    ParsingJsonId { value: String },

    #[snafu(display("The state file {path} contains an invalid election"))]
    ReplayState { source: LedgerError, path: String },
    #[snafu(display(
        "The state file {path} was modified outside of elector (expected digest {expected}, found {found})"
    ))]
    DigestMismatch {
        path: String,
        expected: String,
        found: String,
    },
    #[snafu(display("The configured candidates cannot be registered"))]
    SeedCandidates { source: LedgerError },

    #[snafu(display("Error opening CSV file {path}"))]
    CsvOpen {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error reading line {lineno} of {path}"))]
    CsvLineParse {
        source: csv::Error,
        path: String,
        lineno: usize,
    },
    #[snafu(display("Line {lineno} of {path} does not have the expected number of fields"))]
    CsvLineTooShort { path: String, lineno: usize },
    #[snafu(display("Nothing to import: pass --candidates or --votes"))]
    NothingToImport {},

    #[snafu(display("The results differ from the reference {path}"))]
    ReferenceMismatch { path: String },
}

pub type ElectorResult<T> = Result<T, ElectorError>;

/// The response to a command, and whether the ledger must be saved.
#[derive(PartialEq, Debug, Clone)]
struct Outcome {
    response: JSValue,
    changed: bool,
}

impl Outcome {
    fn read(response: JSValue) -> Outcome {
        Outcome {
            response,
            changed: false,
        }
    }

    fn write(response: JSValue) -> Outcome {
        Outcome {
            response,
            changed: true,
        }
    }

    fn refused(err: &LedgerError) -> Outcome {
        warn!("Operation refused: {}", err);
        Outcome::read(failure_js(err))
    }
}

fn failure_js(err: &LedgerError) -> JSValue {
    json!({"ok": false, "msg": err.code(), "error": err.to_string()})
}

fn results_js(standings: &Standings, contest_name: &Option<String>) -> JSValue {
    let mut js = json!({
        "ok": true,
        "results": standings.ranking,
        "winners": standings.winners,
        "totalVotes": standings.total_votes,
    });
    if let Some(contest) = contest_name {
        js["contest"] = json!(contest);
    }
    js
}

/// Registers the configured candidates if the ledger is empty.
fn seed_ledger(ledger: &mut Ledger, seed: &[(String, String)]) -> ElectorResult<bool> {
    if !ledger.is_empty() || seed.is_empty() {
        return Ok(false);
    }
    for (id, name) in seed.iter() {
        ledger.add_candidate(id, name).context(SeedCandidatesSnafu)?;
    }
    info!("Registered {} candidates from the configuration", seed.len());
    Ok(true)
}

fn apply_command(
    ledger: &mut Ledger,
    command: &Command,
    settings: &Settings,
) -> ElectorResult<Outcome> {
    debug!("apply_command: {:?}", command);
    let outcome = match command {
        Command::Add { id, name } => match ledger.add_candidate(id, name.join(" ").as_str()) {
            Ok(c) => Outcome::write(json!({
                "ok": true,
                "msg": "candidate_added",
                "candidate": c,
                "candidates": ledger.list_candidates(),
            })),
            Err(e) => Outcome::refused(&e),
        },
        Command::Vote { voter, candidate } => match ledger.cast_vote(voter, candidate) {
            Ok(c) => Outcome::write(json!({"ok": true, "msg": "vote_casted", "candidate": c})),
            Err(e) => Outcome::refused(&e),
        },
        Command::ListCandidates => {
            Outcome::read(json!({"ok": true, "candidates": ledger.list_candidates()}))
        }
        Command::ListVotes => Outcome::read(json!({"ok": true, "votes": ledger.list_votes()})),
        Command::Results => match ledger.results() {
            Ok(st) => Outcome::read(results_js(&st, &settings.contest_name)),
            Err(e) => Outcome::refused(&e),
        },
        Command::Reset => {
            ledger.reset();
            Outcome::write(json!({"ok": true, "msg": "reset_done"}))
        }
        Command::Import { candidates, votes } => {
            import_csv(ledger, candidates.as_deref(), votes.as_deref())?
        }
    };
    Ok(outcome)
}

// The rows are applied to a copy: the ledger only changes if all of them
// are accepted.
fn import_csv(
    ledger: &mut Ledger,
    candidates_path: Option<&str>,
    votes_path: Option<&str>,
) -> ElectorResult<Outcome> {
    ensure!(
        candidates_path.is_some() || votes_path.is_some(),
        NothingToImportSnafu
    );
    let mut staged = ledger.clone();

    let mut num_candidates = 0;
    if let Some(p) = candidates_path {
        for row in read_candidates_csv(p)? {
            if let Err(e) = staged.add_candidate(&row.first, &row.second) {
                return Ok(import_refused(&e, p, row.lineno));
            }
            num_candidates += 1;
        }
    }
    let mut num_votes = 0;
    if let Some(p) = votes_path {
        for row in read_votes_csv(p)? {
            if let Err(e) = staged.cast_vote(&row.first, &row.second) {
                return Ok(import_refused(&e, p, row.lineno));
            }
            num_votes += 1;
        }
    }

    info!(
        "Imported {} candidates and {} votes",
        num_candidates, num_votes
    );
    *ledger = staged;
    Ok(Outcome::write(json!({
        "ok": true,
        "msg": "imported",
        "candidates": num_candidates,
        "votes": num_votes,
    })))
}

fn import_refused(err: &LedgerError, path: &str, lineno: usize) -> Outcome {
    let mut outcome = Outcome::refused(err);
    outcome.response["file"] = json!(path);
    outcome.response["line"] = json!(lineno);
    outcome
}

pub fn read_summary(path: &Path) -> ElectorResult<JSValue> {
    let path_s = path.display().to_string();
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu {
        path: path_s.clone(),
    })?;
    debug!("read content: {:?}", contents);
    let js: JSValue =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path: path_s })?;
    Ok(js)
}

/// Fails if the response differs from the reference JSON document.
/// The differences are printed line by line.
fn check_reference(reference_p: &Path, response: &JSValue) -> ElectorResult<()> {
    let path_s = reference_p.display().to_string();
    let summary_ref = read_summary(reference_p)?;
    info!("reference: {:?}", summary_ref);
    let pretty_ref = serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {
        path: path_s.clone(),
    })?;
    let pretty = serde_json::to_string_pretty(response).context(ParsingJsonSnafu {
        path: path_s.clone(),
    })?;
    if pretty_ref != pretty {
        warn!("Found differences with the reference {}", path_s);
        print_diff(pretty_ref.as_str(), pretty.as_str(), "\n");
        return ReferenceMismatchSnafu { path: path_s }.fail();
    }
    Ok(())
}

/// Runs one command against the state file, and returns the response to print.
///
/// Refused operations (duplicate candidate, second vote, ...) are part of the
/// response. Errors are reserved for problems with the files.
pub fn run_elector(args: &Args) -> ElectorResult<JSValue> {
    let settings = Settings::resolve(args)?;
    info!("settings: {:?}", settings);

    // Held from the load to the save, so that concurrent runs apply their
    // commands one after the other.
    let lock = StateLock::acquire(&settings.state_path)?;
    let mut ledger = load_ledger(&settings.state_path)?;
    seed_ledger(&mut ledger, &settings.seed_candidates)?;

    let outcome = apply_command(&mut ledger, &args.command, &settings)?;
    if outcome.changed {
        save_ledger(&settings.state_path, &ledger)?;
    }
    drop(lock);

    if let Some(reference_p) = settings.reference_path.as_ref() {
        match args.command {
            Command::Results => check_reference(reference_p, &outcome.response)?,
            _ => warn!("--reference is only used with the results command, ignoring it"),
        }
    }
    Ok(outcome.response)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Env {
        dir: tempfile::TempDir,
    }

    impl Env {
        fn new() -> Env {
            let _ = env_logger::builder().is_test(true).try_init();
            Env {
                dir: tempfile::tempdir().unwrap(),
            }
        }

        fn path(&self, name: &str) -> String {
            self.dir.path().join(name).display().to_string()
        }

        fn write(&self, name: &str, contents: &str) -> String {
            let p = self.path(name);
            fs::write(&p, contents).unwrap();
            p
        }

        fn args(&self, command: Command) -> Args {
            let mut args = Args::for_command(command);
            args.state = Some(self.path("state.json"));
            args
        }

        fn run(&self, command: Command) -> JSValue {
            run_elector(&self.args(command)).unwrap()
        }

        fn add(&self, id: &str, name: &str) -> JSValue {
            self.run(Command::Add {
                id: id.to_string(),
                name: name.split(' ').map(|s| s.to_string()).collect(),
            })
        }

        fn vote(&self, voter: &str, candidate: &str) -> JSValue {
            self.run(Command::Vote {
                voter: voter.to_string(),
                candidate: candidate.to_string(),
            })
        }
    }

    #[test]
    fn election_across_invocations() {
        let env = Env::new();
        let r = env.add("1", "Alice");
        assert_eq!(r["msg"], "candidate_added");
        assert_eq!(r["candidates"].as_array().unwrap().len(), 1);
        let r = env.add("2", "Bob Smith");
        assert_eq!(r["candidate"]["name"], "Bob Smith");

        let r = env.vote("100", "1");
        assert_eq!(r["ok"], true);
        assert_eq!(r["msg"], "vote_casted");
        assert_eq!(r["candidate"]["voteCount"], 1);

        let r = env.vote("100", "2");
        assert_eq!(r, json!({"ok": false, "msg": "already_voted", "error": "Voter 100 has already voted"}));

        let r = env.run(Command::Results);
        assert_eq!(r["results"][0]["name"], "Alice");
        assert_eq!(r["winners"].as_array().unwrap().len(), 1);
        assert_eq!(r["winners"][0]["id"], "1");
        assert_eq!(r["totalVotes"], 1);

        let r = env.run(Command::ListVotes);
        assert_eq!(r["votes"], json!([{"voterId": "100", "candidateId": "1"}]));
    }

    #[test]
    fn refused_operations_do_not_touch_the_state() {
        let env = Env::new();
        env.add("1", "Alice");
        let before = fs::read_to_string(env.path("state.json")).unwrap();

        assert_eq!(env.add("1", "Alice")["msg"], "candidate_exists");
        assert_eq!(env.vote("7", "99")["msg"], "candidate_not_found");
        assert_eq!(env.vote(" ", "1")["msg"], "missing_field");

        let after = fs::read_to_string(env.path("state.json")).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn results_without_candidates() {
        let env = Env::new();
        let r = env.run(Command::Results);
        assert_eq!(r["ok"], false);
        assert_eq!(r["msg"], "no_candidates");
        // Read commands never create the state file.
        assert!(!Path::new(&env.path("state.json")).exists());
    }

    #[test]
    fn reset_then_vote_again() {
        let env = Env::new();
        env.add("1", "Alice");
        env.vote("100", "1");
        assert_eq!(env.run(Command::Reset)["msg"], "reset_done");
        assert_eq!(env.run(Command::ListCandidates)["candidates"], json!([]));
        assert_eq!(env.run(Command::ListVotes)["votes"], json!([]));

        env.add("1", "Alice");
        assert_eq!(env.vote("100", "1")["ok"], true);
    }

    #[test]
    fn zero_votes_no_winner() {
        let env = Env::new();
        env.add("1", "Alice");
        env.add("2", "Bob");
        let r = env.run(Command::Results);
        assert_eq!(r["ok"], true);
        assert_eq!(r["results"].as_array().unwrap().len(), 2);
        assert_eq!(r["winners"], json!([]));
    }

    #[test]
    fn import_is_all_or_nothing() {
        let env = Env::new();
        let cands = env.write("candidates.csv", "1,Alice\n2,Bob\n");
        let bad_votes = env.write("bad_votes.csv", "100,1\n101,2\n100,2\n");
        let r = env.run(Command::Import {
            candidates: Some(cands.clone()),
            votes: Some(bad_votes.clone()),
        });
        assert_eq!(r["msg"], "already_voted");
        assert_eq!(r["line"], 3);
        assert_eq!(r["file"], json!(bad_votes));
        assert_eq!(env.run(Command::ListCandidates)["candidates"], json!([]));

        let votes = env.write("votes.csv", "100,1\n101,2\n102,2\n");
        let r = env.run(Command::Import {
            candidates: Some(cands),
            votes: Some(votes),
        });
        assert_eq!(r, json!({"ok": true, "msg": "imported", "candidates": 2, "votes": 3}));
        let r = env.run(Command::Results);
        assert_eq!(r["winners"][0]["name"], "Bob");
        assert_eq!(r["winners"][0]["voteCount"], 2);
    }

    #[test]
    fn import_needs_a_file() {
        let env = Env::new();
        let err = run_elector(&env.args(Command::Import {
            candidates: None,
            votes: None,
        }))
        .unwrap_err();
        assert!(matches!(err, ElectorError::NothingToImport { .. }));
    }

    #[test]
    fn configured_candidates_and_contest() {
        let env = Env::new();
        let config = env.write(
            "config.json",
            r#"{"contestName": "Council", "statePath": "council.json",
                "candidates": [{"id": 1, "name": "Alice"}, {"id": 2, "name": "Bob"}]}"#,
        );
        let mut args = Args::for_command(Command::Vote {
            voter: "100".to_string(),
            candidate: "2".to_string(),
        });
        args.config = Some(config.clone());
        assert_eq!(run_elector(&args).unwrap()["ok"], true);
        assert!(Path::new(&env.path("council.json")).exists());

        let mut args = Args::for_command(Command::Results);
        args.config = Some(config);
        let r = run_elector(&args).unwrap();
        assert_eq!(r["contest"], "Council");
        let names: Vec<&str> = r["results"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Bob", "Alice"]);
    }

    #[test]
    fn reference_comparison() {
        let env = Env::new();
        env.add("1", "Alice");
        env.vote("100", "1");

        let expected = json!({
            "ok": true,
            "results": [{"id": "1", "name": "Alice", "voteCount": 1}],
            "winners": [{"id": "1", "name": "Alice", "voteCount": 1}],
            "totalVotes": 1,
        });
        let good = env.write("good.json", &expected.to_string());
        let mut args = env.args(Command::Results);
        args.reference = Some(good);
        assert_eq!(run_elector(&args).unwrap(), expected);

        let bad = env.write("bad.json", r#"{"ok": true, "results": []}"#);
        args.reference = Some(bad);
        assert!(matches!(
            run_elector(&args).unwrap_err(),
            ElectorError::ReferenceMismatch { .. }
        ));
    }

    #[test]
    fn overlapping_runs_keep_one_vote_per_voter() {
        let env = Env::new();
        env.add("1", "Alice");
        env.add("2", "Bob");

        let responses: Vec<JSValue> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let env = &env;
                    s.spawn(move || {
                        let voter = if i < 4 {
                            "100".to_string()
                        } else {
                            format!("20{}", i)
                        };
                        env.vote(&voter, if i % 2 == 0 { "1" } else { "2" })
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let same_voter_ok = responses[..4].iter().filter(|r| r["ok"] == true).count();
        assert_eq!(same_voter_ok, 1);
        for r in responses[..4].iter().filter(|r| r["ok"] == false) {
            assert_eq!(r["msg"], "already_voted");
        }
        for r in responses[4..].iter() {
            assert_eq!(r["msg"], "vote_casted");
        }

        // Every accepted vote made it to the state file.
        let votes = env.run(Command::ListVotes)["votes"].as_array().unwrap().clone();
        assert_eq!(votes.len(), 5);
        assert_eq!(env.run(Command::Results)["totalVotes"], 5);
        let names: Vec<String> = fs::read_dir(env.dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| n.ends_with(".tmp") || n.starts_with(".tmp"))
            .collect();
        assert!(names.is_empty(), "leftover temporary files: {:?}", names);
    }

    #[test]
    fn corrupted_state_is_an_error() {
        let env = Env::new();
        env.add("1", "Alice");
        let p = env.path("state.json");
        let tampered = fs::read_to_string(&p).unwrap().replace("Alice", "Mallory");
        fs::write(&p, tampered).unwrap();
        assert!(matches!(
            run_elector(&env.args(Command::ListCandidates)).unwrap_err(),
            ElectorError::DigestMismatch { .. }
        ));
    }
}
