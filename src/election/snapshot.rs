// Reading and writing the state file.

use crate::election::*;

use election_ledger::builder::Builder;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::Write;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotCandidate {
    pub id: CandidateId,
    pub name: String,
}

/// The content of the state file.
///
/// Vote counts are not stored. They are rebuilt from the votes on load.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub candidates: Vec<SnapshotCandidate>,
    pub votes: Vec<Vote>,
    pub digest: String,
}

impl Snapshot {
    pub fn of(ledger: &Ledger) -> Snapshot {
        Snapshot {
            candidates: ledger
                .list_candidates()
                .iter()
                .map(|c| SnapshotCandidate {
                    id: c.id.clone(),
                    name: c.name.clone(),
                })
                .collect(),
            votes: ledger.list_votes().to_vec(),
            digest: ledger.fingerprint(),
        }
    }

    fn replay(&self) -> LedgerResult<Ledger> {
        let cands: Vec<(String, String)> = self
            .candidates
            .iter()
            .map(|c| (c.id.to_string(), c.name.clone()))
            .collect();
        let mut builder = Builder::new().candidates(&cands)?;
        builder.add_votes(&self.votes)?;
        builder.build()
    }
}

/// Reads the ledger stored at the given location.
///
/// A missing file is an empty ledger.
pub fn load_ledger(path: &Path) -> ElectorResult<Ledger> {
    let path_s = path.display().to_string();
    if !path.exists() {
        info!("No state file at {}, starting an empty election", path_s);
        return Ok(Ledger::new());
    }
    let contents = fs::read_to_string(path).context(OpeningStateSnafu {
        path: path_s.clone(),
    })?;
    let snapshot: Snapshot = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {
        path: path_s.clone(),
    })?;
    let ledger = snapshot.replay().context(ReplayStateSnafu {
        path: path_s.clone(),
    })?;

    debug_assert_eq!(ledger.verify_counts(), None);

    let found = ledger.fingerprint();
    ensure!(
        found == snapshot.digest,
        DigestMismatchSnafu {
            path: path_s,
            expected: snapshot.digest.clone(),
            found,
        }
    );
    debug!(
        "load_ledger: {} candidates, {} votes",
        ledger.list_candidates().len(),
        ledger.vote_count()
    );
    Ok(ledger)
}

/// Writes the ledger to the given location.
///
/// The content goes to a fresh temporary file next to the state file, which
/// then replaces the previous state. An interrupted write leaves the old state
/// intact.
pub fn save_ledger(path: &Path, ledger: &Ledger) -> ElectorResult<()> {
    let path_s = path.display().to_string();
    let js = serde_json::to_string_pretty(&Snapshot::of(ledger)).context(ParsingJsonSnafu {
        path: path_s.clone(),
    })?;
    let mut tmp = tempfile::NamedTempFile::new_in(state_dir(path)).context(WritingStateSnafu {
        path: path_s.clone(),
    })?;
    tmp.write_all(js.as_bytes()).context(WritingStateSnafu {
        path: tmp.path().display().to_string(),
    })?;
    tmp.persist(path)
        .map_err(|e| e.error)
        .context(WritingStateSnafu { path: path_s })?;
    debug!("save_ledger: wrote {}", path.display());
    Ok(())
}

fn state_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

/// An exclusive lock over a state file, held until dropped.
///
/// The lock is taken on a sibling `.lock` file, since the state file itself
/// is replaced on every save.
#[derive(Debug)]
pub struct StateLock {
    file: File,
    path: PathBuf,
}

impl StateLock {
    /// Blocks until no other process or thread holds the lock.
    pub fn acquire(state_path: &Path) -> ElectorResult<StateLock> {
        let mut name = state_path.file_name().unwrap_or_default().to_os_string();
        name.push(".lock");
        let path = state_path.with_file_name(name);
        let path_s = path.display().to_string();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)
            .context(LockingStateSnafu {
                path: path_s.clone(),
            })?;
        file.lock_exclusive()
            .context(LockingStateSnafu { path: path_s })?;
        debug!("StateLock: acquired {}", path.display());
        Ok(StateLock { file, path })
    }
}

impl Drop for StateLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!("Could not release {}: {}", self.path.display(), e);
        }
    }
}
