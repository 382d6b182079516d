use std::fs;
use std::io::{self, Write};

use strata_codec::{from_bytes, to_bytes, CodecError};
use strata_model::{Commit, CommitHook, CommitRepository, CommitService, StoreError, StoreResult};
use strata_types::Hash;
use tracing::{debug, warn};

use crate::layout::DiskLayout;

/// Reads the commit log: one file per commit, named by the commit hash.
#[derive(Clone, Debug)]
pub struct DiskCommitRepository {
    layout: DiskLayout,
}

impl DiskCommitRepository {
    pub fn new(layout: DiskLayout) -> Self {
        Self { layout }
    }
}

impl CommitRepository for DiskCommitRepository {
    fn list(&self) -> StoreResult<Vec<Hash>> {
        let entries = match fs::read_dir(self.layout.commit_dir()) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut hashes = Vec::new();
        for entry in entries {
            let name = entry?.file_name();
            match name.to_str().map(Hash::from_hex) {
                Some(Ok(hash)) => hashes.push(hash),
                _ => warn!(file = ?name, "skipping non-commit entry in commit log"),
            }
        }
        hashes.sort();
        Ok(hashes)
    }

    fn retrieve(&self, hash: &Hash) -> StoreResult<Commit> {
        let bytes = match fs::read(self.layout.commit_file(hash)) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::CommitNotFound(*hash))
            }
            Err(err) => return Err(err.into()),
        };
        let (commit, rest) = from_bytes::<Commit>(&bytes)?;
        if !rest.is_empty() {
            return Err(CodecError::TrailingBytes(rest.len()).into());
        }
        if commit.hash() != hash {
            return Err(StoreError::InvariantViolation(format!(
                "commit file {hash} holds commit {}",
                commit.hash()
            )));
        }
        Ok(commit)
    }
}

/// Writes and removes commit-log files.
///
/// Every file is written to a temporary name and renamed, so a commit is
/// either absent or complete under its canonical name.
#[derive(Clone, Debug)]
pub struct DiskCommitService {
    layout: DiskLayout,
}

impl DiskCommitService {
    pub fn new(layout: DiskLayout) -> Self {
        Self { layout }
    }

    fn write(&self, hash: &Hash, bytes: &[u8]) -> StoreResult<()> {
        fs::create_dir_all(self.layout.commit_dir())?;
        let mut file = self.layout.commit_temp_file(hash)?;
        file.write_all(bytes)?;
        if self.layout.sync_mode().syncs() {
            file.as_file().sync_all()?;
        }
        file.persist(self.layout.commit_file(hash))
            .map_err(|err| StoreError::Io(err.error))?;
        Ok(())
    }
}

impl CommitService for DiskCommitService {
    fn insert(&self, commit: &Commit, on_written: CommitHook<'_>) -> StoreResult<()> {
        let hash = commit.hash();
        self.write(hash, &to_bytes(commit)).inspect_err(|err| {
            warn!(commit = %hash, error = %err, "failed to write commit file");
        })?;
        debug!(commit = %hash, values = commit.values().len(), "wrote commit file");

        if let Err(err) = on_written(commit) {
            warn!(commit = %hash, error = %err, "commit hook failed; removing commit file");
            if let Err(cleanup) = fs::remove_file(self.layout.commit_file(hash)) {
                warn!(commit = %hash, error = %cleanup, "failed to remove commit file");
            }
            return Err(err);
        }
        Ok(())
    }

    fn delete(&self, commit: &Commit, on_deleted: CommitHook<'_>) -> StoreResult<()> {
        let hash = commit.hash();
        let path = self.layout.commit_file(hash);
        let original = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                warn!(commit = %hash, "commit file to delete does not exist");
                return Err(StoreError::CommitNotFound(*hash));
            }
            Err(err) => {
                warn!(commit = %hash, error = %err, "failed to read commit file before delete");
                return Err(err.into());
            }
        };
        fs::remove_file(&path).inspect_err(|err| {
            warn!(commit = %hash, error = %err, "failed to delete commit file");
        })?;
        debug!(commit = %hash, "deleted commit file");

        if let Err(err) = on_deleted(commit) {
            warn!(commit = %hash, error = %err, "commit hook failed; restoring commit file");
            if let Err(restore) = self.write(hash, &original) {
                warn!(commit = %hash, error = %restore, "failed to restore commit file");
            }
            return Err(err);
        }
        Ok(())
    }
}
