use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Seek, SeekFrom, Write};
use std::sync::Mutex;

use strata_codec::to_bytes;
use strata_model::{
    clock, Commit, CommitHook, PointerSet, Resource, State, StateService, StoreError, StoreResult,
};
use strata_types::Hash;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::layout::DiskLayout;
use crate::resource_repository::blob_len;
use crate::state_repository::{read_head, DiskStateRepository};

/// Writes new head states by rebuilding the database file in a temporary
/// file and renaming it over the original.
///
/// Replacement file layout:
/// ```text
/// [8 bytes LE: S][S bytes: new state][old resource blob][new key ‖ value entries]
/// ```
///
/// Building the file happens outside the lock. The lock covers the head
/// re-check, the commit-point hook and the rename.
#[derive(Debug)]
pub struct DiskStateService {
    layout: DiskLayout,
    states: DiskStateRepository,
    replace: Mutex<()>,
}

/// A fully written replacement waiting to be renamed into place.
struct Replacement {
    /// Head the replacement was built on.
    base: Option<Hash>,
    state: State,
    file: NamedTempFile,
}

impl DiskStateService {
    pub fn new(layout: DiskLayout) -> Self {
        Self {
            states: DiskStateRepository::new(layout.clone()),
            layout,
            replace: Mutex::new(()),
        }
    }

    fn prepare(&self, commit: &Commit) -> StoreResult<Replacement> {
        fs::create_dir_all(self.layout.root())?;
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.layout.db_file())?;

        // One handle for the head, the blob size and the blob copy, so all
        // three describe the same file even if it is replaced meanwhile.
        let mut current = File::open(self.layout.db_file())?;
        let head = read_head(&mut current)?;
        let header_len = head.as_ref().map_or(0, |stored| stored.header_len);
        let mut index = blob_len(current.metadata()?.len(), header_len)?;

        let mut resources = Vec::with_capacity(commit.values().len());
        for value in commit.values() {
            let resource = Resource::new(value.namespace(), *value.resource(), value.data().to_vec(), index)?;
            index += resource.pointer().length();
            resources.push(resource);
        }
        let pointers = PointerSet::new(resources.iter().map(|r| r.pointer().clone()).collect());
        let head = head.map(|stored| stored.state);
        let state = State::next(head.as_ref(), pointers, clock::now_nanos());
        let encoded = to_bytes(&state);

        let mut file = self.layout.db_temp_file()?;
        {
            let mut out = BufWriter::new(&mut file);
            out.write_all(&(encoded.len() as u64).to_le_bytes())?;
            out.write_all(&encoded)?;
            current.seek(SeekFrom::Start(header_len))?;
            io::copy(&mut current, &mut out)?;
            for resource in &resources {
                resource.write_entry(&mut out)?;
            }
            out.flush()?;
        }
        if self.layout.sync_mode().syncs() {
            file.as_file().sync_all()?;
        }

        debug!(
            commit = %commit.hash(),
            state = %state.hash(),
            path = %file.path().display(),
            "built replacement database file"
        );
        Ok(Replacement {
            base: head.map(|state| *state.hash()),
            state,
            file,
        })
    }

    fn publish(
        &self,
        replacement: Replacement,
        commit: &Commit,
        on_commit_point: CommitHook<'_>,
    ) -> StoreResult<State> {
        let _guard = self.replace.lock().expect("state service lock poisoned");

        let found = self.states.head_hash()?;
        if found != replacement.base {
            warn!(commit = %commit.hash(), "head changed during push; database file left unchanged");
            return Err(StoreError::StaleHead {
                expected: replacement.base,
                found,
            });
        }
        if let Err(err) = on_commit_point(commit) {
            warn!(commit = %commit.hash(), error = %err, "commit point rejected; database file left unchanged");
            return Err(err);
        }
        replacement
            .file
            .persist(self.layout.db_file())
            .map_err(|err| StoreError::Io(err.error))?;

        debug!(
            commit = %commit.hash(),
            head = %replacement.state.hash(),
            height = replacement.state.height(),
            "replaced database file"
        );
        Ok(replacement.state)
    }
}

impl StateService for DiskStateService {
    fn insert(&self, commit: &Commit, on_commit_point: CommitHook<'_>) -> StoreResult<State> {
        let replacement = self.prepare(commit).inspect_err(|err| {
            warn!(commit = %commit.hash(), error = %err, "failed to build replacement database file");
        })?;
        self.publish(replacement, commit, on_commit_point)
    }
}
