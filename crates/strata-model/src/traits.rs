use strata_types::Hash;

use crate::commit::Commit;
use crate::error::StoreResult;
use crate::pointer::Pointer;
use crate::resource::Resource;
use crate::state::State;

/// Hook run at an operation's commit point. Returning an error aborts the
/// operation and triggers its compensating action.
pub type CommitHook<'a> = &'a dyn Fn(&Commit) -> StoreResult<()>;

/// Head state as read from the database file.
#[derive(Clone, Debug)]
pub struct StoredHead {
    pub state: State,
    /// Size of the header, 8-byte length prefix included. The resource blob
    /// starts at this offset.
    pub header_len: u64,
}

/// Read access to the head state of a database file.
///
/// Implementations must:
/// - Return `Ok(None)` when no database file exists (or it is empty).
/// - Never observe a partially replaced file.
pub trait StateRepository: Send + Sync {
    fn retrieve(&self) -> StoreResult<Option<StoredHead>>;

    /// Head state only.
    fn head(&self) -> StoreResult<Option<State>> {
        Ok(self.retrieve()?.map(|stored| stored.state))
    }
}

/// Random access to the resource blob of a database file.
pub trait ResourceRepository: Send + Sync {
    /// Offset inside the resource blob where the next entry will start.
    /// Zero when no database file exists.
    fn next_index(&self) -> StoreResult<u64>;

    /// Read the entry `pointer` addresses.
    fn retrieve(&self, pointer: &Pointer) -> StoreResult<Resource>;
}

/// The sole mutator of a database file.
pub trait StateService: Send + Sync {
    /// Append the commit's values to the resource blob and make the state
    /// pointing at them the new head.
    ///
    /// `on_commit_point` runs after the replacement file is fully built and
    /// before it is renamed over the database file. If it fails, the
    /// database file is left untouched and its error is returned.
    fn insert(&self, commit: &Commit, on_commit_point: CommitHook<'_>) -> StoreResult<State>;
}

/// Read access to the commit log.
pub trait CommitRepository: Send + Sync {
    /// Hashes of every commit in the log, sorted. Empty when the log
    /// directory does not exist.
    fn list(&self) -> StoreResult<Vec<Hash>>;

    /// Fails with [`StoreError::CommitNotFound`](crate::StoreError::CommitNotFound)
    /// when the log holds no such commit.
    fn retrieve(&self, hash: &Hash) -> StoreResult<Commit>;
}

/// Write access to the commit log.
pub trait CommitService: Send + Sync {
    /// Durably write `commit`, then run `on_written`. If the hook fails, the
    /// written file is removed again.
    fn insert(&self, commit: &Commit, on_written: CommitHook<'_>) -> StoreResult<()>;

    /// Remove `commit` from the log, then run `on_deleted`. If the hook fails,
    /// the file is restored.
    fn delete(&self, commit: &Commit, on_deleted: CommitHook<'_>) -> StoreResult<()>;
}

/// Hook that accepts every commit.
pub fn no_hook(_: &Commit) -> StoreResult<()> {
    Ok(())
}
