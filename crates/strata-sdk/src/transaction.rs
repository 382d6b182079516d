use std::cell::Cell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use strata_crypto::ContentHasher;
use strata_model::{
    clock, no_hook, Commit, CommitRepository, CommitService, ModelError, Staged, State,
    StateService, StoreError, StoreResult,
};
use strata_types::Hash;
use tracing::{debug, info, warn};

use crate::error::{SdkError, SdkResult};

struct StagedContext {
    writes: Staged,
    began_at: Instant,
}

#[derive(Clone, Copy)]
struct CommittedContext {
    commit: Hash,
    began_at: Instant,
}

#[derive(Default)]
struct Contexts {
    staged: HashMap<Hash, StagedContext>,
    committed: HashMap<Hash, CommittedContext>,
}

/// Transaction coordinator.
///
/// A context moves through `begin → insert* → commit → push`, or is rolled
/// back after `commit`:
///
/// - `begin` mints a context id and empty staging storage.
/// - `insert` stages a write; the last write to a namespace/key pair wins.
/// - `commit` writes the staged data to the commit log and moves the context
///   from the staged map to the committed map.
/// - `push` folds the durable commit into a new head state and deletes the
///   commit-log file.
/// - `rollback` deletes a durable commit that was never pushed.
///
/// Both maps sit behind one mutex. Disk I/O never runs while it is held,
/// apart from the short commit-point hooks handed to the services.
pub struct Transactions {
    commits: Arc<dyn CommitRepository>,
    commit_service: Arc<dyn CommitService>,
    state_service: Arc<dyn StateService>,
    contexts: Mutex<Contexts>,
    sequence: AtomicU64,
    context_ttl: Option<Duration>,
}

impl Transactions {
    pub fn new(
        commits: Arc<dyn CommitRepository>,
        commit_service: Arc<dyn CommitService>,
        state_service: Arc<dyn StateService>,
    ) -> Self {
        Self {
            commits,
            commit_service,
            state_service,
            contexts: Mutex::new(Contexts::default()),
            sequence: AtomicU64::new(0),
            context_ttl: None,
        }
    }

    /// Drop contexts older than `ttl` whenever a new one begins.
    pub fn with_context_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.context_ttl = ttl;
        self
    }

    /// Start a transaction and return its context id.
    pub fn begin(&self) -> Hash {
        if let Some(ttl) = self.context_ttl {
            self.expire(ttl);
        }
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let ctx = ContentHasher::CONTEXT.hash_parts(&[
            clock::now_nanos().to_string().as_bytes(),
            sequence.to_string().as_bytes(),
        ]);
        self.lock().staged.insert(
            ctx,
            StagedContext {
                writes: Staged::new(),
                began_at: Instant::now(),
            },
        );
        debug!(context = %ctx, "began transaction");
        ctx
    }

    /// Stage `data` under `namespace`/`resource`, replacing any earlier write
    /// to the same pair.
    pub fn insert(
        &self,
        ctx: &Hash,
        namespace: impl Into<String>,
        resource: Hash,
        data: Vec<u8>,
    ) -> SdkResult<()> {
        let namespace = namespace.into();
        if namespace.is_empty() {
            return Err(ModelError::EmptyNamespace { entity: "value" }.into());
        }
        let mut contexts = self.lock();
        let staged = contexts
            .staged
            .get_mut(ctx)
            .ok_or(SdkError::UnknownContext(*ctx))?;
        staged.writes.entry(namespace).or_default().insert(resource, data);
        Ok(())
    }

    /// Snapshot of the writes staged under `ctx`.
    pub fn queue(&self, ctx: &Hash) -> SdkResult<Staged> {
        self.lock()
            .staged
            .get(ctx)
            .map(|staged| staged.writes.clone())
            .ok_or(SdkError::UnknownContext(*ctx))
    }

    /// Durably write the staged data as a commit and return its hash.
    ///
    /// The context leaves the staged map for the duration of the write; on
    /// failure it is put back so the commit can be retried.
    pub fn commit(&self, ctx: &Hash) -> SdkResult<Hash> {
        let staged = self
            .lock()
            .staged
            .remove(ctx)
            .ok_or(SdkError::UnknownContext(*ctx))?;

        match self.write_commit(ctx, &staged) {
            Ok(hash) => {
                info!(context = %ctx, commit = %hash, "committed transaction");
                Ok(hash)
            }
            Err(err) => {
                warn!(context = %ctx, error = %err, "commit failed; staged writes kept");
                self.lock().staged.insert(*ctx, staged);
                Err(err)
            }
        }
    }

    fn write_commit(&self, ctx: &Hash, staged: &StagedContext) -> SdkResult<Hash> {
        let commit = Commit::from_staged(&staged.writes, clock::now_nanos())?;
        let record = |written: &Commit| -> StoreResult<()> {
            self.lock().committed.insert(
                *ctx,
                CommittedContext {
                    commit: *written.hash(),
                    began_at: staged.began_at,
                },
            );
            Ok(())
        };
        self.commit_service.insert(&commit, &record)?;
        Ok(*commit.hash())
    }

    /// Fold the durable commit of `ctx` into a new head state.
    ///
    /// The committed-map entry is claimed at the state service's commit
    /// point, so two pushes of one context cannot both succeed. If the push
    /// fails the entry stays (or is put back) and the push can be retried.
    pub fn push(&self, ctx: &Hash) -> SdkResult<State> {
        let commit_hash = self
            .lock()
            .committed
            .get(ctx)
            .map(|committed| committed.commit)
            .ok_or(SdkError::NotCommitted(*ctx))?;
        let commit = self.commits.retrieve(&commit_hash)?;

        let claimed: Cell<Option<CommittedContext>> = Cell::new(None);
        let claim = |_: &Commit| -> StoreResult<()> {
            let entry = self.lock().committed.remove(ctx).ok_or_else(|| {
                StoreError::Aborted(format!("transaction context {ctx} was pushed concurrently"))
            })?;
            claimed.set(Some(entry));
            Ok(())
        };

        let state = match self.state_service.insert(&commit, &claim) {
            Ok(state) => state,
            Err(err) => {
                let Some(entry) = claimed.take() else {
                    return Err(match err {
                        StoreError::Aborted(_) => SdkError::NotCommitted(*ctx),
                        other => other.into(),
                    });
                };
                self.lock().committed.insert(*ctx, entry);
                warn!(context = %ctx, commit = %commit_hash, error = %err, "push failed; commit kept for retry");
                return Err(err.into());
            }
        };

        if let Err(err) = self.commit_service.delete(&commit, &no_hook) {
            warn!(commit = %commit_hash, error = %err, "failed to delete pushed commit from the log");
        }
        info!(
            context = %ctx,
            commit = %commit_hash,
            head = %state.hash(),
            height = state.height(),
            "pushed commit"
        );
        Ok(state)
    }

    /// Delete a durable commit that was never pushed.
    ///
    /// Fails only if the commit cannot be read from the log. A failed delete
    /// is logged. Any context pointing at the commit is forgotten either way.
    pub fn rollback(&self, commit_hash: &Hash) -> SdkResult<()> {
        self.lock()
            .committed
            .retain(|_, committed| committed.commit != *commit_hash);

        let commit = self.commits.retrieve(commit_hash)?;
        match self.commit_service.delete(&commit, &no_hook) {
            Ok(()) => info!(commit = %commit_hash, "rolled back commit"),
            Err(err) => warn!(commit = %commit_hash, error = %err, "failed to roll back commit"),
        }
        Ok(())
    }

    /// Drop staged and committed contexts begun more than `max_age` ago.
    /// Their commit-log files are left in place. Returns the number dropped.
    pub fn expire(&self, max_age: Duration) -> usize {
        let mut contexts = self.lock();
        let before = contexts.staged.len() + contexts.committed.len();
        contexts
            .staged
            .retain(|_, staged| staged.began_at.elapsed() <= max_age);
        contexts
            .committed
            .retain(|_, committed| committed.began_at.elapsed() <= max_age);
        let dropped = before - contexts.staged.len() - contexts.committed.len();
        if dropped > 0 {
            info!(dropped, "expired transaction contexts");
        }
        dropped
    }

    /// Hash of the durable commit recorded for `ctx`, if it awaits a push.
    pub fn committed(&self, ctx: &Hash) -> Option<Hash> {
        self.lock().committed.get(ctx).map(|committed| committed.commit)
    }

    fn lock(&self) -> MutexGuard<'_, Contexts> {
        self.contexts.lock().expect("transaction contexts lock poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::thread;

    use strata_disk::{
        DiskCommitRepository, DiskCommitService, DiskConfig, DiskLayout, DiskResourceRepository,
        DiskStateRepository, DiskStateService,
    };
    use strata_model::{CommitHook, ResourceRepository, StateRepository};

    struct Fixture {
        _dir: tempfile::TempDir,
        layout: DiskLayout,
        commits: Arc<DiskCommitRepository>,
        tx: Transactions,
    }

    fn fixture_with(state_service: impl Fn(DiskLayout) -> Arc<dyn StateService>) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let layout = DiskLayout::new(dir.path(), &Hash::from_bytes(b"app"), &DiskConfig::default());
        let commits = Arc::new(DiskCommitRepository::new(layout.clone()));
        let tx = Transactions::new(
            commits.clone(),
            Arc::new(DiskCommitService::new(layout.clone())),
            state_service(layout.clone()),
        );
        Fixture {
            _dir: dir,
            layout,
            commits,
            tx,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(|layout| Arc::new(DiskStateService::new(layout)))
    }

    /// Fails every insert while `healthy` is unset, optionally after running
    /// the commit-point hook.
    struct FlakyStateService {
        inner: DiskStateService,
        healthy: AtomicBool,
        fail_after_hook: bool,
    }

    impl StateService for FlakyStateService {
        fn insert(&self, commit: &Commit, on_commit_point: CommitHook<'_>) -> StoreResult<State> {
            if self.healthy.load(Ordering::SeqCst) {
                return self.inner.insert(commit, on_commit_point);
            }
            if self.fail_after_hook {
                on_commit_point(commit)?;
            }
            Err(StoreError::Io(std::io::Error::other("disk full")))
        }
    }

    fn key(name: &str) -> Hash {
        Hash::from_bytes(name.as_bytes())
    }

    #[test]
    fn lifecycle() {
        let fx = fixture();
        let ctx = fx.tx.begin();
        fx.tx.insert(&ctx, "ns", key("k"), b"data".to_vec()).unwrap();

        let queued = fx.tx.queue(&ctx).unwrap();
        assert_eq!(queued["ns"][&key("k")], b"data");

        let commit_hash = fx.tx.commit(&ctx).unwrap();
        assert!(matches!(fx.tx.queue(&ctx), Err(SdkError::UnknownContext(c)) if c == ctx));
        assert_eq!(fx.tx.committed(&ctx), Some(commit_hash));
        assert_eq!(fx.commits.list().unwrap(), vec![commit_hash]);

        let state = fx.tx.push(&ctx).unwrap();
        assert_eq!(state.height(), 1);
        assert!(fx.commits.list().unwrap().is_empty());
        assert!(matches!(fx.tx.push(&ctx), Err(SdkError::NotCommitted(c)) if c == ctx));

        let pointer = state.pointer("ns", &key("k")).unwrap();
        let resources = DiskResourceRepository::new(fx.layout.clone());
        assert_eq!(resources.retrieve(pointer).unwrap().value(), b"data");
    }

    #[test]
    fn contexts_are_unique() {
        let fx = fixture();
        let a = fx.tx.begin();
        let b = fx.tx.begin();
        assert_ne!(a, b);
    }

    #[test]
    fn unknown_context_is_rejected() {
        let fx = fixture();
        let ctx = key("never begun");
        assert!(matches!(
            fx.tx.insert(&ctx, "ns", key("k"), vec![]),
            Err(SdkError::UnknownContext(_))
        ));
        assert!(matches!(fx.tx.commit(&ctx), Err(SdkError::UnknownContext(_))));
        assert!(matches!(fx.tx.push(&ctx), Err(SdkError::NotCommitted(_))));
    }

    #[test]
    fn insert_after_commit_is_rejected() {
        let fx = fixture();
        let ctx = fx.tx.begin();
        fx.tx.insert(&ctx, "ns", key("k"), vec![1]).unwrap();
        fx.tx.commit(&ctx).unwrap();
        assert!(matches!(
            fx.tx.insert(&ctx, "ns", key("k"), vec![2]),
            Err(SdkError::UnknownContext(_))
        ));
        assert!(matches!(fx.tx.commit(&ctx), Err(SdkError::UnknownContext(_))));
    }

    #[test]
    fn empty_namespace_is_rejected() {
        let fx = fixture();
        let ctx = fx.tx.begin();
        assert!(matches!(
            fx.tx.insert(&ctx, "", key("k"), vec![]),
            Err(SdkError::Model(ModelError::EmptyNamespace { .. }))
        ));
    }

    #[test]
    fn last_write_wins() {
        let fx = fixture();
        let ctx = fx.tx.begin();
        fx.tx.insert(&ctx, "ns", key("k"), b"first".to_vec()).unwrap();
        fx.tx.insert(&ctx, "ns", key("k"), b"second".to_vec()).unwrap();
        fx.tx.insert(&ctx, "other", key("k"), b"elsewhere".to_vec()).unwrap();

        let queued = fx.tx.queue(&ctx).unwrap();
        assert_eq!(queued["ns"].len(), 1);
        assert_eq!(queued["ns"][&key("k")], b"second");

        fx.tx.commit(&ctx).unwrap();
        let state = fx.tx.push(&ctx).unwrap();
        assert_eq!(state.pointers().len(), 2);
    }

    #[test]
    fn rollback_removes_the_commit() {
        let fx = fixture();
        let ctx = fx.tx.begin();
        fx.tx.insert(&ctx, "ns", key("k"), vec![1]).unwrap();
        let commit_hash = fx.tx.commit(&ctx).unwrap();

        fx.tx.rollback(&commit_hash).unwrap();
        assert!(matches!(
            fx.commits.retrieve(&commit_hash),
            Err(StoreError::CommitNotFound(h)) if h == commit_hash
        ));
        assert!(fx.tx.committed(&ctx).is_none());
        assert!(matches!(fx.tx.push(&ctx), Err(SdkError::NotCommitted(_))));
    }

    #[test]
    fn rollback_of_unknown_commit_surfaces_not_found() {
        let fx = fixture();
        let err = fx.tx.rollback(&key("missing")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn failed_push_can_be_retried() {
        let fx = fixture_with(|layout| {
            Arc::new(FlakyStateService {
                inner: DiskStateService::new(layout),
                healthy: AtomicBool::new(false),
                fail_after_hook: false,
            })
        });
        let ctx = fx.tx.begin();
        fx.tx.insert(&ctx, "ns", key("k"), vec![1]).unwrap();
        let commit_hash = fx.tx.commit(&ctx).unwrap();

        assert!(matches!(fx.tx.push(&ctx), Err(SdkError::Store(StoreError::Io(_)))));
        assert_eq!(fx.tx.committed(&ctx), Some(commit_hash));
        assert_eq!(fx.commits.list().unwrap(), vec![commit_hash]);
    }

    #[test]
    fn push_failing_after_claim_restores_the_entry() {
        let fx = fixture_with(|layout| {
            Arc::new(FlakyStateService {
                inner: DiskStateService::new(layout),
                healthy: AtomicBool::new(false),
                fail_after_hook: true,
            })
        });
        let ctx = fx.tx.begin();
        fx.tx.insert(&ctx, "ns", key("k"), vec![1]).unwrap();
        let commit_hash = fx.tx.commit(&ctx).unwrap();

        assert!(matches!(fx.tx.push(&ctx), Err(SdkError::Store(StoreError::Io(_)))));
        assert_eq!(fx.tx.committed(&ctx), Some(commit_hash));
        assert!(DiskStateRepository::new(fx.layout.clone()).head().unwrap().is_none());
    }

    #[test]
    fn concurrent_pushes_of_one_context_succeed_once() {
        let fx = fixture();
        let ctx = fx.tx.begin();
        fx.tx.insert(&ctx, "ns", key("k"), vec![1]).unwrap();
        fx.tx.commit(&ctx).unwrap();

        let tx = &fx.tx;
        let results: Vec<SdkResult<State>> = thread::scope(|scope| {
            let handles: Vec<_> = (0..4).map(|_| scope.spawn(move || tx.push(&ctx))).collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let ok = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(ok, 1);
        for result in results.iter().filter(|r| r.is_err()) {
            assert!(matches!(
                result,
                Err(SdkError::NotCommitted(_)) | Err(SdkError::Store(StoreError::StaleHead { .. }))
                    | Err(SdkError::Store(StoreError::CommitNotFound(_)))
            ));
        }
        let head = DiskStateRepository::new(fx.layout.clone()).head().unwrap().unwrap();
        assert_eq!(head.height(), 1);
    }

    #[test]
    fn expire_drops_old_contexts() {
        let fx = fixture();
        let staged = fx.tx.begin();
        let committed = fx.tx.begin();
        fx.tx.insert(&committed, "ns", key("k"), vec![1]).unwrap();
        let commit_hash = fx.tx.commit(&committed).unwrap();

        assert_eq!(fx.tx.expire(Duration::from_secs(3600)), 0);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(fx.tx.expire(Duration::from_millis(10)), 2);

        assert!(matches!(fx.tx.queue(&staged), Err(SdkError::UnknownContext(_))));
        assert!(matches!(fx.tx.push(&committed), Err(SdkError::NotCommitted(_))));
        // The durable commit stays in the log.
        assert_eq!(fx.commits.list().unwrap(), vec![commit_hash]);
    }

    #[test]
    fn begin_applies_the_context_ttl() {
        let dir = tempfile::tempdir().unwrap();
        let layout = DiskLayout::new(dir.path(), &Hash::from_bytes(b"app"), &DiskConfig::default());
        let tx = Transactions::new(
            Arc::new(DiskCommitRepository::new(layout.clone())),
            Arc::new(DiskCommitService::new(layout.clone())),
            Arc::new(DiskStateService::new(layout)),
        )
        .with_context_ttl(Some(Duration::from_millis(10)));

        let old = tx.begin();
        thread::sleep(Duration::from_millis(20));
        let fresh = tx.begin();
        assert!(tx.queue(&old).is_err());
        assert!(tx.queue(&fresh).is_ok());
    }
}
