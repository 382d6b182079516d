use std::sync::Arc;

use strata_model::{
    Commit, CommitRepository, ModelError, Pointer, Resource, ResourceRepository, State,
    StateRepository,
};
use strata_types::Hash;

use crate::error::{SdkError, SdkResult};

/// Read side of a database. Every call reads the files afresh, so results
/// reflect the latest completed push.
pub struct Queries {
    states: Arc<dyn StateRepository>,
    resources: Arc<dyn ResourceRepository>,
    commits: Arc<dyn CommitRepository>,
}

impl Queries {
    pub fn new(
        states: Arc<dyn StateRepository>,
        resources: Arc<dyn ResourceRepository>,
        commits: Arc<dyn CommitRepository>,
    ) -> Self {
        Self {
            states,
            resources,
            commits,
        }
    }

    /// Current head state, or `None` before the first push.
    pub fn head(&self) -> SdkResult<Option<State>> {
        Ok(self.states.head()?)
    }

    /// The head state or one of its ancestors.
    pub fn state(&self, hash: &Hash) -> SdkResult<State> {
        let head = self
            .head()?
            .ok_or(SdkError::Model(ModelError::StateNotFound(*hash)))?;
        Ok(head.fetch(hash)?)
    }

    /// Commits waiting in the log, sorted by hash.
    pub fn commits(&self) -> SdkResult<Vec<Hash>> {
        Ok(self.commits.list()?)
    }

    pub fn commit(&self, hash: &Hash) -> SdkResult<Commit> {
        Ok(self.commits.retrieve(hash)?)
    }

    pub fn resource(&self, pointer: &Pointer) -> SdkResult<Resource> {
        Ok(self.resources.retrieve(pointer)?)
    }

    /// Resolve `namespace`/`resource` against the head state and read it.
    pub fn get(&self, namespace: &str, resource: &Hash) -> SdkResult<Resource> {
        let head = self.head()?.ok_or(SdkError::NoHead)?;
        let pointer = head.pointer(namespace, resource)?;
        self.resource(pointer)
    }
}
