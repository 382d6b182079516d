use std::sync::Arc;

use strata_disk::{
    DiskCommitRepository, DiskCommitService, DiskLayout, DiskResourceRepository,
    DiskStateRepository, DiskStateService,
};
use strata_types::Hash;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::error::SdkResult;
use crate::query::Queries;
use crate::transaction::Transactions;

/// One application's database: the transaction coordinator and the query
/// surface over the same directory.
///
/// Open a single `Database` per application directory and share it; the
/// state service serializes head replacement only within one instance.
pub struct Database {
    layout: DiskLayout,
    transactions: Transactions,
    queries: Queries,
}

impl Database {
    /// Open the database of `application` under `config.base_dir`. Files are
    /// created by the first commit or push.
    pub fn open(config: &DatabaseConfig, application: &Hash) -> SdkResult<Self> {
        config.validate()?;
        let layout = config.layout(application);

        let commits = Arc::new(DiskCommitRepository::new(layout.clone()));
        let transactions = Transactions::new(
            commits.clone(),
            Arc::new(DiskCommitService::new(layout.clone())),
            Arc::new(DiskStateService::new(layout.clone())),
        )
        .with_context_ttl(config.context_max_age());
        let queries = Queries::new(
            Arc::new(DiskStateRepository::new(layout.clone())),
            Arc::new(DiskResourceRepository::new(layout.clone())),
            commits,
        );

        info!(
            application = %application,
            root = %layout.root().display(),
            sync_mode = ?layout.sync_mode(),
            "opened database"
        );
        Ok(Self {
            layout,
            transactions,
            queries,
        })
    }

    pub fn transactions(&self) -> &Transactions {
        &self.transactions
    }

    pub fn queries(&self) -> &Queries {
        &self.queries
    }

    pub fn layout(&self) -> &DiskLayout {
        &self.layout
    }
}
