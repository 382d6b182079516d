use std::path::{Path, PathBuf};

use strata_types::Hash;

use crate::config::{DiskConfig, SyncMode};

/// Where one application's files live:
///
/// ```text
/// <base_dir>/<application hash>/<commit_dir>/<commit hash>
/// <base_dir>/<application hash>/<db_file_name>
/// ```
///
/// Temporary files are created next to their final path so the closing
/// rename never crosses a filesystem boundary.
#[derive(Clone, Debug)]
pub struct DiskLayout {
    root: PathBuf,
    commit_dir: PathBuf,
    db_file: PathBuf,
    db_file_name: String,
    tmp_extension: String,
    sync_mode: SyncMode,
}

impl DiskLayout {
    pub fn new(base_dir: impl AsRef<Path>, application: &Hash, config: &DiskConfig) -> Self {
        let root = base_dir.as_ref().join(application.to_hex());
        Self {
            commit_dir: root.join(&config.commit_dir),
            db_file: root.join(&config.db_file_name),
            root,
            db_file_name: config.db_file_name.clone(),
            tmp_extension: config.tmp_extension.trim_start_matches('.').to_string(),
            sync_mode: config.sync_mode,
        }
    }

    /// The application directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn commit_dir(&self) -> &Path {
        &self.commit_dir
    }

    pub fn commit_file(&self, hash: &Hash) -> PathBuf {
        self.commit_dir.join(hash.to_hex())
    }

    pub fn db_file(&self) -> &Path {
        &self.db_file
    }

    pub fn sync_mode(&self) -> SyncMode {
        self.sync_mode
    }

    /// Temporary file next to the database file, removed when dropped.
    pub(crate) fn db_temp_file(&self) -> std::io::Result<tempfile::NamedTempFile> {
        self.temp_file(&self.root, &self.db_file_name)
    }

    /// Temporary file inside the commit log, removed when dropped.
    pub(crate) fn commit_temp_file(&self, hash: &Hash) -> std::io::Result<tempfile::NamedTempFile> {
        self.temp_file(&self.commit_dir, &hash.to_hex())
    }

    fn temp_file(&self, dir: &Path, name: &str) -> std::io::Result<tempfile::NamedTempFile> {
        tempfile::Builder::new()
            .prefix(&format!("{name}."))
            .suffix(&format!(".{}", self.tmp_extension))
            .tempfile_in(dir)
    }
}
