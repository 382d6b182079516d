use serde::{Deserialize, Serialize};

/// Flush strategy for files written by the disk layer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// `fsync` every temporary file before it is renamed into place.
    EveryWrite,
    /// Rely on OS page-cache buffering.
    #[default]
    OsDefault,
}

impl SyncMode {
    pub fn syncs(self) -> bool {
        matches!(self, Self::EveryWrite)
    }
}

/// Names used inside an application directory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiskConfig {
    /// Commit-log directory name.
    pub commit_dir: String,
    /// Database file name.
    pub db_file_name: String,
    /// Extension of temporary files, without the dot.
    pub tmp_extension: String,
    pub sync_mode: SyncMode,
}

impl Default for DiskConfig {
    fn default() -> Self {
        Self {
            commit_dir: "commits".to_string(),
            db_file_name: "database.db".to_string(),
            tmp_extension: "tmp".to_string(),
            sync_mode: SyncMode::default(),
        }
    }
}
