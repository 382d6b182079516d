use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strata_disk::{DiskConfig, DiskLayout, SyncMode};
use strata_types::Hash;

use crate::error::{SdkError, SdkResult};

/// Database configuration.
///
/// ```toml
/// base_dir = "/var/lib/strata"
/// commit_dir = "commits"
/// db_file_name = "database.db"
/// tmp_extension = "tmp"
/// sync_mode = "every_write"
/// context_ttl = 3600
/// ```
///
/// Every key is optional.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Directory holding one subdirectory per application.
    pub base_dir: PathBuf,
    pub commit_dir: String,
    pub db_file_name: String,
    /// Extension of temporary files, without the dot.
    pub tmp_extension: String,
    pub sync_mode: SyncMode,
    /// Seconds after which an unpushed transaction context is dropped.
    pub context_ttl: Option<u64>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        let disk = DiskConfig::default();
        Self {
            base_dir: PathBuf::from("strata-data"),
            commit_dir: disk.commit_dir,
            db_file_name: disk.db_file_name,
            tmp_extension: disk.tmp_extension,
            sync_mode: disk.sync_mode,
            context_ttl: None,
        }
    }
}

impl DatabaseConfig {
    /// Default configuration rooted at `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            ..Self::default()
        }
    }

    pub fn from_toml_str(s: &str) -> SdkResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| SdkError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> SdkResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| SdkError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Reject names that would make the layout ambiguous.
    pub fn validate(&self) -> SdkResult<()> {
        for (key, name) in [
            ("commit_dir", &self.commit_dir),
            ("db_file_name", &self.db_file_name),
        ] {
            if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
                return Err(SdkError::Config(format!("{key} must be a plain file name, got {name:?}")));
            }
        }
        if self.commit_dir == self.db_file_name {
            return Err(SdkError::Config(
                "commit_dir and db_file_name must differ".to_string(),
            ));
        }
        if self.tmp_extension.trim_start_matches('.').is_empty() {
            return Err(SdkError::Config("tmp_extension must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn context_max_age(&self) -> Option<Duration> {
        self.context_ttl.map(Duration::from_secs)
    }

    pub fn disk(&self) -> DiskConfig {
        DiskConfig {
            commit_dir: self.commit_dir.clone(),
            db_file_name: self.db_file_name.clone(),
            tmp_extension: self.tmp_extension.clone(),
            sync_mode: self.sync_mode,
        }
    }

    pub fn layout(&self, application: &Hash) -> DiskLayout {
        DiskLayout::new(&self.base_dir, application, &self.disk())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_disk_defaults() {
        let config = DatabaseConfig::default();
        assert_eq!(config.disk(), DiskConfig::default());
        assert!(config.context_max_age().is_none());
        config.validate().unwrap();
    }

    #[test]
    fn parses_full_toml() {
        let config = DatabaseConfig::from_toml_str(
            r#"
            base_dir = "/var/lib/strata"
            commit_dir = "log"
            db_file_name = "app.db"
            tmp_extension = ".part"
            sync_mode = "every_write"
            context_ttl = 60
            "#,
        )
        .unwrap();
        assert_eq!(config.base_dir, PathBuf::from("/var/lib/strata"));
        assert_eq!(config.commit_dir, "log");
        assert_eq!(config.sync_mode, SyncMode::EveryWrite);
        assert_eq!(config.context_max_age(), Some(Duration::from_secs(60)));

        let layout = config.layout(&Hash::from_bytes(b"app"));
        assert!(layout.db_file().ends_with("app.db"));
    }

    #[test]
    fn missing_keys_use_defaults() {
        let config = DatabaseConfig::from_toml_str(r#"base_dir = "data""#).unwrap();
        assert_eq!(config, DatabaseConfig::new("data"));
    }

    #[test]
    fn rejects_unknown_keys_and_bad_names() {
        assert!(matches!(
            DatabaseConfig::from_toml_str("colour = 1"),
            Err(SdkError::Config(_))
        ));
        assert!(matches!(
            DatabaseConfig::from_toml_str(r#"db_file_name = "a/b""#),
            Err(SdkError::Config(_))
        ));
        assert!(matches!(
            DatabaseConfig::from_toml_str(r#"commit_dir = "x"
db_file_name = "x""#),
            Err(SdkError::Config(_))
        ));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("strata.toml");
        std::fs::write(&path, "context_ttl = 5\n").unwrap();
        assert_eq!(DatabaseConfig::load(&path).unwrap().context_ttl, Some(5));

        let missing = DatabaseConfig::load(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(missing, SdkError::Config(_)));
    }
}
