//! On-disk persistence for Strata.
//!
//! Each application owns a directory holding a single database file and a
//! commit-log directory:
//!
//! ```text
//! <base_dir>/<application hash>/database.db
//! <base_dir>/<application hash>/commits/<commit hash>
//! ```
//!
//! The database file starts with the head state (length-prefixed) and is
//! followed by the resource blob, every `key ‖ value` entry ever pushed,
//! oldest first. It is never modified in place: [`DiskStateService`] builds
//! a complete replacement in a temporary file and renames it over the
//! original, so readers see either the old or the new file and a crash
//! leaves the old one intact.

pub mod commit_log;
pub mod config;
pub mod layout;
pub mod resource_repository;
pub mod state_repository;
pub mod state_service;

pub use commit_log::{DiskCommitRepository, DiskCommitService};
pub use config::{DiskConfig, SyncMode};
pub use layout::DiskLayout;
pub use resource_repository::DiskResourceRepository;
pub use state_repository::DiskStateRepository;
pub use state_service::DiskStateService;
