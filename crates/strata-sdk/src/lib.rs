//! High-level SDK for Strata.
//!
//! [`Database`] is the entry point for applications embedding Strata. It
//! bundles the two surfaces over one application's directory:
//!
//! - [`Transactions`] -- `begin`, `insert`, `queue`, `commit`, `push`,
//!   `rollback`
//! - [`Queries`] -- `head`, `state`, `commits`, `commit`, `resource`
//!
//! ```no_run
//! use strata_sdk::{Database, DatabaseConfig, Hash};
//!
//! # fn main() -> Result<(), strata_sdk::SdkError> {
//! let db = Database::open(&DatabaseConfig::new("data"), &Hash::from_bytes(b"my-app"))?;
//! let tx = db.transactions();
//! let ctx = tx.begin();
//! tx.insert(&ctx, "users", Hash::from_bytes(b"alice"), b"{\"age\":30}".to_vec())?;
//! tx.commit(&ctx)?;
//! let head = tx.push(&ctx)?;
//! println!("head {} at height {}", head.hash(), head.height());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod database;
pub mod error;
pub mod query;
pub mod transaction;

pub use config::DatabaseConfig;
pub use database::Database;
pub use error::{SdkError, SdkResult};
pub use query::Queries;
pub use transaction::Transactions;

// Re-export key types
pub use strata_crypto::ContentHasher;
pub use strata_disk::SyncMode;
pub use strata_model::{Commit, Pointer, PointerSet, Resource, Staged, State, Value};
pub use strata_types::Hash;
