//! Data model for Strata, an embedded content-addressed versioned key/value
//! store.
//!
//! Callers stage writes into a [`Commit`]; a push folds the commit into a new
//! [`State`] whose [`PointerSet`] locates every value inside the resource
//! blob of the database file. States form an append-only chain: each one
//! links to the hash of the state it supersedes.
//!
//! # Entities
//!
//! - [`Pointer`] / [`PointerSet`] -- byte ranges inside the resource blob
//! - [`Resource`] -- a value read back through a pointer
//! - [`Value`] / [`Values`] / [`Commit`] -- immutable batches of writes
//! - [`StateRecord`] / [`State`] -- snapshots and handles on the chain
//!
//! Every entity computes its content hash once, at construction, and
//! implements the tagged codec from `strata-codec`. Decoding rebuilds the
//! entity and rejects bytes whose stored hash does not match.
//!
//! # Persistence contracts
//!
//! [`StateRepository`], [`ResourceRepository`], [`StateService`],
//! [`CommitRepository`] and [`CommitService`] describe the storage layer.
//! Services take a [`CommitHook`] run at the commit point; a failing hook
//! triggers the service's compensating action.

pub mod clock;
pub mod commit;
pub mod error;
pub mod pointer;
pub mod resource;
pub mod schema;
pub mod state;
pub mod traits;

pub use commit::{Commit, Staged, Value, Values};
pub use error::{ModelError, ModelResult, StoreError, StoreResult};
pub use pointer::{Pointer, PointerSet};
pub use resource::Resource;
pub use state::{State, StateRecord};
pub use traits::{
    no_hook, CommitHook, CommitRepository, CommitService, ResourceRepository, StateRepository,
    StateService, StoredHead,
};
