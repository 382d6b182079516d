//! Foundation types for Strata.
//!
//! Strata is an embedded, content-addressed, versioned key/value store. Every
//! value, resource, commit and state it manages is identified by a [`Hash`]:
//! a fixed-size BLAKE3 digest with a canonical hex string form.

pub mod error;
pub mod hash;

pub use error::TypeError;
pub use hash::Hash;
