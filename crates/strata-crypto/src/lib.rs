//! Hashing primitives for Strata.
//!
//! Every persisted entity is identified by a domain-separated BLAKE3 hash
//! computed over an ordered list of parts. All crypto operations wrap
//! established libraries, no custom cryptography.

pub mod hasher;

pub use hasher::ContentHasher;
