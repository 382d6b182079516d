use strata_types::Hash;

/// Domain-separated BLAKE3 content hasher.
///
/// Each hasher carries a domain tag (e.g. `"strata-pointer-v1"`) that is fed
/// to the digest before any content, so a pointer and a value built from the
/// same bytes never share a hash.
///
/// Multi-part hashes are computed over `part0 ‖ part1 ‖ …` where every part is
/// prefixed with its little-endian `u64` length: `("ab", "c")` and `("a", "bc")`
/// hash differently.
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    /// Hasher for pointers: `H(resource ‖ namespace ‖ index ‖ length)`.
    pub const POINTER: Self = Self::new("strata-pointer-v1");
    /// Hasher for pointer sets: `H(pointer0 ‖ pointer1 ‖ …)`.
    pub const POINTERS: Self = Self::new("strata-pointers-v1");
    /// Hasher for staged values: `H(namespace ‖ resource ‖ data)`.
    pub const VALUE: Self = Self::new("strata-value-v1");
    /// Hasher for value lists: `H(value0 ‖ value1 ‖ …)`.
    pub const VALUES: Self = Self::new("strata-values-v1");
    /// Hasher for commits: `H(values ‖ createdOn)`.
    pub const COMMIT: Self = Self::new("strata-commit-v1");
    /// Hasher for states: `H(pointers ‖ createdOn [‖ previous])`.
    pub const STATE: Self = Self::new("strata-state-v1");
    /// Hasher for transaction context identifiers.
    pub const CONTEXT: Self = Self::new("strata-context-v1");
    /// Hasher for application identifiers (database directory names).
    pub const APPLICATION: Self = Self::new("strata-application-v1");

    /// Create a hasher with a custom domain tag.
    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }

    /// Hash a single byte string with domain separation.
    pub fn hash(&self, data: &[u8]) -> Hash {
        self.hash_parts(&[data])
    }

    /// Hash an ordered list of parts with domain separation.
    pub fn hash_parts(&self, parts: &[&[u8]]) -> Hash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        for part in parts {
            hasher.update(&(part.len() as u64).to_le_bytes());
            hasher.update(part);
        }
        Hash::from_hash(*hasher.finalize().as_bytes())
    }

    /// Verify that the parts produce the expected hash.
    pub fn verify(&self, parts: &[&[u8]], expected: &Hash) -> bool {
        self.hash_parts(parts) == *expected
    }

    /// The domain tag used by this hasher.
    pub fn domain(&self) -> &str {
        self.domain
    }
}
