use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Content hash identifying a value, resource, commit, state or transaction
/// context.
///
/// A `Hash` is a 32-byte BLAKE3 digest. Its canonical string form is the
/// lowercase hex encoding; that form is also used as the commit-log filename.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Hash([u8; 32]);

impl Hash {
    /// Number of bytes in a hash.
    pub const SIZE: usize = 32;

    /// Compute a `Hash` from raw bytes.
    pub fn from_bytes(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Create a `Hash` from a pre-computed digest.
    pub const fn from_hash(hash: [u8; 32]) -> Self {
        Self(hash)
    }

    /// Interpret a slice as a digest. The slice must be exactly
    /// [`Hash::SIZE`] bytes long.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, TypeError> {
        let arr: [u8; 32] = bytes.try_into().map_err(|_| TypeError::InvalidLength {
            expected: Self::SIZE,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }

    /// The null hash (all zeros).
    pub const fn null() -> Self {
        Self([0u8; 32])
    }

    /// Returns `true` if this is the null hash.
    pub fn is_null(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// The raw 32-byte digest.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Canonical hex-encoded string representation.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short hex representation (first 8 characters).
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// Parse from the canonical hex string.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        Self::from_slice(&bytes)
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self.short_hex())
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl std::str::FromStr for Hash {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<[u8; 32]> for Hash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl From<Hash> for [u8; 32] {
    fn from(hash: Hash) -> Self {
        hash.0
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn from_bytes_is_deterministic() {
        let data = b"hello world";
        assert_eq!(Hash::from_bytes(data), Hash::from_bytes(data));
    }

    #[test]
    fn different_data_produces_different_hashes() {
        assert_ne!(Hash::from_bytes(b"hello"), Hash::from_bytes(b"world"));
    }

    #[test]
    fn null_is_all_zeros() {
        let null = Hash::null();
        assert!(null.is_null());
        assert_eq!(null.as_bytes(), &[0u8; 32]);
    }

    #[test]
    fn from_slice_rejects_wrong_length() {
        let err = Hash::from_slice(&[1, 2, 3]).unwrap_err();
        assert_eq!(err, TypeError::InvalidLength { expected: 32, actual: 3 });
    }

    #[test]
    fn from_hex_rejects_garbage() {
        assert!(matches!(Hash::from_hex("not-hex"), Err(TypeError::InvalidHex(_))));
        assert!(matches!(
            Hash::from_hex("abcd"),
            Err(TypeError::InvalidLength { expected: 32, actual: 2 })
        ));
    }

    #[test]
    fn display_is_full_hex() {
        let hash = Hash::from_bytes(b"test");
        let display = format!("{hash}");
        assert_eq!(display.len(), 64);
        assert_eq!(display, hash.to_hex());
        assert_eq!(hash.short_hex().len(), 8);
    }

    #[test]
    fn parses_via_from_str() {
        let hash = Hash::from_bytes(b"parse me");
        let parsed: Hash = hash.to_hex().parse().unwrap();
        assert_eq!(parsed, hash);
    }

    #[test]
    fn serde_roundtrip() {
        let hash = Hash::from_bytes(b"serde test");
        let json = serde_json::to_string(&hash).unwrap();
        let parsed: Hash = serde_json::from_str(&json).unwrap();
        assert_eq!(hash, parsed);
    }

    proptest! {
        #[test]
        fn hex_order_matches_byte_order(a in any::<[u8; 32]>(), b in any::<[u8; 32]>()) {
            let (ha, hb) = (Hash::from_hash(a), Hash::from_hash(b));
            prop_assert_eq!(ha.cmp(&hb), ha.to_hex().cmp(&hb.to_hex()));
        }

        #[test]
        fn hex_roundtrip(bytes in any::<[u8; 32]>()) {
            let hash = Hash::from_hash(bytes);
            prop_assert_eq!(Hash::from_hex(&hash.to_hex()).unwrap(), hash);
        }
    }
}
