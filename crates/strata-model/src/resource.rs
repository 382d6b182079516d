use std::io::{self, Write};

use strata_types::Hash;

use crate::error::ModelResult;
use crate::pointer::Pointer;

/// A value materialized from the resource blob together with the pointer it
/// was read through. Never persisted on its own.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resource {
    pointer: Pointer,
    value: Vec<u8>,
}

impl Resource {
    /// Build a resource whose entry starts at `index` in the resource blob.
    /// The pointer length covers the content key and the value.
    pub fn new(namespace: impl Into<String>, key: Hash, value: Vec<u8>, index: u64) -> ModelResult<Self> {
        let length = (Hash::SIZE + value.len()) as u64;
        let pointer = Pointer::new(namespace, key, index, length)?;
        Ok(Self { pointer, value })
    }

    /// Pair a pointer with bytes already read through it.
    pub fn from_parts(pointer: Pointer, value: Vec<u8>) -> Self {
        Self { pointer, value }
    }

    pub fn pointer(&self) -> &Pointer {
        &self.pointer
    }

    pub fn key(&self) -> &Hash {
        self.pointer.resource()
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    pub fn into_value(self) -> Vec<u8> {
        self.value
    }

    /// Write the blob entry `key ‖ value`.
    pub fn write_entry<W: Write>(&self, out: &mut W) -> io::Result<()> {
        out.write_all(self.key().as_bytes())?;
        out.write_all(&self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_covers_key_and_value() {
        let key = Hash::from_bytes(b"k");
        let resource = Resource::new("ns", key, b"hello".to_vec(), 64).unwrap();
        assert_eq!(resource.pointer().index(), 64);
        assert_eq!(resource.pointer().length(), 37);
        assert_eq!(resource.key(), &key);
    }

    #[test]
    fn empty_value_still_has_positive_length() {
        let resource = Resource::new("ns", Hash::from_bytes(b"k"), Vec::new(), 0).unwrap();
        assert_eq!(resource.pointer().length(), Hash::SIZE as u64);
    }

    #[test]
    fn entry_is_key_then_value() {
        let key = Hash::from_bytes(b"k");
        let resource = Resource::new("ns", key, b"abc".to_vec(), 0).unwrap();
        let mut entry = Vec::new();
        resource.write_entry(&mut entry).unwrap();
        assert_eq!(&entry[..32], key.as_bytes());
        assert_eq!(&entry[32..], b"abc");
        assert_eq!(entry.len() as u64, resource.pointer().length());
    }
}
