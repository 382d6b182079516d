use std::collections::HashMap;
use std::sync::OnceLock;

use strata_codec::{CodecResult, Decode, Decoder, Encode, Encoder};
use strata_crypto::ContentHasher;
use strata_types::Hash;

use crate::error::{ModelError, ModelResult};
use crate::schema;

/// Byte range inside the resource blob of a database file, scoped by
/// namespace and addressed by resource key.
///
/// `index` is relative to the start of the resource blob, never to the start
/// of the file. `length` covers the stored content key plus the value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pointer {
    hash: Hash,
    namespace: String,
    resource: Hash,
    index: u64,
    length: u64,
}

impl Pointer {
    /// Build a pointer. Fails if `namespace` is empty, `length` is zero or
    /// the range end does not fit in a `u64`.
    pub fn new(namespace: impl Into<String>, resource: Hash, index: u64, length: u64) -> ModelResult<Self> {
        let namespace = namespace.into();
        if namespace.is_empty() {
            return Err(ModelError::EmptyNamespace { entity: "pointer" });
        }
        if length == 0 {
            return Err(ModelError::ZeroLength);
        }
        if index.checked_add(length).is_none() {
            return Err(ModelError::RangeOverflow { index, length });
        }
        let hash = ContentHasher::POINTER.hash_parts(&[
            resource.as_bytes(),
            namespace.as_bytes(),
            index.to_string().as_bytes(),
            length.to_string().as_bytes(),
        ]);
        Ok(Self {
            hash,
            namespace,
            resource,
            index,
            length,
        })
    }

    pub fn hash(&self) -> &Hash {
        &self.hash
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn resource(&self) -> &Hash {
        &self.resource
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn length(&self) -> u64 {
        self.length
    }

    /// Offset one past the last byte of the range. Never overflows: `new`
    /// rejects ranges whose end does not fit.
    pub fn end(&self) -> u64 {
        self.index.saturating_add(self.length)
    }
}

impl Encode for Pointer {
    fn encode(&self, enc: &mut Encoder) {
        enc.structure(schema::POINTER, |fields| {
            fields
                .field(&self.hash)
                .field(&self.namespace)
                .field(&self.resource)
                .field(&self.index)
                .field(&self.length);
        });
    }
}

impl Decode for Pointer {
    fn decode(dec: &mut Decoder<'_>) -> CodecResult<Self> {
        let mut fields = dec.structure(schema::POINTER, 5)?;
        let stored: Hash = fields.field()?;
        let namespace: String = fields.field()?;
        let resource: Hash = fields.field()?;
        let index: u64 = fields.field()?;
        let length: u64 = fields.field()?;
        let pointer =
            Pointer::new(namespace, resource, index, length).map_err(schema::rejected("pointer"))?;
        schema::check_hash("pointer", &stored, &pointer.hash)?;
        Ok(pointer)
    }
}

type PointerIndex = HashMap<String, HashMap<Hash, usize>>;

/// Ordered, immutable collection of pointers with a lazily built
/// `namespace → resource → pointer` index.
///
/// When the list holds the same namespace/resource pair twice, the later
/// entry wins lookups.
#[derive(Clone, Debug)]
pub struct PointerSet {
    hash: Hash,
    list: Vec<Pointer>,
    index: OnceLock<PointerIndex>,
}

impl PointerSet {
    pub fn new(list: Vec<Pointer>) -> Self {
        let hashes: Vec<&[u8]> = list.iter().map(|p| p.hash.as_bytes().as_slice()).collect();
        let hash = ContentHasher::POINTERS.hash_parts(&hashes);
        Self {
            hash,
            list,
            index: OnceLock::new(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn hash(&self) -> &Hash {
        &self.hash
    }

    pub fn list(&self) -> &[Pointer] {
        &self.list
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Pointer> {
        self.list.iter()
    }

    pub fn exists(&self, namespace: &str, resource: &Hash) -> bool {
        self.get(namespace, resource).is_some()
    }

    pub fn fetch(&self, namespace: &str, resource: &Hash) -> ModelResult<&Pointer> {
        self.get(namespace, resource)
            .ok_or_else(|| ModelError::PointerNotFound {
                namespace: namespace.to_string(),
                resource: *resource,
            })
    }

    pub fn get(&self, namespace: &str, resource: &Hash) -> Option<&Pointer> {
        let position = *self.index().get(namespace)?.get(resource)?;
        self.list.get(position)
    }

    fn index(&self) -> &PointerIndex {
        self.index.get_or_init(|| {
            let mut index = PointerIndex::new();
            for (position, pointer) in self.list.iter().enumerate() {
                index
                    .entry(pointer.namespace.clone())
                    .or_default()
                    .insert(pointer.resource, position);
            }
            index
        })
    }
}

impl PartialEq for PointerSet {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.list == other.list
    }
}

impl Eq for PointerSet {}

impl<'a> IntoIterator for &'a PointerSet {
    type Item = &'a Pointer;
    type IntoIter = std::slice::Iter<'a, Pointer>;

    fn into_iter(self) -> Self::IntoIter {
        self.list.iter()
    }
}

impl Encode for PointerSet {
    fn encode(&self, enc: &mut Encoder) {
        enc.structure(schema::POINTERS, |fields| {
            fields.field(&self.hash).field(&PointerList(&self.list));
        });
    }
}

impl Decode for PointerSet {
    fn decode(dec: &mut Decoder<'_>) -> CodecResult<Self> {
        let mut fields = dec.structure(schema::POINTERS, 2)?;
        let stored: Hash = fields.field()?;
        let PointerVec(list) = fields.field()?;
        let set = PointerSet::new(list);
        schema::check_hash("pointer set", &stored, &set.hash)?;
        Ok(set)
    }
}

struct PointerList<'a>(&'a [Pointer]);

impl Encode for PointerList<'_> {
    fn encode(&self, enc: &mut Encoder) {
        enc.list(schema::POINTER, self.0.iter());
    }
}

struct PointerVec(Vec<Pointer>);

impl Decode for PointerVec {
    fn decode(dec: &mut Decoder<'_>) -> CodecResult<Self> {
        dec.list(schema::POINTER).map(PointerVec)
    }
}
