use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use strata_codec::{CodecResult, Decode, Decoder, Encode, Encoder};
use strata_crypto::ContentHasher;
use strata_types::Hash;

use crate::clock;
use crate::error::{ModelError, ModelResult};
use crate::schema;

/// Pending writes: `namespace → resource key → data`.
///
/// Both levels are ordered, so a commit built from the same writes always
/// lists its values in the same order and gets the same hash.
pub type Staged = BTreeMap<String, BTreeMap<Hash, Vec<u8>>>;

/// One staged write inside a commit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Value {
    hash: Hash,
    namespace: String,
    resource: Hash,
    data: Vec<u8>,
}

impl Value {
    pub fn new(namespace: impl Into<String>, resource: Hash, data: Vec<u8>) -> ModelResult<Self> {
        let namespace = namespace.into();
        if namespace.is_empty() {
            return Err(ModelError::EmptyNamespace { entity: "value" });
        }
        let hash = ContentHasher::VALUE.hash_parts(&[namespace.as_bytes(), resource.as_bytes(), &data]);
        Ok(Self {
            hash,
            namespace,
            resource,
            data,
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

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl Encode for Value {
    fn encode(&self, enc: &mut Encoder) {
        enc.structure(schema::VALUE, |fields| {
            fields
                .field(&self.hash)
                .field(&self.namespace)
                .field(&self.resource)
                .field(&self.data);
        });
    }
}

impl Decode for Value {
    fn decode(dec: &mut Decoder<'_>) -> CodecResult<Self> {
        let mut fields = dec.structure(schema::VALUE, 4)?;
        let stored: Hash = fields.field()?;
        let namespace: String = fields.field()?;
        let resource: Hash = fields.field()?;
        let data: Vec<u8> = fields.field()?;
        let value = Value::new(namespace, resource, data).map_err(schema::rejected("value"))?;
        schema::check_hash("value", &stored, &value.hash)?;
        Ok(value)
    }
}

/// Ordered list of values with a lazily built resource index.
#[derive(Clone, Debug)]
pub struct Values {
    hash: Hash,
    list: Vec<Value>,
    by_resource: OnceLock<HashMap<Hash, usize>>,
}

impl Values {
    pub fn new(list: Vec<Value>) -> Self {
        let hashes: Vec<&[u8]> = list.iter().map(|v| v.hash.as_bytes().as_slice()).collect();
        let hash = ContentHasher::VALUES.hash_parts(&hashes);
        Self {
            hash,
            list,
            by_resource: OnceLock::new(),
        }
    }

    pub fn hash(&self) -> &Hash {
        &self.hash
    }

    pub fn list(&self) -> &[Value] {
        &self.list
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.list.iter()
    }

    /// Find the value stored under `resource`, whatever its namespace.
    pub fn fetch_by_resource(&self, resource: &Hash) -> ModelResult<&Value> {
        let index = self.by_resource.get_or_init(|| {
            self.list
                .iter()
                .enumerate()
                .map(|(position, value)| (value.resource, position))
                .collect()
        });
        index
            .get(resource)
            .and_then(|&position| self.list.get(position))
            .ok_or(ModelError::ValueNotFound(*resource))
    }
}

impl PartialEq for Values {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.list == other.list
    }
}

impl Eq for Values {}

impl<'a> IntoIterator for &'a Values {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.list.iter()
    }
}

impl Encode for Values {
    fn encode(&self, enc: &mut Encoder) {
        enc.structure(schema::VALUES, |fields| {
            fields.field(&self.hash).field(&ValueList(&self.list));
        });
    }
}

impl Decode for Values {
    fn decode(dec: &mut Decoder<'_>) -> CodecResult<Self> {
        let mut fields = dec.structure(schema::VALUES, 2)?;
        let stored: Hash = fields.field()?;
        let ValueVec(list) = fields.field()?;
        let values = Values::new(list);
        schema::check_hash("values", &stored, &values.hash)?;
        Ok(values)
    }
}

struct ValueList<'a>(&'a [Value]);

impl Encode for ValueList<'_> {
    fn encode(&self, enc: &mut Encoder) {
        enc.list(schema::VALUE, self.0.iter());
    }
}

struct ValueVec(Vec<Value>);

impl Decode for ValueVec {
    fn decode(dec: &mut Decoder<'_>) -> CodecResult<Self> {
        dec.list(schema::VALUE).map(ValueVec)
    }
}

/// An immutable batch of writes, identified by `H(values ‖ created_on)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Commit {
    hash: Hash,
    values: Values,
    created_on: i64,
}

impl Commit {
    pub fn new(values: Values, created_on: i64) -> Self {
        let hash = ContentHasher::COMMIT
            .hash_parts(&[values.hash.as_bytes(), created_on.to_string().as_bytes()]);
        Self {
            hash,
            values,
            created_on,
        }
    }

    /// Build a commit from staged writes, one value per namespace/resource
    /// pair, ordered by namespace then resource key.
    pub fn from_staged(staged: &Staged, created_on: i64) -> ModelResult<Self> {
        let mut list = Vec::new();
        for (namespace, entries) in staged {
            for (resource, data) in entries {
                list.push(Value::new(namespace.clone(), *resource, data.clone())?);
            }
        }
        Ok(Self::new(Values::new(list), created_on))
    }

    pub fn hash(&self) -> &Hash {
        &self.hash
    }

    pub fn values(&self) -> &Values {
        &self.values
    }

    pub fn created_on(&self) -> i64 {
        self.created_on
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        clock::to_datetime(self.created_on)
    }
}

impl Encode for Commit {
    fn encode(&self, enc: &mut Encoder) {
        enc.structure(schema::COMMIT, |fields| {
            fields
                .field(&self.hash)
                .field(&self.values)
                .field(&self.created_on);
        });
    }
}

impl Decode for Commit {
    fn decode(dec: &mut Decoder<'_>) -> CodecResult<Self> {
        let mut fields = dec.structure(schema::COMMIT, 3)?;
        let stored: Hash = fields.field()?;
        let values: Values = fields.field()?;
        let created_on: i64 = fields.field()?;
        let commit = Commit::new(values, created_on);
        schema::check_hash("commit", &stored, &commit.hash)?;
        Ok(commit)
    }
}
