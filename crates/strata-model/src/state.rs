use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use strata_codec::{CodecResult, Decode, Decoder, Encode, Encoder};
use strata_crypto::ContentHasher;
use strata_types::Hash;

use crate::clock;
use crate::error::{ModelError, ModelResult};
use crate::pointer::{Pointer, PointerSet};
use crate::schema;

/// One persisted snapshot: a pointer set, a timestamp and the hash of the
/// snapshot it supersedes.
///
/// `hash = H(pointers ‖ created_on [‖ previous])`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateRecord {
    hash: Hash,
    pointers: PointerSet,
    created_on: i64,
    previous: Option<Hash>,
}

impl StateRecord {
    pub fn new(pointers: PointerSet, created_on: i64, previous: Option<Hash>) -> Self {
        let created = created_on.to_string();
        let hash = match &previous {
            Some(prev) => ContentHasher::STATE.hash_parts(&[
                pointers.hash().as_bytes(),
                created.as_bytes(),
                prev.as_bytes(),
            ]),
            None => ContentHasher::STATE.hash_parts(&[pointers.hash().as_bytes(), created.as_bytes()]),
        };
        Self {
            hash,
            pointers,
            created_on,
            previous,
        }
    }

    pub fn hash(&self) -> &Hash {
        &self.hash
    }

    pub fn pointers(&self) -> &PointerSet {
        &self.pointers
    }

    pub fn created_on(&self) -> i64 {
        self.created_on
    }

    pub fn previous(&self) -> Option<&Hash> {
        self.previous.as_ref()
    }
}

impl Encode for StateRecord {
    fn encode(&self, enc: &mut Encoder) {
        enc.structure(schema::STATE, |fields| {
            fields
                .field(&self.hash)
                .field(&self.pointers)
                .field(&self.created_on)
                .field(&self.previous);
        });
    }
}

impl Decode for StateRecord {
    fn decode(dec: &mut Decoder<'_>) -> CodecResult<Self> {
        let mut fields = dec.structure(schema::STATE, 4)?;
        let stored: Hash = fields.field()?;
        let pointers: PointerSet = fields.field()?;
        let created_on: i64 = fields.field()?;
        let previous: Option<Hash> = fields.field()?;
        let record = StateRecord::new(pointers, created_on, previous);
        schema::check_hash("state", &stored, &record.hash)?;
        Ok(record)
    }
}

/// Arena of state records, root first, indexed by hash.
#[derive(Debug)]
struct StateChain {
    records: Vec<Arc<StateRecord>>,
    positions: HashMap<Hash, usize>,
}

impl StateChain {
    fn new(records: Vec<Arc<StateRecord>>) -> ModelResult<Self> {
        let mut positions = HashMap::with_capacity(records.len());
        for (position, record) in records.iter().enumerate() {
            let expected = match position {
                0 => None,
                _ => Some(records[position - 1].hash),
            };
            if record.previous != expected {
                return Err(ModelError::BrokenChain {
                    height: position as u64 + 1,
                    reason: match (expected, record.previous) {
                        (Some(want), Some(got)) => format!("links to {got}, expected {want}"),
                        (Some(want), None) => format!("missing link to {want}"),
                        (None, _) => "root state has a previous link".to_string(),
                    },
                });
            }
            positions.insert(record.hash, position);
        }
        Ok(Self { records, positions })
    }
}

/// Handle on one snapshot of the state chain.
///
/// A `State` is a position inside a shared, immutable arena of
/// [`StateRecord`]s; walking to the previous state or the root never copies
/// records. Handles are cheap to clone and safe to share across threads.
#[derive(Clone)]
pub struct State {
    chain: Arc<StateChain>,
    position: usize,
}

impl State {
    /// The first state of a chain.
    pub fn genesis(pointers: PointerSet, created_on: i64) -> Self {
        let record = Arc::new(StateRecord::new(pointers, created_on, None));
        let mut positions = HashMap::new();
        positions.insert(record.hash, 0);
        Self {
            chain: Arc::new(StateChain {
                records: vec![record],
                positions,
            }),
            position: 0,
        }
    }

    /// A new state whose previous link is `self`.
    ///
    /// Records newer than `self` in the arena are not carried over.
    pub fn extend(&self, pointers: PointerSet, created_on: i64) -> Self {
        let record = Arc::new(StateRecord::new(pointers, created_on, Some(*self.hash())));
        let mut records = self.chain.records[..=self.position].to_vec();
        let mut positions: HashMap<Hash, usize> = records
            .iter()
            .enumerate()
            .map(|(position, record)| (record.hash, position))
            .collect();
        positions.insert(record.hash, records.len());
        records.push(record);
        let position = records.len() - 1;
        Self {
            chain: Arc::new(StateChain { records, positions }),
            position,
        }
    }

    /// Extend `head` when there is one, otherwise start a new chain.
    pub fn next(head: Option<&State>, pointers: PointerSet, created_on: i64) -> Self {
        match head {
            Some(head) => head.extend(pointers, created_on),
            None => Self::genesis(pointers, created_on),
        }
    }

    /// Rebuild a chain from records ordered root first; the handle points at
    /// the last record. Every previous-link is checked.
    pub fn from_records(records: Vec<StateRecord>) -> ModelResult<Self> {
        if records.is_empty() {
            return Err(ModelError::BrokenChain {
                height: 0,
                reason: "no records".to_string(),
            });
        }
        let chain = StateChain::new(records.into_iter().map(Arc::new).collect())?;
        let position = chain.records.len() - 1;
        Ok(Self {
            chain: Arc::new(chain),
            position,
        })
    }

    fn record(&self) -> &StateRecord {
        &self.chain.records[self.position]
    }

    pub fn hash(&self) -> &Hash {
        &self.record().hash
    }

    pub fn pointers(&self) -> &PointerSet {
        &self.record().pointers
    }

    pub fn created_on(&self) -> i64 {
        self.record().created_on
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        clock::to_datetime(self.created_on())
    }

    /// Hash of the previous state, if any.
    pub fn previous_hash(&self) -> Option<&Hash> {
        self.record().previous.as_ref()
    }

    /// Number of states from the root up to and including this one.
    pub fn height(&self) -> u64 {
        self.position as u64 + 1
    }

    pub fn has_previous(&self) -> bool {
        self.position > 0
    }

    pub fn previous(&self) -> Option<State> {
        self.position.checked_sub(1).map(|position| self.at(position))
    }

    pub fn root(&self) -> State {
        self.at(0)
    }

    /// Find `hash` among this state and its ancestors.
    pub fn fetch(&self, hash: &Hash) -> ModelResult<State> {
        match self.chain.positions.get(hash) {
            Some(&position) if position <= self.position => Ok(self.at(position)),
            _ => Err(ModelError::StateNotFound(*hash)),
        }
    }

    /// Resolve a pointer in this state, falling back to older states when the
    /// resource was not written by this one.
    pub fn pointer(&self, namespace: &str, resource: &Hash) -> ModelResult<&Pointer> {
        self.records()
            .iter()
            .rev()
            .find_map(|record| record.pointers.get(namespace, resource))
            .ok_or_else(|| ModelError::PointerNotFound {
                namespace: namespace.to_string(),
                resource: *resource,
            })
    }

    /// This state followed by its ancestors, newest first.
    pub fn history(&self) -> impl Iterator<Item = State> + '_ {
        (0..=self.position).rev().map(|position| self.at(position))
    }

    /// Records from the root up to and including this state.
    pub fn records(&self) -> &[Arc<StateRecord>] {
        &self.chain.records[..=self.position]
    }

    fn at(&self, position: usize) -> State {
        State {
            chain: Arc::clone(&self.chain),
            position,
        }
    }
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.position == other.position && self.hash() == other.hash()
    }
}

impl Eq for State {}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("hash", self.hash())
            .field("height", &self.height())
            .field("pointers", &self.pointers().len())
            .finish()
    }
}

/// Persisted as `{head hash, [records root..head]}`.
impl Encode for State {
    fn encode(&self, enc: &mut Encoder) {
        enc.structure(schema::STATES, |fields| {
            fields.field(self.hash()).field(&RecordList(self.records()));
        });
    }
}

impl Decode for State {
    fn decode(dec: &mut Decoder<'_>) -> CodecResult<Self> {
        let mut fields = dec.structure(schema::STATES, 2)?;
        let head: Hash = fields.field()?;
        let RecordVec(records) = fields.field()?;
        let state = State::from_records(records).map_err(schema::rejected("state"))?;
        schema::check_hash("state", &head, state.hash())?;
        Ok(state)
    }
}

struct RecordList<'a>(&'a [Arc<StateRecord>]);

impl Encode for RecordList<'_> {
    fn encode(&self, enc: &mut Encoder) {
        enc.list(schema::STATE, self.0.iter().map(|record| &**record));
    }
}

struct RecordVec(Vec<StateRecord>);

impl Decode for RecordVec {
    fn decode(dec: &mut Decoder<'_>) -> CodecResult<Self> {
        dec.list(schema::STATE).map(RecordVec)
    }
}
