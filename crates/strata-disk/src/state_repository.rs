use std::fs::File;
use std::io::{self, Read};

use strata_codec::{from_bytes, CodecError};
use strata_model::{State, StateRepository, StoreError, StoreResult, StoredHead};
use strata_types::Hash;
use tracing::debug;

use crate::layout::DiskLayout;

/// Bytes taken by the state length prefix.
pub const PREFIX_LEN: u64 = 8;

/// Reads the head state from the front of the database file.
#[derive(Clone, Debug)]
pub struct DiskStateRepository {
    layout: DiskLayout,
}

impl DiskStateRepository {
    pub fn new(layout: DiskLayout) -> Self {
        Self { layout }
    }

    /// Size of the header (prefix included) without decoding the state.
    /// Zero when there is no head.
    pub fn header_len(&self) -> StoreResult<u64> {
        match open_existing(&self.layout)? {
            Some(mut file) => read_header_len(&mut file),
            None => Ok(0),
        }
    }

    /// Hash of the head state, if any.
    pub fn head_hash(&self) -> StoreResult<Option<Hash>> {
        Ok(self.retrieve()?.map(|stored| *stored.state.hash()))
    }
}

impl StateRepository for DiskStateRepository {
    fn retrieve(&self) -> StoreResult<Option<StoredHead>> {
        match open_existing(&self.layout)? {
            Some(mut file) => read_head(&mut file),
            None => Ok(None),
        }
    }
}

pub(crate) fn open_existing(layout: &DiskLayout) -> StoreResult<Option<File>> {
    match File::open(layout.db_file()) {
        Ok(file) => Ok(Some(file)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// Header size of an open database file positioned at its start. Zero for an
/// empty file.
pub(crate) fn read_header_len(file: &mut File) -> StoreResult<u64> {
    let file_len = file.metadata()?.len();
    Ok(read_prefix(file, file_len)?.map_or(0, |len| PREFIX_LEN + len))
}

/// Decode the head from an open database file positioned at its start.
///
/// An empty file has no head: the state service creates the file before it
/// writes the first state.
pub(crate) fn read_head(file: &mut File) -> StoreResult<Option<StoredHead>> {
    let file_len = file.metadata()?.len();
    let Some(state_len) = read_prefix(file, file_len)? else {
        return Ok(None);
    };
    let mut buf = vec![0u8; state_len as usize];
    file.read_exact(&mut buf)?;

    let (state, rest) = from_bytes::<State>(&buf)?;
    if !rest.is_empty() {
        return Err(CodecError::TrailingBytes(rest.len()).into());
    }
    debug!(head = %state.hash(), height = state.height(), state_len, "read head state");
    Ok(Some(StoredHead {
        state,
        header_len: PREFIX_LEN + state_len,
    }))
}

fn read_prefix(file: &mut File, file_len: u64) -> StoreResult<Option<u64>> {
    if file_len == 0 {
        return Ok(None);
    }
    if file_len < PREFIX_LEN {
        return Err(StoreError::InvariantViolation(format!(
            "database file is {file_len} bytes, shorter than its {PREFIX_LEN}-byte length prefix"
        )));
    }
    let mut prefix = [0u8; PREFIX_LEN as usize];
    file.read_exact(&mut prefix)?;
    let state_len = u64::from_le_bytes(prefix);
    if state_len > file_len - PREFIX_LEN {
        return Err(StoreError::InvariantViolation(format!(
            "recorded state size {state_len} exceeds the {file_len}-byte database file"
        )));
    }
    Ok(Some(state_len))
}
