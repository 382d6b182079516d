use std::fs::File;
use std::io::{Read, Seek, SeekFrom};

use strata_model::{Pointer, Resource, ResourceRepository, StoreError, StoreResult};
use strata_types::Hash;

use crate::layout::DiskLayout;
use crate::state_repository::{open_existing, read_header_len};

/// Reads entries from the resource blob that follows the state header.
///
/// Every read takes the header size and the entry from a single handle, so a
/// concurrent replacement of the database file is seen either entirely or
/// not at all.
#[derive(Clone, Debug)]
pub struct DiskResourceRepository {
    layout: DiskLayout,
}

impl DiskResourceRepository {
    pub fn new(layout: DiskLayout) -> Self {
        Self { layout }
    }
}

impl ResourceRepository for DiskResourceRepository {
    fn next_index(&self) -> StoreResult<u64> {
        let Some(mut file) = open_existing(&self.layout)? else {
            return Ok(0);
        };
        let header_len = read_header_len(&mut file)?;
        blob_len(file.metadata()?.len(), header_len)
    }

    fn retrieve(&self, pointer: &Pointer) -> StoreResult<Resource> {
        let mut file = File::open(self.layout.db_file())?;
        let header_len = read_header_len(&mut file)?;
        let blob = blob_len(file.metadata()?.len(), header_len)?;
        check_range(pointer, blob)?;

        file.seek(SeekFrom::Start(header_len + pointer.index()))?;
        let mut entry = Vec::new();
        file.take(pointer.length()).read_to_end(&mut entry)?;
        split_entry(pointer, entry)
    }
}

/// Reject pointers reaching past the end of a blob of `blob` bytes.
fn check_range(pointer: &Pointer, blob: u64) -> StoreResult<()> {
    match pointer.index().checked_add(pointer.length()) {
        Some(end) if end <= blob => Ok(()),
        _ => Err(StoreError::TooShort {
            expected: pointer.length(),
            actual: blob.saturating_sub(pointer.index()),
        }),
    }
}

/// Length of the resource blob given the file and header sizes.
pub(crate) fn blob_len(file_len: u64, header_len: u64) -> StoreResult<u64> {
    file_len.checked_sub(header_len).ok_or_else(|| {
        StoreError::InvariantViolation(format!(
            "database file is {file_len} bytes, smaller than its {header_len}-byte state header"
        ))
    })
}

/// Split a blob entry into its content key and value.
fn split_entry(pointer: &Pointer, mut entry: Vec<u8>) -> StoreResult<Resource> {
    let read = entry.len() as u64;
    if read < Hash::SIZE as u64 {
        return Err(StoreError::TooShort {
            expected: Hash::SIZE as u64,
            actual: read,
        });
    }
    if read < pointer.length() {
        return Err(StoreError::TooShort {
            expected: pointer.length(),
            actual: read,
        });
    }
    let value = entry.split_off(Hash::SIZE);
    let key = Hash::from_slice(&entry).map_err(|e| StoreError::InvariantViolation(e.to_string()))?;
    if &key != pointer.resource() {
        return Err(StoreError::InvariantViolation(format!(
            "entry at index {} holds resource {key}, pointer expects {}",
            pointer.index(),
            pointer.resource()
        )));
    }
    Ok(Resource::from_parts(pointer.clone(), value))
}
