//! Type names written into the tagged stream for each persisted entity.
//!
//! The `.v1` suffix is part of the name: a layout change gets a new name and
//! the decoder refuses names it does not know.

use strata_codec::CodecError;
use strata_types::Hash;

use crate::error::ModelError;

pub const POINTER: &str = "strata.pointer.v1";
pub const POINTERS: &str = "strata.pointers.v1";
pub const VALUE: &str = "strata.value.v1";
pub const VALUES: &str = "strata.values.v1";
pub const COMMIT: &str = "strata.commit.v1";
pub const STATE: &str = "strata.state.v1";
pub const STATES: &str = "strata.states.v1";

/// Reject a decoded entity whose stored hash differs from the recomputed one.
pub(crate) fn check_hash(entity: &'static str, stored: &Hash, computed: &Hash) -> Result<(), CodecError> {
    if stored == computed {
        return Ok(());
    }
    Err(CodecError::Invalid {
        entity,
        reason: format!("stored hash {stored} does not match computed hash {computed}"),
    })
}

/// Map a constructor failure during decoding into a codec error.
pub(crate) fn rejected(entity: &'static str) -> impl Fn(ModelError) -> CodecError {
    move |err| CodecError::Invalid {
        entity,
        reason: err.to_string(),
    }
}
