use strata_codec::CodecError;
use strata_types::Hash;

/// Errors raised while building or querying model entities.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// A namespace was empty.
    #[error("the namespace of a {entity} must not be empty")]
    EmptyNamespace { entity: &'static str },

    /// A pointer was built with `length == 0`.
    #[error("pointer length must be greater than zero")]
    ZeroLength,

    /// `index + length` does not fit in a `u64`.
    #[error("pointer range {index}+{length} overflows")]
    RangeOverflow { index: u64, length: u64 },

    /// No pointer matches the namespace/resource pair.
    #[error("no pointer for resource {resource} in namespace {namespace:?}")]
    PointerNotFound { namespace: String, resource: Hash },

    /// No staged value carries the resource key.
    #[error("no value assigned to resource {0}")]
    ValueNotFound(Hash),

    /// The state is not part of the chain being searched.
    #[error("state not found: {0}")]
    StateNotFound(Hash),

    /// A state chain has no records or a record links to the wrong parent.
    #[error("broken state chain at height {height}: {reason}")]
    BrokenChain { height: u64, reason: String },
}

impl ModelError {
    /// Returns `true` for the lookup-miss variants.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::PointerNotFound { .. } | Self::ValueNotFound(_) | Self::StateNotFound(_)
        )
    }
}

/// Result alias for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors from the repositories and services persisting the model.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The commit log holds no file for the hash.
    #[error("commit not found: {0}")]
    CommitNotFound(Hash),

    /// I/O error from the underlying filesystem.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The codec rejected persisted bytes.
    #[error("decode error: {0}")]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Model(#[from] ModelError),

    /// A resource entry is shorter than its content key.
    #[error("resource entry too short: expected at least {expected} bytes, read {actual}")]
    TooShort { expected: u64, actual: u64 },

    /// The files on disk contradict each other (external corruption).
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// Another push replaced the head while this one was being prepared.
    #[error("head state changed from {expected:?} to {found:?} during the push")]
    StaleHead {
        expected: Option<Hash>,
        found: Option<Hash>,
    },

    /// A commit-point hook refused to let the operation complete.
    #[error("aborted at commit point: {0}")]
    Aborted(String),
}

impl StoreError {
    /// Returns `true` when the error means "no such entity".
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::CommitNotFound(_) => true,
            Self::Model(err) => err.is_not_found(),
            _ => false,
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
