use strata_model::{ModelError, StoreError};
use strata_types::Hash;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("unknown transaction context: {0}")]
    UnknownContext(Hash),

    #[error("transaction context {0} has no durable commit to push")]
    NotCommitted(Hash),

    #[error("database has no head state")]
    NoHead,

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("model error: {0}")]
    Model(#[from] ModelError),

    #[error("configuration error: {0}")]
    Config(String),
}

impl SdkError {
    /// Returns `true` when the error means "no such entity".
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NoHead => true,
            Self::Store(err) => err.is_not_found(),
            Self::Model(err) => err.is_not_found(),
            _ => false,
        }
    }
}

pub type SdkResult<T> = Result<T, SdkError>;
