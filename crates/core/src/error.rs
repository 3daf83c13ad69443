//! Unified error types for filecache.
//!
//! `open` and `save` surface these directly. `load` folds every failure into
//! `None`; `try_load` is the only place `DecodeFailure` and `Expired` appear.

use std::path::PathBuf;

/// Unified error types for the cache store.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The backing file could not be opened, created, truncated, read, or written.
    #[error("STORAGE_UNAVAILABLE: {}: {source}", .path.display())]
    StorageUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The metadata block is truncated or does not deserialize.
    #[error("CORRUPT_METADATA: {0}")]
    CorruptMetadata(String),

    /// Metadata or payload failed to serialize.
    #[error("ENCODE_FAILURE: {0}")]
    EncodeFailure(String),

    /// The payload block failed to deserialize.
    #[error("DECODE_FAILURE: {0}")]
    DecodeFailure(String),

    /// The cache expired and its file was removed.
    #[error("EXPIRED: {0}")]
    Expired(String),

    /// Identifier is empty or does not resolve inside the storage directory.
    #[error("INVALID_IDENTIFIER: {0:?}")]
    InvalidIdentifier(String),
}

impl Error {
    pub(crate) fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::StorageUnavailable { path: path.into(), source }
    }

    /// True for errors that mean "nothing usable on disk" rather than a fault.
    pub fn is_absent(&self) -> bool {
        match self {
            Error::Expired(_) => true,
            Error::StorageUnavailable { source, .. } => source.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}
