//! Error types.
//!
//! Conversion itself never fails; these cover the boundaries where records
//! and configuration are read.

use thiserror::Error;

/// Errors raised while loading or storing records.
#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed record: {0}")]
    Json(#[from] serde_json::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store error: {0}")]
    Store(#[from] crate::store::StoreError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
