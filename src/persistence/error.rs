//! Errors from the persistence adapter (SPEC_FULL.md §4.7).

use std::fmt;

/// Errors a [`super::PersistenceAdapter`] implementation can return.
#[derive(Debug, Clone, PartialEq)]
pub enum PersistenceError {
    /// The backing store itself failed (disk I/O, network, serialization).
    Backend(String),
    /// A record referenced by id was not present at load time.
    NotFound(String),
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistenceError::Backend(msg) => write!(f, "persistence backend error: {}", msg),
            PersistenceError::NotFound(id) => write!(f, "persistence record not found: {}", id),
        }
    }
}

impl std::error::Error for PersistenceError {}

pub type PersistenceResult<T> = std::result::Result<T, PersistenceError>;
