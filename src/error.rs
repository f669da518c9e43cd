//! Error taxonomy for the vector database core.

use std::fmt;

use crate::persistence::PersistenceError;

/// The stable kind tag an HTTP layer (or any other front door) would switch on.
///
/// Maps directly onto the status codes in SPEC_FULL.md §6.1: Validation/Conflict -> 400/409,
/// NotFound -> 404, Unavailable -> 503, Cancelled -> 504, Upstream -> 502.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    State,
    Conflict,
    Upstream,
    Cancelled,
    Unavailable,
}

/// Errors surfaced by the library store, index, persistence adapter, and service facade.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Malformed input: wrong dims, non-finite floats, bad `k`, unknown index kind.
    Validation(String),
    /// Library, document, or chunk id not found.
    NotFound(String),
    /// Operation incompatible with current state (e.g. insert into untrained IVF).
    State(String),
    /// Attempt to mutate an immutable field (`dims`, `index_kind`).
    Conflict(String),
    /// Persistence adapter (or, for a host process, the embedding service) failed.
    Upstream(String),
    /// Deadline exceeded or caller cancelled before/while waiting.
    Cancelled,
    /// Recovery has not finished; the store is not yet serving.
    Unavailable,
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Error::NotFound(msg.into())
    }

    pub fn state(msg: impl Into<String>) -> Self {
        Error::State(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Error::Conflict(msg.into())
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        Error::Upstream(msg.into())
    }

    /// The stable kind tag, for callers that need to branch on category rather than message.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) => ErrorKind::Validation,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::State(_) => ErrorKind::State,
            Error::Conflict(_) => ErrorKind::Conflict,
            Error::Upstream(_) => ErrorKind::Upstream,
            Error::Cancelled => ErrorKind::Cancelled,
            Error::Unavailable => ErrorKind::Unavailable,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Validation(msg) => write!(f, "validation error: {}", msg),
            Error::NotFound(msg) => write!(f, "not found: {}", msg),
            Error::State(msg) => write!(f, "invalid state: {}", msg),
            Error::Conflict(msg) => write!(f, "conflict: {}", msg),
            Error::Upstream(msg) => write!(f, "upstream error: {}", msg),
            Error::Cancelled => write!(f, "operation cancelled (deadline exceeded)"),
            Error::Unavailable => write!(f, "service unavailable: recovery in progress"),
        }
    }
}

impl std::error::Error for Error {}

impl From<PersistenceError> for Error {
    fn from(e: PersistenceError) -> Self {
        Error::Upstream(e.to_string())
    }
}

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
