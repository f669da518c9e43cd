//! The pluggable persistence contract (SPEC_FULL.md §4.7).
//!
//! Grounded on the teacher's `persistence::directory::Directory` trait: same idea (the
//! storage backend is swappable — filesystem, memory, a hosted datastore — behind one
//! trait), narrowed to this crate's document-oriented shape (three collections, whole-record
//! upsert, no byte-level file API) instead of the teacher's generic file abstraction.

use crate::model::{Chunk, Document, Library};
use crate::persistence::error::PersistenceResult;

/// A full snapshot of everything persisted, as loaded at startup by recovery.
pub struct Snapshot {
    pub libraries: Vec<Library>,
    pub documents_by_library: std::collections::HashMap<String, Vec<Document>>,
    pub chunks_by_library: std::collections::HashMap<String, Vec<Chunk>>,
}

/// Durable storage for libraries, documents, and chunks. Writes are single-record upserts;
/// there is no cross-collection transaction (SPEC_FULL.md §4.7 — no WAL, no global commit).
pub trait PersistenceAdapter: Send + Sync {
    fn save_library(&self, library: &Library) -> PersistenceResult<()>;
    fn save_document(&self, document: &Document) -> PersistenceResult<()>;
    fn save_chunk(&self, chunk: &Chunk) -> PersistenceResult<()>;

    /// Deletes a library and, cascading, every document and chunk that referenced it.
    fn delete_library(&self, id: &str) -> PersistenceResult<()>;
    fn delete_document(&self, id: &str) -> PersistenceResult<()>;
    fn delete_chunk(&self, id: &str) -> PersistenceResult<()>;

    /// Loads everything persisted, grouped by library id, for recovery to rebuild from.
    fn load_all(&self) -> PersistenceResult<Snapshot>;
}
