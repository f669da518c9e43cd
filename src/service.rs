//! Service facade (SPEC_FULL.md §4.9): the seam an HTTP layer, or any other front door,
//! would be built against.
//!
//! No single teacher module maps onto this — it is a thin composition over
//! [`crate::store::LibraryStore`], [`crate::persistence`], and [`crate::recovery`]. The
//! logging idiom (one line per mutation, kind + library id, never the payload) follows the
//! teacher's recovery manager's warning style, moved onto `tracing`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::model::{Chunk, Document, IndexParams, Library, Metadata};
use crate::persistence::PersistenceAdapter;
use crate::store::{LibraryStats, LibraryStore};

/// The crate's top-level entry point. Construct via [`Service::start`], which runs recovery
/// before the facade will accept any other operation.
pub struct Service {
    store: LibraryStore,
    persistence: Arc<dyn PersistenceAdapter>,
    serving: AtomicBool,
}

impl Service {
    /// Builds a `Service` and runs recovery against `persistence` before returning. The
    /// returned facade refuses every other operation with `Unavailable` if recovery has not
    /// yet completed — which, since this constructor blocks on it, only matters for a future
    /// async-recovery variant; for now `serving` is always true by the time this returns.
    pub fn start(persistence: Arc<dyn PersistenceAdapter>) -> Result<Self> {
        let store = LibraryStore::new(Arc::clone(&persistence));
        let report = crate::recovery::recover(&persistence, &store)?;
        if !report.failed_library_ids.is_empty() {
            warn!(
                failed = report.failed_library_ids.len(),
                "service starting with some libraries excluded by recovery"
            );
        }
        let service = Service {
            store,
            persistence,
            serving: AtomicBool::new(true),
        };
        info!("service serving");
        Ok(service)
    }

    fn guard(&self, deadline: Option<Instant>, op: &'static str) -> Result<()> {
        if !self.serving.load(Ordering::Acquire) {
            warn!(op, "rejected: recovery not complete");
            return Err(Error::Unavailable);
        }
        if let Some(d) = deadline {
            if Instant::now() >= d {
                warn!(op, "rejected: deadline already elapsed");
                return Err(Error::Cancelled);
            }
        }
        Ok(())
    }

    fn log_outcome<T>(op: &'static str, library_id: &str, result: &Result<T>) {
        match result {
            Ok(_) => info!(op, library_id, "ok"),
            Err(e) => warn!(op, library_id, error = %e, kind = ?e.kind(), "failed"),
        }
    }

    pub fn create_library(
        &self,
        name: String,
        dims: usize,
        index_params: IndexParams,
        metadata: Metadata,
    ) -> Result<Library> {
        self.guard(None, "create_library")?;
        let result = self.store.create_library(name, dims, index_params, metadata);
        if let Ok(lib) = &result {
            Self::log_outcome("create_library", &lib.id, &result);
        } else {
            info!(op = "create_library", "failed before a library id existed");
        }
        result
    }

    pub fn get_library(&self, library_id: &str, deadline: Option<Instant>) -> Result<Library> {
        self.guard(deadline, "get_library")?;
        let result = self.store.get_library(library_id);
        Self::log_outcome("get_library", library_id, &result);
        result
    }

    pub fn list_libraries(&self, deadline: Option<Instant>) -> Result<Vec<Library>> {
        self.guard(deadline, "list_libraries")?;
        self.store.list_libraries()
    }

    pub fn update_library_metadata(
        &self,
        library_id: &str,
        metadata: Metadata,
        deadline: Option<Instant>,
    ) -> Result<Library> {
        self.guard(deadline, "update_library_metadata")?;
        let result = self.store.update_library_metadata(library_id, metadata);
        Self::log_outcome("update_library_metadata", library_id, &result);
        result
    }

    pub fn delete_library(&self, library_id: &str, deadline: Option<Instant>) -> Result<()> {
        self.guard(deadline, "delete_library")?;
        let result = self.store.delete_library(library_id);
        Self::log_outcome("delete_library", library_id, &result);
        result
    }

    pub fn create_document(
        &self,
        library_id: &str,
        title: String,
        metadata: Metadata,
        deadline: Option<Instant>,
    ) -> Result<Document> {
        self.guard(deadline, "create_document")?;
        let result = self.store.create_document(library_id, title, metadata);
        Self::log_outcome("create_document", library_id, &result);
        result
    }

    pub fn get_document(
        &self,
        library_id: &str,
        document_id: &str,
        deadline: Option<Instant>,
    ) -> Result<Document> {
        self.guard(deadline, "get_document")?;
        self.store.get_document(library_id, document_id)
    }

    pub fn list_documents(&self, library_id: &str, deadline: Option<Instant>) -> Result<Vec<Document>> {
        self.guard(deadline, "list_documents")?;
        self.store.list_documents(library_id)
    }

    pub fn update_document_metadata(
        &self,
        library_id: &str,
        document_id: &str,
        title: Option<String>,
        metadata: Option<Metadata>,
        deadline: Option<Instant>,
    ) -> Result<Document> {
        self.guard(deadline, "update_document_metadata")?;
        let result = self
            .store
            .update_document_metadata(library_id, document_id, title, metadata);
        Self::log_outcome("update_document_metadata", library_id, &result);
        result
    }

    pub fn delete_document(
        &self,
        library_id: &str,
        document_id: &str,
        deadline: Option<Instant>,
    ) -> Result<()> {
        self.guard(deadline, "delete_document")?;
        let result = self.store.delete_document(library_id, document_id);
        Self::log_outcome("delete_document", library_id, &result);
        result
    }

    pub fn create_chunk(
        &self,
        library_id: &str,
        document_id: &str,
        text: String,
        embedding: Vec<f32>,
        metadata: Metadata,
        deadline: Option<Instant>,
    ) -> Result<Chunk> {
        self.guard(deadline, "create_chunk")?;
        let result = self
            .store
            .create_chunk(library_id, document_id, text, embedding, metadata);
        Self::log_outcome("create_chunk", library_id, &result);
        result
    }

    pub fn batch_create_chunks(
        &self,
        library_id: &str,
        items: Vec<(String, String, Vec<f32>, Metadata)>,
        deadline: Option<Instant>,
    ) -> Result<Vec<Chunk>> {
        self.guard(deadline, "batch_create_chunks")?;
        let result = self.store.batch_create_chunks(library_id, items);
        Self::log_outcome("batch_create_chunks", library_id, &result);
        result
    }

    pub fn update_chunk(
        &self,
        library_id: &str,
        chunk_id: &str,
        text: Option<String>,
        embedding: Option<Vec<f32>>,
        metadata: Option<Metadata>,
        deadline: Option<Instant>,
    ) -> Result<Chunk> {
        self.guard(deadline, "update_chunk")?;
        let result = self
            .store
            .update_chunk(library_id, chunk_id, text, embedding, metadata);
        Self::log_outcome("update_chunk", library_id, &result);
        result
    }

    pub fn delete_chunk(
        &self,
        library_id: &str,
        chunk_id: &str,
        deadline: Option<Instant>,
    ) -> Result<()> {
        self.guard(deadline, "delete_chunk")?;
        let result = self.store.delete_chunk(library_id, chunk_id);
        Self::log_outcome("delete_chunk", library_id, &result);
        result
    }

    /// Ranked search over a library's chunks. The facade never embeds text itself — callers
    /// resolve text to an embedding before calling this (§6.2, §9 resolved open question).
    pub fn search(
        &self,
        library_id: &str,
        embedding: &[f32],
        k: usize,
        deadline: Option<Instant>,
    ) -> Result<Vec<(Chunk, f32)>> {
        self.guard(deadline, "search")?;
        let result = self.store.search(library_id, embedding, k, deadline);
        Self::log_outcome("search", library_id, &result);
        result
    }

    pub fn train_index(&self, library_id: &str, deadline: Option<Instant>) -> Result<()> {
        self.guard(deadline, "train_index")?;
        let result = self.store.train(library_id);
        Self::log_outcome("train_index", library_id, &result);
        result
    }

    pub fn rebuild_index(&self, library_id: &str, deadline: Option<Instant>) -> Result<()> {
        self.guard(deadline, "rebuild_index")?;
        let result = self.store.rebuild(library_id);
        Self::log_outcome("rebuild_index", library_id, &result);
        result
    }

    pub fn stats(&self, library_id: &str, deadline: Option<Instant>) -> Result<LibraryStats> {
        self.guard(deadline, "stats")?;
        self.store.stats(library_id)
    }

    /// Exposed so a host process's healthcheck can report recovery progress without a full
    /// library operation.
    pub fn is_serving(&self) -> bool {
        self.serving.load(Ordering::Acquire)
    }

    /// The persistence adapter this service was started with, for a host process that needs
    /// to perform out-of-band maintenance (e.g. backups) alongside normal traffic.
    pub fn persistence(&self) -> &Arc<dyn PersistenceAdapter> {
        &self.persistence
    }
}
