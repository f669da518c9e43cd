//! The library store: a process-wide map of libraries, each independently locked
//! (SPEC_FULL.md §4.6).

pub mod handle;
pub mod rwlock;

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::index::IndexStats;
use crate::model::{Chunk, Document, IndexParams, Library, Metadata, ScoredId};
use crate::persistence::PersistenceAdapter;
use handle::{LibraryData, LibraryHandle};

const MIN_K: usize = 1;
const MAX_K: usize = 1000;

#[derive(Debug, Clone, PartialEq)]
pub struct LibraryStats {
    pub n_documents: usize,
    pub n_chunks: usize,
    pub index: IndexStats,
}

/// Holds every library's handle behind one outer lock, held only long enough to insert or
/// remove a handle — never while doing per-library work (§5).
pub struct LibraryStore {
    persistence: Arc<dyn PersistenceAdapter>,
    handles: RwLock<HashMap<String, Arc<LibraryHandle>>>,
}

impl LibraryStore {
    pub fn new(persistence: Arc<dyn PersistenceAdapter>) -> Self {
        LibraryStore {
            persistence,
            handles: RwLock::new(HashMap::new()),
        }
    }

    /// Used by recovery to install handles rebuilt from a persisted snapshot, bypassing the
    /// ordinary create path (which would re-persist already-durable data).
    pub(crate) fn insert_handle(&self, handle: LibraryHandle) {
        self.handles
            .write()
            .unwrap()
            .insert(handle.id.clone(), Arc::new(handle));
    }

    fn get_handle(&self, library_id: &str) -> Result<Arc<LibraryHandle>> {
        self.handles
            .read()
            .unwrap()
            .get(library_id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("library {library_id}")))
    }

    pub fn create_library(
        &self,
        name: String,
        dims: usize,
        index_params: IndexParams,
        metadata: Metadata,
    ) -> Result<Library> {
        let library = Library::new(name, dims, index_params, metadata)?;
        self.persistence.save_library(&library)?;
        let handle = LibraryHandle::new(library.clone());
        self.handles
            .write()
            .unwrap()
            .insert(library.id.clone(), Arc::new(handle));
        info!(library_id = %library.id, "library created");
        Ok(library)
    }

    pub fn list_libraries(&self) -> Result<Vec<Library>> {
        let handles: Vec<Arc<LibraryHandle>> = self.handles.read().unwrap().values().cloned().collect();
        let mut out = Vec::with_capacity(handles.len());
        for h in handles {
            out.push(h.read(None)?.library.clone());
        }
        Ok(out)
    }

    pub fn get_library(&self, library_id: &str) -> Result<Library> {
        let handle = self.get_handle(library_id)?;
        Ok(handle.read(None)?.library.clone())
    }

    pub fn update_library_metadata(&self, library_id: &str, metadata: Metadata) -> Result<Library> {
        let handle = self.get_handle(library_id)?;
        let mut data = handle.write(None)?;
        let previous = data.library.metadata.clone();
        data.library.metadata = metadata;
        data.library.updated_at = chrono::Utc::now();
        if let Err(e) = self.persistence.save_library(&data.library) {
            data.library.metadata = previous;
            warn!(library_id, error = %e, "rolled back library metadata update after persistence failure");
            return Err(e.into());
        }
        Ok(data.library.clone())
    }

    pub fn delete_library(&self, library_id: &str) -> Result<()> {
        let mut handles = self.handles.write().unwrap();
        if !handles.contains_key(library_id) {
            return Err(Error::not_found(format!("library {library_id}")));
        }
        self.persistence.delete_library(library_id)?;
        handles.remove(library_id);
        info!(library_id, "library deleted");
        Ok(())
    }

    pub fn create_document(
        &self,
        library_id: &str,
        title: String,
        metadata: Metadata,
    ) -> Result<Document> {
        let handle = self.get_handle(library_id)?;
        let mut data = handle.write(None)?;
        let document = Document::new(library_id.to_string(), title, metadata);
        self.persistence.save_document(&document)?;
        data.documents.insert(document.id.clone(), document.clone());
        Ok(document)
    }

    pub fn get_document(&self, library_id: &str, document_id: &str) -> Result<Document> {
        let handle = self.get_handle(library_id)?;
        let data = handle.read(None)?;
        data.documents
            .get(document_id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("document {document_id}")))
    }

    pub fn list_documents(&self, library_id: &str) -> Result<Vec<Document>> {
        let handle = self.get_handle(library_id)?;
        Ok(handle.read(None)?.documents.values().cloned().collect())
    }

    pub fn update_document_metadata(
        &self,
        library_id: &str,
        document_id: &str,
        title: Option<String>,
        metadata: Option<Metadata>,
    ) -> Result<Document> {
        let handle = self.get_handle(library_id)?;
        let mut data = handle.write(None)?;
        let previous = data
            .documents
            .get(document_id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("document {document_id}")))?;

        let mut updated = previous.clone();
        if let Some(t) = title {
            updated.title = t;
        }
        if let Some(m) = metadata {
            updated.metadata = m;
        }
        updated.updated_at = chrono::Utc::now();

        if let Err(e) = self.persistence.save_document(&updated) {
            warn!(library_id, document_id, error = %e, "document metadata update not persisted");
            return Err(e.into());
        }
        data.documents.insert(document_id.to_string(), updated.clone());
        Ok(updated)
    }

    /// Deletes a document; every chunk it owns is removed from the chunk map and the index.
    pub fn delete_document(&self, library_id: &str, document_id: &str) -> Result<()> {
        let handle = self.get_handle(library_id)?;
        let mut data = handle.write(None)?;
        if !data.documents.contains_key(document_id) {
            return Err(Error::not_found(format!("document {document_id}")));
        }

        let doc_backup = data.documents.get(document_id).cloned();
        let chunks_backup: Vec<Chunk> = data
            .chunks
            .values()
            .filter(|c| c.document_id == document_id)
            .cloned()
            .collect();
        let index_backup = data.index.clone();

        data.documents.remove(document_id);
        for chunk in &chunks_backup {
            data.chunks.remove(&chunk.id);
            data.index.remove(&chunk.id);
        }

        if let Err(e) = self.persistence.delete_document(document_id) {
            if let Some(doc) = doc_backup {
                data.documents.insert(document_id.to_string(), doc);
            }
            for chunk in chunks_backup {
                data.chunks.insert(chunk.id.clone(), chunk);
            }
            data.index = index_backup;
            warn!(library_id, document_id, error = %e, "document delete rolled back after persistence failure");
            return Err(e.into());
        }
        Ok(())
    }

    pub fn create_chunk(
        &self,
        library_id: &str,
        document_id: &str,
        text: String,
        embedding: Vec<f32>,
        metadata: Metadata,
    ) -> Result<Chunk> {
        let handle = self.get_handle(library_id)?;
        let mut data = handle.write(None)?;
        self.insert_chunk_locked(&mut data, document_id, text, embedding, metadata)
    }

    fn insert_chunk_locked(
        &self,
        data: &mut LibraryData,
        document_id: &str,
        text: String,
        embedding: Vec<f32>,
        metadata: Metadata,
    ) -> Result<Chunk> {
        if !data.documents.contains_key(document_id) {
            return Err(Error::not_found(format!("document {document_id}")));
        }
        crate::model::validate_embedding(&embedding, data.library.dims)?;

        let chunk = Chunk::new(
            data.library.id.clone(),
            document_id.to_string(),
            text,
            embedding,
            metadata,
        );
        // Index first: an untrained IVF index rejects the add, and nothing should land in
        // the chunk map in that case.
        data.index.add(chunk.id.clone(), &chunk.embedding)?;
        data.chunks.insert(chunk.id.clone(), chunk.clone());

        if let Err(e) = self.persistence.save_chunk(&chunk) {
            data.chunks.remove(&chunk.id);
            data.index.remove(&chunk.id);
            warn!(chunk_id = %chunk.id, error = %e, "chunk create rolled back after persistence failure");
            return Err(e.into());
        }
        Ok(chunk)
    }

    /// Atomic with respect to the handle lock: if any element fails, every chunk already
    /// inserted by this call is rolled back (§4.6).
    pub fn batch_create_chunks(
        &self,
        library_id: &str,
        items: Vec<(String, String, Vec<f32>, Metadata)>,
    ) -> Result<Vec<Chunk>> {
        let handle = self.get_handle(library_id)?;
        let mut data = handle.write(None)?;
        let mut created: Vec<Chunk> = Vec::with_capacity(items.len());

        for (document_id, text, embedding, metadata) in items {
            match self.insert_chunk_locked(&mut data, &document_id, text, embedding, metadata) {
                Ok(chunk) => created.push(chunk),
                Err(e) => {
                    for chunk in &created {
                        data.chunks.remove(&chunk.id);
                        data.index.remove(&chunk.id);
                        let _ = self.persistence.delete_chunk(&chunk.id);
                    }
                    warn!(library_id, error = %e, "batch chunk create rolled back");
                    return Err(e);
                }
            }
        }
        Ok(created)
    }

    pub fn update_chunk(
        &self,
        library_id: &str,
        chunk_id: &str,
        text: Option<String>,
        embedding: Option<Vec<f32>>,
        metadata: Option<Metadata>,
    ) -> Result<Chunk> {
        let handle = self.get_handle(library_id)?;
        let mut data = handle.write(None)?;
        let previous = data
            .chunks
            .get(chunk_id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("chunk {chunk_id}")))?;

        let mut updated = previous.clone();
        if let Some(t) = text {
            updated.text = t;
        }
        let embedding_changed = embedding.is_some();
        if let Some(e) = embedding {
            crate::model::validate_embedding(&e, data.library.dims)?;
            updated.embedding = e;
        }
        if let Some(m) = metadata {
            updated.metadata = m;
        }
        updated.updated_at = chrono::Utc::now();

        if embedding_changed {
            data.index.remove(chunk_id);
            if let Err(e) = data.index.add(chunk_id.to_string(), &updated.embedding) {
                let _ = data.index.add(chunk_id.to_string(), &previous.embedding);
                return Err(e);
            }
        }
        data.chunks.insert(chunk_id.to_string(), updated.clone());

        if let Err(e) = self.persistence.save_chunk(&updated) {
            data.chunks.insert(chunk_id.to_string(), previous.clone());
            if embedding_changed {
                data.index.remove(chunk_id);
                let _ = data.index.add(chunk_id.to_string(), &previous.embedding);
            }
            warn!(library_id, chunk_id, error = %e, "chunk update rolled back after persistence failure");
            return Err(e.into());
        }
        Ok(updated)
    }

    pub fn delete_chunk(&self, library_id: &str, chunk_id: &str) -> Result<()> {
        let handle = self.get_handle(library_id)?;
        let mut data = handle.write(None)?;
        let previous = data
            .chunks
            .remove(chunk_id)
            .ok_or_else(|| Error::not_found(format!("chunk {chunk_id}")))?;
        data.index.remove(chunk_id);

        if let Err(e) = self.persistence.delete_chunk(chunk_id) {
            let _ = data.index.add(chunk_id.to_string(), &previous.embedding);
            data.chunks.insert(chunk_id.to_string(), previous);
            warn!(library_id, chunk_id, error = %e, "chunk delete rolled back after persistence failure");
            return Err(e.into());
        }
        Ok(())
    }

    /// `k` is clamped to `[1, 1000]`; a request for more results than the library holds
    /// returns whatever is available.
    pub fn search(
        &self,
        library_id: &str,
        query: &[f32],
        k: usize,
        deadline: Option<Instant>,
    ) -> Result<Vec<(Chunk, f32)>> {
        let handle = self.get_handle(library_id)?;
        let data = handle.read(deadline)?;
        crate::model::validate_embedding(query, data.library.dims)?;
        let k = k.clamp(MIN_K, MAX_K);
        let hits: Vec<ScoredId> = data.index.search(query, k);
        let mut out = Vec::with_capacity(hits.len());
        for hit in hits {
            if let Some(chunk) = data.chunks.get(&hit.id) {
                out.push((chunk.clone(), hit.score));
            }
        }
        Ok(out)
    }

    /// Trains the index from every chunk currently in the library, per §4.4/§4.6.
    pub fn train(&self, library_id: &str) -> Result<()> {
        let handle = self.get_handle(library_id)?;
        let mut data = handle.write(None)?;
        let sample: Vec<(String, Vec<f32>)> = data
            .chunks
            .values()
            .map(|c| (c.id.clone(), c.embedding.clone()))
            .collect();
        data.index.train(&sample)?;
        debug!(library_id, n = sample.len(), "index trained");
        Ok(())
    }

    pub fn rebuild(&self, library_id: &str) -> Result<()> {
        let handle = self.get_handle(library_id)?;
        let mut data = handle.write(None)?;
        let sample: Vec<(String, Vec<f32>)> = data
            .chunks
            .values()
            .map(|c| (c.id.clone(), c.embedding.clone()))
            .collect();
        data.index.rebuild(&sample)?;
        debug!(library_id, n = sample.len(), "index rebuilt");
        Ok(())
    }

    pub fn stats(&self, library_id: &str) -> Result<LibraryStats> {
        let handle = self.get_handle(library_id)?;
        let data = handle.read(None)?;
        Ok(LibraryStats {
            n_documents: data.documents.len(),
            n_chunks: data.chunks.len(),
            index: data.index.stats(),
        })
    }
}
