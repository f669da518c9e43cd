//! Reference in-memory [`PersistenceAdapter`], sufficient for tests and for embedding this
//! crate without an external datastore (SPEC_FULL.md §4.7).
//!
//! Records are round-tripped through their serialized [`LibraryRecord`]/[`DocumentRecord`]/
//! [`ChunkRecord`] shape rather than held as live `Library`/`Document`/`Chunk` structs, so the
//! `schema` version tag (§6.3) is actually written and read back on every save/load, the same
//! guarantee a real on-disk adapter would have to provide.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::model::{Chunk, Document, Library};
use crate::persistence::adapter::{PersistenceAdapter, Snapshot};
use crate::persistence::error::{PersistenceError, PersistenceResult};
use crate::persistence::record::{ChunkRecord, DocumentRecord, LibraryRecord};

#[derive(Default)]
struct Store {
    libraries: HashMap<String, String>,
    documents: HashMap<String, String>,
    chunks: HashMap<String, String>,
}

fn encode<T: serde::Serialize>(value: &T) -> PersistenceResult<String> {
    serde_json::to_string(value).map_err(|e| PersistenceError::Backend(e.to_string()))
}

fn decode<T: serde::de::DeserializeOwned>(raw: &str) -> PersistenceResult<T> {
    serde_json::from_str(raw).map_err(|e| PersistenceError::Backend(e.to_string()))
}

pub struct InMemoryPersistenceAdapter {
    store: Mutex<Store>,
}

impl Default for InMemoryPersistenceAdapter {
    fn default() -> Self {
        InMemoryPersistenceAdapter {
            store: Mutex::new(Store::default()),
        }
    }
}

impl InMemoryPersistenceAdapter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PersistenceAdapter for InMemoryPersistenceAdapter {
    fn save_library(&self, library: &Library) -> PersistenceResult<()> {
        let record = encode(&LibraryRecord::from(library))?;
        self.store.lock().unwrap().libraries.insert(library.id.clone(), record);
        Ok(())
    }

    fn save_document(&self, document: &Document) -> PersistenceResult<()> {
        let record = encode(&DocumentRecord::from(document))?;
        self.store.lock().unwrap().documents.insert(document.id.clone(), record);
        Ok(())
    }

    fn save_chunk(&self, chunk: &Chunk) -> PersistenceResult<()> {
        let record = encode(&ChunkRecord::from(chunk))?;
        self.store.lock().unwrap().chunks.insert(chunk.id.clone(), record);
        Ok(())
    }

    fn delete_library(&self, id: &str) -> PersistenceResult<()> {
        let mut store = self.store.lock().unwrap();
        store.libraries.remove(id);
        let doc_ids: Vec<String> = store
            .documents
            .values()
            .map(|raw| decode::<DocumentRecord>(raw))
            .collect::<PersistenceResult<Vec<_>>>()?
            .into_iter()
            .filter(|d| d.library_id == id)
            .map(|d| d.id)
            .collect();
        for doc_id in doc_ids {
            store.documents.remove(&doc_id);
        }
        let chunk_ids: Vec<String> = store
            .chunks
            .values()
            .map(|raw| decode::<ChunkRecord>(raw))
            .collect::<PersistenceResult<Vec<_>>>()?
            .into_iter()
            .filter(|c| c.library_id == id)
            .map(|c| c.id)
            .collect();
        for chunk_id in chunk_ids {
            store.chunks.remove(&chunk_id);
        }
        Ok(())
    }

    fn delete_document(&self, id: &str) -> PersistenceResult<()> {
        let mut store = self.store.lock().unwrap();
        store.documents.remove(id);
        let chunk_ids: Vec<String> = store
            .chunks
            .values()
            .map(|raw| decode::<ChunkRecord>(raw))
            .collect::<PersistenceResult<Vec<_>>>()?
            .into_iter()
            .filter(|c| c.document_id == id)
            .map(|c| c.id)
            .collect();
        for chunk_id in chunk_ids {
            store.chunks.remove(&chunk_id);
        }
        Ok(())
    }

    fn delete_chunk(&self, id: &str) -> PersistenceResult<()> {
        self.store.lock().unwrap().chunks.remove(id);
        Ok(())
    }

    fn load_all(&self) -> PersistenceResult<Snapshot> {
        let store = self.store.lock().unwrap();
        let libraries: Vec<Library> = store
            .libraries
            .values()
            .map(|raw| decode::<LibraryRecord>(raw).map(Library::from))
            .collect::<PersistenceResult<Vec<_>>>()?;

        let mut documents_by_library: HashMap<String, Vec<Document>> = HashMap::new();
        for raw in store.documents.values() {
            let doc: Document = decode::<DocumentRecord>(raw)?.into();
            documents_by_library.entry(doc.library_id.clone()).or_default().push(doc);
        }

        let mut chunks_by_library: HashMap<String, Vec<Chunk>> = HashMap::new();
        for raw in store.chunks.values() {
            let chunk: Chunk = decode::<ChunkRecord>(raw)?.into();
            chunks_by_library.entry(chunk.library_id.clone()).or_default().push(chunk);
        }

        Ok(Snapshot {
            libraries,
            documents_by_library,
            chunks_by_library,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{IndexParams, Metadata};

    #[test]
    fn delete_library_cascades_to_documents_and_chunks() {
        let adapter = InMemoryPersistenceAdapter::new();
        let lib = Library::new("l".into(), 2, IndexParams::Flat, Metadata::new()).unwrap();
        adapter.save_library(&lib).unwrap();
        let doc = Document::new(lib.id.clone(), "d".into(), Metadata::new());
        adapter.save_document(&doc).unwrap();
        let chunk = Chunk::new(
            lib.id.clone(),
            doc.id.clone(),
            "t".into(),
            vec![1.0, 0.0],
            Metadata::new(),
        );
        adapter.save_chunk(&chunk).unwrap();

        adapter.delete_library(&lib.id).unwrap();
        let snapshot = adapter.load_all().unwrap();
        assert!(snapshot.libraries.is_empty());
        assert!(snapshot.documents_by_library.is_empty());
        assert!(snapshot.chunks_by_library.is_empty());
    }

    #[test]
    fn delete_document_cascades_to_its_chunks_only() {
        let adapter = InMemoryPersistenceAdapter::new();
        let lib = Library::new("l".into(), 2, IndexParams::Flat, Metadata::new()).unwrap();
        adapter.save_library(&lib).unwrap();
        let doc1 = Document::new(lib.id.clone(), "d1".into(), Metadata::new());
        let doc2 = Document::new(lib.id.clone(), "d2".into(), Metadata::new());
        adapter.save_document(&doc1).unwrap();
        adapter.save_document(&doc2).unwrap();
        let c1 = Chunk::new(lib.id.clone(), doc1.id.clone(), "a".into(), vec![1.0, 0.0], Metadata::new());
        let c2 = Chunk::new(lib.id.clone(), doc2.id.clone(), "b".into(), vec![0.0, 1.0], Metadata::new());
        adapter.save_chunk(&c1).unwrap();
        adapter.save_chunk(&c2).unwrap();

        adapter.delete_document(&doc1.id).unwrap();
        let snapshot = adapter.load_all().unwrap();
        let remaining_chunks = &snapshot.chunks_by_library[&lib.id];
        assert_eq!(remaining_chunks.len(), 1);
        assert_eq!(remaining_chunks[0].id, c2.id);
    }
}
