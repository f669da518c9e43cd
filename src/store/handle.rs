//! A single library's live state: entity, documents, chunks, index — all behind one
//! reader/writer lock (SPEC_FULL.md §4.6).

use std::collections::HashMap;
use std::time::Instant;

use crate::error::Result;
use crate::index::VectorIndex;
use crate::model::{Chunk, Document, Library};
use crate::store::rwlock::{ReadGuard, WriteGuard, WriterPreferringRwLock};

/// Everything that changes together under one writer's critical section.
pub struct LibraryData {
    pub library: Library,
    pub documents: HashMap<String, Document>,
    pub chunks: HashMap<String, Chunk>,
    pub index: VectorIndex,
}

/// A library and the lock guarding it. Held behind `Arc` so the store-level map lock can be
/// released quickly while per-library work proceeds (§5).
pub struct LibraryHandle {
    pub id: String,
    data: WriterPreferringRwLock<LibraryData>,
}

impl LibraryHandle {
    pub fn new(library: Library) -> Self {
        let index = VectorIndex::new(library.dims, &library.index_params);
        LibraryHandle {
            id: library.id.clone(),
            data: WriterPreferringRwLock::new(LibraryData {
                library,
                documents: HashMap::new(),
                chunks: HashMap::new(),
                index,
            }),
        }
    }

    /// Reconstructs a handle directly from recovered entities, without replaying `add`.
    pub fn from_recovered(
        library: Library,
        documents: HashMap<String, Document>,
        chunks: HashMap<String, Chunk>,
    ) -> Self {
        let mut index = VectorIndex::new(library.dims, &library.index_params);
        let sample: Vec<(String, Vec<f32>)> = chunks
            .values()
            .map(|c| (c.id.clone(), c.embedding.clone()))
            .collect();
        if !sample.is_empty() {
            // `rebuild`, not `train`: Flat's `train` is a no-op by design (nothing to learn
            // for exhaustive search), so `train` alone would recover a Flat library with an
            // empty index. `rebuild` actually repopulates Flat's vector map, and is
            // equivalent to `train` for IVF/LSH when the index starts out untrained. An IVF
            // library with fewer recovered chunks than `n_clusters` comes back up untrained
            // rather than failing recovery outright.
            let _ = index.rebuild(&sample);
        }
        LibraryHandle {
            id: library.id.clone(),
            data: WriterPreferringRwLock::new(LibraryData {
                library,
                documents,
                chunks,
                index,
            }),
        }
    }

    pub fn read(&self, deadline: Option<Instant>) -> Result<ReadGuard<'_, LibraryData>> {
        self.data.read(deadline)
    }

    pub fn write(&self, deadline: Option<Instant>) -> Result<WriteGuard<'_, LibraryData>> {
        self.data.write(deadline)
    }
}
