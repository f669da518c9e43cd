//! Startup recovery: rebuild the in-memory library store from a persisted snapshot
//! (SPEC_FULL.md §4.8).
//!
//! Grounded on the teacher's `persistence::recovery::RecoveryManager` (a numbered-step
//! procedure, `Arc<dyn _>`-held backend, warnings on anything that looks wrong) but rewritten
//! for this crate's model: there is no WAL to replay (an explicit Non-goal) — recovery
//! reconstructs each library's index deterministically from its persisted chunks instead.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::model::{Chunk, Document, Library};
use crate::persistence::PersistenceAdapter;
use crate::store::handle::LibraryHandle;
use crate::store::LibraryStore;

/// Outcome of a recovery pass: which libraries came up, and which were dropped.
#[derive(Debug, Clone, Default)]
pub struct RecoveryReport {
    pub recovered_library_ids: Vec<String>,
    pub failed_library_ids: Vec<String>,
}

/// Rebuilds a [`LibraryStore`] from whatever the persistence adapter has durable.
///
/// Recovery is best-effort at two granularities (§9 design note, resolved open question):
/// within a library, an individual chunk whose persisted embedding no longer matches the
/// library's `dims` is dropped and logged rather than failing the whole library; across
/// libraries, a library whose entity or document set can't be reconstructed at all is
/// excluded but does not prevent the rest of the store from coming up. The caller is
/// expected to flip its own "serving" flag only after this returns, regardless of whether
/// any libraries failed.
///
/// Procedure:
/// 1. Load the full snapshot from the persistence adapter.
/// 2. For each persisted library, gather its documents and chunks.
/// 3. Validate every chunk's embedding against the library's declared `dims`.
/// 4. Rebuild the library's index deterministically from the valid chunks (re-running
///    `train` for IVF, hyperplane resampling for LSH — both seeded, so recovery reproduces
///    the exact pre-crash index state).
/// 5. Install the rebuilt handle into the store.
/// 6. Report which libraries made it and which did not.
pub fn recover(
    persistence: &Arc<dyn PersistenceAdapter>,
    store: &LibraryStore,
) -> Result<RecoveryReport, crate::error::Error> {
    let snapshot = persistence.load_all()?;
    let mut report = RecoveryReport::default();

    info!(n_libraries = snapshot.libraries.len(), "recovery starting");

    for library in snapshot.libraries {
        let library_id = library.id.clone();
        match recover_one(
            &library,
            snapshot.documents_by_library.get(&library_id),
            snapshot.chunks_by_library.get(&library_id),
        ) {
            Ok(handle) => {
                store.insert_handle(handle);
                report.recovered_library_ids.push(library_id.clone());
                info!(library_id = %library_id, "library recovered");
            }
            Err(e) => {
                error!(library_id = %library_id, error = %e, "library recovery failed, excluding from this session");
                report.failed_library_ids.push(library_id);
            }
        }
    }

    info!(
        recovered = report.recovered_library_ids.len(),
        failed = report.failed_library_ids.len(),
        "recovery complete"
    );
    Ok(report)
}

fn recover_one(
    library: &Library,
    documents: Option<&Vec<Document>>,
    chunks: Option<&Vec<Chunk>>,
) -> Result<LibraryHandle, crate::error::Error> {
    let documents: HashMap<String, Document> = documents
        .cloned()
        .unwrap_or_default()
        .into_iter()
        .map(|d| (d.id.clone(), d))
        .collect();

    let mut valid_chunks: HashMap<String, Chunk> = HashMap::new();
    for chunk in chunks.cloned().unwrap_or_default() {
        if let Err(e) = crate::model::validate_embedding(&chunk.embedding, library.dims) {
            warn!(
                library_id = %library.id,
                chunk_id = %chunk.id,
                error = %e,
                "dropping chunk with invalid embedding during recovery"
            );
            continue;
        }
        valid_chunks.insert(chunk.id.clone(), chunk);
    }

    Ok(LibraryHandle::from_recovered(
        library.clone(),
        documents,
        valid_chunks,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{IndexParams, Metadata};
    use crate::persistence::InMemoryPersistenceAdapter;

    #[test]
    fn recovers_library_with_matching_chunk_and_search_counts() {
        let persistence: Arc<dyn PersistenceAdapter> = Arc::new(InMemoryPersistenceAdapter::new());
        let store = LibraryStore::new(Arc::clone(&persistence));
        let lib = store
            .create_library("l".into(), 4, IndexParams::Flat, Metadata::new())
            .unwrap();
        let doc = store.create_document(&lib.id, "d".into(), Metadata::new()).unwrap();
        store
            .create_chunk(&lib.id, &doc.id, "A".into(), vec![1.0, 0.0, 0.0, 0.0], Metadata::new())
            .unwrap();

        let fresh_store = LibraryStore::new(Arc::clone(&persistence));
        let report = recover(&persistence, &fresh_store).unwrap();
        assert_eq!(report.recovered_library_ids, vec![lib.id.clone()]);
        assert_eq!(fresh_store.stats(&lib.id).unwrap().n_chunks, 1);
        assert_eq!(
            fresh_store
                .search(&lib.id, &[1.0, 0.0, 0.0, 0.0], 1, None)
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn corrupted_chunk_is_dropped_without_failing_the_library() {
        let persistence: Arc<dyn PersistenceAdapter> = Arc::new(InMemoryPersistenceAdapter::new());
        let store = LibraryStore::new(Arc::clone(&persistence));
        let good = store
            .create_library("good".into(), 4, IndexParams::Flat, Metadata::new())
            .unwrap();
        let bad = store
            .create_library("bad".into(), 4, IndexParams::Flat, Metadata::new())
            .unwrap();
        let doc = store.create_document(&bad.id, "d".into(), Metadata::new()).unwrap();
        store
            .create_chunk(&bad.id, &doc.id, "A".into(), vec![1.0, 0.0, 0.0, 0.0], Metadata::new())
            .unwrap();
        // Corrupt the persisted chunk directly via the adapter to simulate a hand-edited
        // record with the wrong dimensionality.
        let corrupt = Chunk::new(bad.id.clone(), doc.id.clone(), "bad".into(), vec![1.0, 0.0], Metadata::new());
        persistence.save_chunk(&corrupt).unwrap();

        let fresh_store = LibraryStore::new(Arc::clone(&persistence));
        let report = recover(&persistence, &fresh_store).unwrap();
        assert!(report.recovered_library_ids.contains(&good.id));
        assert!(report.recovered_library_ids.contains(&bad.id));
        // The library itself still recovers; only the malformed chunk is dropped.
        assert_eq!(fresh_store.stats(&bad.id).unwrap().n_chunks, 1);
    }
}
