//! Recovery against a shared persistence adapter across two independent `LibraryStore`
//! instances, simulating a process restart (SPEC_FULL.md §8 scenario 5, §4.8).

use std::sync::Arc;

use vectordb_core::model::{IndexParams, IvfParams, Metadata};
use vectordb_core::persistence::{InMemoryPersistenceAdapter, PersistenceAdapter};
use vectordb_core::recovery::recover;
use vectordb_core::store::LibraryStore;

mod common;

#[test]
fn recovery_rebuilds_flat_library_index_from_chunks() {
    common::init_tracing();
    let persistence: Arc<dyn PersistenceAdapter> = Arc::new(InMemoryPersistenceAdapter::new());
    let store = LibraryStore::new(Arc::clone(&persistence));
    let lib = store
        .create_library("l".into(), 4, IndexParams::Flat, Metadata::new())
        .unwrap();
    let doc = store.create_document(&lib.id, "d".into(), Metadata::new()).unwrap();
    for (text, v) in [
        ("A", vec![1.0, 0.0, 0.0, 0.0]),
        ("B", vec![0.0, 1.0, 0.0, 0.0]),
        ("C", vec![0.9, 0.1, 0.0, 0.0]),
    ] {
        store
            .create_chunk(&lib.id, &doc.id, text.into(), v, Metadata::new())
            .unwrap();
    }

    let fresh = LibraryStore::new(Arc::clone(&persistence));
    let report = recover(&persistence, &fresh).unwrap();
    assert_eq!(report.recovered_library_ids, vec![lib.id.clone()]);
    assert!(report.failed_library_ids.is_empty());

    let hits = fresh.search(&lib.id, &[1.0, 0.0, 0.0, 0.0], 2, None).unwrap();
    let texts: Vec<&str> = hits.iter().map(|(c, _)| c.text.as_str()).collect();
    assert_eq!(texts, vec!["A", "C"]);
}

/// An IVF library that was trained before the crash recovers already trained and searchable,
/// since `from_recovered` reruns the same seeded training deterministically.
#[test]
fn recovery_retrains_ivf_library_deterministically() {
    common::init_tracing();
    let persistence: Arc<dyn PersistenceAdapter> = Arc::new(InMemoryPersistenceAdapter::new());
    let store = LibraryStore::new(Arc::clone(&persistence));
    let lib = store
        .create_library(
            "l".into(),
            2,
            IndexParams::Ivf(IvfParams::new(2, 2, 7).unwrap()),
            Metadata::new(),
        )
        .unwrap();
    // Directly seed the persisted chunk records (bypassing the store's own create_chunk,
    // which an untrained IVF index would reject) to simulate chunks that existed at the time
    // of a prior successful bulk load + train, before the crash this test recovers from.
    let doc = vectordb_core::model::Document::new(lib.id.clone(), "d".into(), Metadata::new());
    persistence.save_document(&doc).unwrap();
    for (text, v) in [
        ("a", vec![1.0, 0.0]),
        ("b", vec![0.0, 1.0]),
        ("c", vec![0.9, 0.1]),
    ] {
        let chunk = vectordb_core::model::Chunk::new(lib.id.clone(), doc.id.clone(), text.into(), v, Metadata::new());
        persistence.save_chunk(&chunk).unwrap();
    }

    let first = LibraryStore::new(Arc::clone(&persistence));
    recover(&persistence, &first).unwrap();
    let first_hits = first.search(&lib.id, &[1.0, 0.0], 3, None).unwrap();

    let second = LibraryStore::new(Arc::clone(&persistence));
    recover(&persistence, &second).unwrap();
    let second_hits = second.search(&lib.id, &[1.0, 0.0], 3, None).unwrap();

    let first_ids: Vec<&str> = first_hits.iter().map(|(c, _)| c.id.as_str()).collect();
    let second_ids: Vec<&str> = second_hits.iter().map(|(c, _)| c.id.as_str()).collect();
    assert_eq!(first_ids, second_ids);
    assert_eq!(first.stats(&lib.id).unwrap().index.trained, true);
}

/// A library whose persisted chunk has an embedding of the wrong dimensionality (simulating
/// a hand-edited or corrupted record) is dropped from the library during recovery without
/// failing the library or any sibling library.
#[test]
fn recovery_drops_corrupt_chunk_without_failing_its_library_or_others() {
    common::init_tracing();
    let persistence: Arc<dyn PersistenceAdapter> = Arc::new(InMemoryPersistenceAdapter::new());
    let store = LibraryStore::new(Arc::clone(&persistence));
    let sibling = store
        .create_library("sibling".into(), 4, IndexParams::Flat, Metadata::new())
        .unwrap();
    let lib = store
        .create_library("l".into(), 4, IndexParams::Flat, Metadata::new())
        .unwrap();
    let doc = store.create_document(&lib.id, "d".into(), Metadata::new()).unwrap();
    store
        .create_chunk(&lib.id, &doc.id, "good".into(), vec![1.0, 0.0, 0.0, 0.0], Metadata::new())
        .unwrap();
    let corrupt = vectordb_core::model::Chunk::new(
        lib.id.clone(),
        doc.id.clone(),
        "corrupt".into(),
        vec![1.0, 0.0], // wrong dims for a 4-dim library
        Metadata::new(),
    );
    persistence.save_chunk(&corrupt).unwrap();

    let fresh = LibraryStore::new(Arc::clone(&persistence));
    let report = recover(&persistence, &fresh).unwrap();
    assert!(report.recovered_library_ids.contains(&lib.id));
    assert!(report.recovered_library_ids.contains(&sibling.id));
    assert_eq!(fresh.stats(&lib.id).unwrap().n_chunks, 1);
}
