//! Embedding storage, k-NN indexing, and durable recovery for a vector database.
//!
//! A library is a namespace with a fixed embedding dimensionality and exactly one index kind
//! (flat, IVF, or LSH-SimHash), holding documents and the chunks that belong to them. Mutations
//! to a library's documents, chunks, and index happen under one reader/writer lock per library
//! (writer-preferring, so a backed-up stream of readers cannot starve a pending write), and are
//! durably recorded through a pluggable [`persistence::PersistenceAdapter`] before they are
//! acknowledged to the caller.
//!
//! # Layout
//!
//! - [`model`] — entities: [`model::Library`], [`model::Document`], [`model::Chunk`], index
//!   parameter bags.
//! - [`index`] — the three index backends behind the [`index::IndexBackend`] contract, closed
//!   over by [`index::VectorIndex`].
//! - [`store`] — [`store::LibraryStore`]: the concurrency- and persistence-aware operations
//!   over libraries, documents, and chunks.
//! - [`persistence`] — the storage seam and its in-memory reference implementation.
//! - [`recovery`] — rebuilds a [`store::LibraryStore`] from a persisted snapshot at startup.
//! - [`service`] — [`service::Service`]: the facade a front door (HTTP, gRPC, embedded) is
//!   built against.
//! - [`config`] — typed, env-var-driven configuration for a host process.
//! - [`kernel`] — vector arithmetic primitives (dot product, norm, cosine similarity).
//! - [`error`] — the crate-wide error taxonomy.
//!
//! # Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use vectordb_core::model::{IndexParams, Metadata};
//! use vectordb_core::persistence::InMemoryPersistenceAdapter;
//! use vectordb_core::service::Service;
//!
//! let service = Service::start(Arc::new(InMemoryPersistenceAdapter::new()))?;
//! let library = service.create_library("docs".into(), 4, IndexParams::Flat, Metadata::new())?;
//! let doc = service.create_document(&library.id, "readme".into(), Metadata::new(), None)?;
//! service.create_chunk(
//!     &library.id,
//!     &doc.id,
//!     "hello world".into(),
//!     vec![1.0, 0.0, 0.0, 0.0],
//!     Metadata::new(),
//!     None,
//! )?;
//! let hits = service.search(&library.id, &[1.0, 0.0, 0.0, 0.0], 1, None)?;
//! assert_eq!(hits.len(), 1);
//! # Ok::<(), vectordb_core::error::Error>(())
//! ```

pub mod config;
pub mod error;
pub mod index;
pub mod kernel;
pub mod model;
pub mod persistence;
pub mod recovery;
pub mod service;
pub mod store;

/// Re-exports of the types most callers need, mirroring the layout other `rank-*` crates use
/// for their own `prelude` modules.
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Error, ErrorKind, Result};
    pub use crate::model::{
        Chunk, Document, IndexKind, IndexParams, IvfParams, Library, LshParams, Metadata, ScoredId,
    };
    pub use crate::persistence::{InMemoryPersistenceAdapter, PersistenceAdapter};
    pub use crate::recovery::{recover, RecoveryReport};
    pub use crate::service::Service;
    pub use crate::store::{LibraryStats, LibraryStore};
}
