//! Durable storage for libraries, documents, and chunks (SPEC_FULL.md §4.7, §6.3).
//!
//! # Design Philosophy
//!
//! Grounded on the teacher's persistence layer, narrowed from a crash-safe WAL/segment/codec
//! stack to what this spec actually needs: whole-record upsert across three logical
//! collections, no global transaction, and a full-snapshot read path for recovery. The
//! backend is pluggable (`PersistenceAdapter`) exactly as the teacher's `Directory` trait is
//! pluggable; an in-memory reference implementation is provided.

pub mod adapter;
pub mod error;
pub mod memory;
pub mod record;

pub use adapter::{PersistenceAdapter, Snapshot};
pub use error::PersistenceError;
pub use memory::InMemoryPersistenceAdapter;
