//! Entity model: libraries, documents, chunks, and index parameter bags.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Arbitrary user metadata attached to every entity. Opaque to the store.
pub type Metadata = HashMap<String, serde_json::Value>;

/// Smallest allowed embedding dimensionality.
pub const MIN_DIMS: usize = 1;
/// Largest allowed embedding dimensionality.
pub const MAX_DIMS: usize = 65536;

/// Which index implementation backs a library. Fixed at creation; see [`IndexParams`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexKind {
    Flat,
    Ivf,
    LshSimHash,
}

/// Kind-specific index construction parameters.
///
/// The enum variant must agree with the library's [`IndexKind`]; `LibraryStore::create_library`
/// rejects a mismatch as a validation error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IndexParams {
    Flat,
    Ivf(IvfParams),
    LshSimHash(LshParams),
}

impl IndexParams {
    pub fn kind(&self) -> IndexKind {
        match self {
            IndexParams::Flat => IndexKind::Flat,
            IndexParams::Ivf(_) => IndexKind::Ivf,
            IndexParams::LshSimHash(_) => IndexKind::LshSimHash,
        }
    }
}

/// IVF cluster index parameters (SPEC_FULL.md §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IvfParams {
    pub n_clusters: usize,
    pub n_probes: usize,
    pub kmeans_iters: usize,
    pub seed: u64,
}

impl IvfParams {
    pub fn new(n_clusters: usize, n_probes: usize, seed: u64) -> Result<Self> {
        let params = IvfParams {
            n_clusters,
            n_probes,
            kmeans_iters: 20,
            seed,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        if self.n_clusters == 0 {
            return Err(Error::validation("ivf: n_clusters must be >= 1"));
        }
        if self.n_probes == 0 {
            return Err(Error::validation("ivf: n_probes must be >= 1"));
        }
        if self.n_probes > self.n_clusters {
            return Err(Error::validation("ivf: n_probes must be <= n_clusters"));
        }
        if self.kmeans_iters == 0 {
            return Err(Error::validation("ivf: kmeans_iters must be >= 1"));
        }
        Ok(())
    }
}

/// LSH-SimHash index parameters (SPEC_FULL.md §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LshParams {
    pub n_tables: usize,
    pub n_bits: usize,
    pub seed: u64,
}

impl LshParams {
    pub fn new(n_tables: usize, n_bits: usize, seed: u64) -> Result<Self> {
        let params = LshParams {
            n_tables,
            n_bits,
            seed,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        if self.n_tables == 0 {
            return Err(Error::validation("lsh: n_tables must be >= 1"));
        }
        if self.n_bits == 0 || self.n_bits > 64 {
            return Err(Error::validation("lsh: n_bits must be in [1, 64]"));
        }
        Ok(())
    }
}

/// A namespace with fixed dims and index kind containing documents, chunks, and one index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Library {
    pub id: String,
    pub name: String,
    pub dims: usize,
    pub index_kind: IndexKind,
    pub index_params: IndexParams,
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Library {
    pub fn new(name: String, dims: usize, index_params: IndexParams, metadata: Metadata) -> Result<Self> {
        if !(MIN_DIMS..=MAX_DIMS).contains(&dims) {
            return Err(Error::validation(format!(
                "dims must be in [{}, {}], got {}",
                MIN_DIMS, MAX_DIMS, dims
            )));
        }
        index_params.validate_self()?;
        let now = Utc::now();
        Ok(Library {
            id: new_id(),
            name,
            dims,
            index_kind: index_params.kind(),
            index_params,
            metadata,
            created_at: now,
            updated_at: now,
        })
    }
}

impl IndexParams {
    fn validate_self(&self) -> Result<()> {
        match self {
            IndexParams::Flat => Ok(()),
            IndexParams::Ivf(p) => p.validate(),
            IndexParams::LshSimHash(p) => p.validate(),
        }
    }
}

/// A titled grouping of chunks within exactly one library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub library_id: String,
    pub title: String,
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    pub fn new(library_id: String, title: String, metadata: Metadata) -> Self {
        let now = Utc::now();
        Document {
            id: new_id(),
            library_id,
            title,
            metadata,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A text fragment plus its embedding: the unit of indexing and retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub library_id: String,
    pub document_id: String,
    pub text: String,
    pub embedding: Vec<f32>,
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Chunk {
    pub fn new(
        library_id: String,
        document_id: String,
        text: String,
        embedding: Vec<f32>,
        metadata: Metadata,
    ) -> Self {
        let now = Utc::now();
        Chunk {
            id: new_id(),
            library_id,
            document_id,
            text,
            embedding,
            metadata,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A scored search hit: a chunk id plus its cosine similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredId {
    pub id: String,
    pub score: f32,
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Validates an embedding against a library's declared dimensionality: right length, all finite.
pub fn validate_embedding(embedding: &[f32], dims: usize) -> Result<()> {
    if embedding.len() != dims {
        return Err(Error::validation(format!(
            "embedding has {} dims, library expects {}",
            embedding.len(),
            dims
        )));
    }
    if !crate::kernel::all_finite(embedding) {
        return Err(Error::validation("embedding contains non-finite values"));
    }
    Ok(())
}
