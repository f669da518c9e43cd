//! Vector index contract and the closed set of backends that implement it.
//!
//! The index is modeled as a closed set of three variants — [`flat::FlatIndex`],
//! [`ivf::IvfIndex`], [`lsh::LshIndex`] — sharing one contract and dispatched by a kind tag,
//! not by trait objects. A library picks its variant at creation time and never changes it.

pub mod flat;
pub mod ivf;
pub mod lsh;

use crate::error::Result;
use crate::model::{IndexParams, ScoredId};

/// Statistics reported by `VectorIndex::stats`, used by the service facade's stats operation.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexStats {
    pub num_vectors: usize,
    pub dimension: usize,
    pub kind: &'static str,
    /// True once the index has enough structure to search efficiently (always true for Flat;
    /// false for IVF/LSH until `train` has run at least once).
    pub trained: bool,
}

/// Operations every index backend supports, implemented per-variant and dispatched through
/// [`VectorIndex`]'s `match`. Kept as a trait (rather than inlined into the enum) so each
/// backend's implementation can be unit-tested in isolation.
pub trait IndexBackend {
    /// Adds one vector under `id`, replacing any existing vector at that id.
    ///
    /// Flat and LSH always succeed. IVF requires a prior `train` call and returns
    /// `Err(Error::State)` otherwise (SPEC_FULL.md §4.4 "Add. Requires trained.").
    fn add(&mut self, id: String, embedding: &[f32]) -> Result<()>;

    /// Removes a vector by id. No-op (not an error) if the id is absent.
    fn remove(&mut self, id: &str);

    /// Trains the index from an explicit sample of (id, embedding) pairs — not from whatever
    /// has been `add`-ed so far. Flat ignores the sample. IVF runs k-means++ and Lloyd
    /// iterations over it and becomes searchable; fails with `Err(Error::State)` if the
    /// sample is smaller than `n_clusters`. LSH resamples its hyperplanes (a no-op in practice
    /// since hyperplanes are seed-derived) and re-hashes every vector in the sample.
    fn train(&mut self, vectors: &[(String, Vec<f32>)]) -> Result<()>;

    /// Replaces the index's contents with a full snapshot, reusing trained structure where
    /// the backend's contract allows it (IVF reassigns to existing centroids rather than
    /// retraining, per §4.4).
    fn rebuild(&mut self, vectors: &[(String, Vec<f32>)]) -> Result<()>;

    /// Returns up to `k` nearest neighbors to `query` by cosine similarity, descending by
    /// score, ties broken by ascending id.
    fn search(&self, query: &[f32], k: usize) -> Vec<ScoredId>;

    fn stats(&self) -> IndexStats;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Closed-set container over the three index backends, dispatched by matching on the variant
/// rather than through a trait object — the set of kinds is fixed and known at compile time.
#[derive(Debug, Clone)]
pub enum VectorIndex {
    Flat(flat::FlatIndex),
    Ivf(ivf::IvfIndex),
    Lsh(lsh::LshIndex),
}

impl VectorIndex {
    /// Builds an empty index matching `params` and `dims`.
    pub fn new(dims: usize, params: &IndexParams) -> Self {
        match params {
            IndexParams::Flat => VectorIndex::Flat(flat::FlatIndex::new(dims)),
            IndexParams::Ivf(p) => VectorIndex::Ivf(ivf::IvfIndex::new(dims, *p)),
            IndexParams::LshSimHash(p) => VectorIndex::Lsh(lsh::LshIndex::new(dims, *p)),
        }
    }

    pub fn add(&mut self, id: String, embedding: &[f32]) -> Result<()> {
        match self {
            VectorIndex::Flat(i) => i.add(id, embedding),
            VectorIndex::Ivf(i) => i.add(id, embedding),
            VectorIndex::Lsh(i) => i.add(id, embedding),
        }
    }

    pub fn remove(&mut self, id: &str) {
        match self {
            VectorIndex::Flat(i) => i.remove(id),
            VectorIndex::Ivf(i) => i.remove(id),
            VectorIndex::Lsh(i) => i.remove(id),
        }
    }

    pub fn train(&mut self, vectors: &[(String, Vec<f32>)]) -> Result<()> {
        match self {
            VectorIndex::Flat(i) => i.train(vectors),
            VectorIndex::Ivf(i) => i.train(vectors),
            VectorIndex::Lsh(i) => i.train(vectors),
        }
    }

    pub fn rebuild(&mut self, vectors: &[(String, Vec<f32>)]) -> Result<()> {
        match self {
            VectorIndex::Flat(i) => i.rebuild(vectors),
            VectorIndex::Ivf(i) => i.rebuild(vectors),
            VectorIndex::Lsh(i) => i.rebuild(vectors),
        }
    }

    pub fn search(&self, query: &[f32], k: usize) -> Vec<ScoredId> {
        match self {
            VectorIndex::Flat(i) => i.search(query, k),
            VectorIndex::Ivf(i) => i.search(query, k),
            VectorIndex::Lsh(i) => i.search(query, k),
        }
    }

    pub fn stats(&self) -> IndexStats {
        match self {
            VectorIndex::Flat(i) => i.stats(),
            VectorIndex::Ivf(i) => i.stats(),
            VectorIndex::Lsh(i) => i.stats(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            VectorIndex::Flat(i) => i.len(),
            VectorIndex::Ivf(i) => i.len(),
            VectorIndex::Lsh(i) => i.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs exhaustive, unindexed cosine search over the supplied vectors. Used as the
    /// reference oracle in property tests comparing index backends against brute force.
    pub fn exhaustive_search(
        vectors: &[(String, Vec<f32>)],
        query: &[f32],
        k: usize,
    ) -> Vec<ScoredId> {
        let mut scored: Vec<ScoredId> = vectors
            .iter()
            .map(|(id, v)| ScoredId {
                id: id.clone(),
                score: crate::kernel::cosine(query, v),
            })
            .collect();
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        scored.truncate(k);
        scored
    }
}

/// Ensures a `VectorIndex`'s results are returned in descending-score, ascending-id-tiebreak
/// order and truncated to at most `k`.
pub(crate) fn sort_and_truncate(mut scored: Vec<ScoredId>, k: usize) -> Vec<ScoredId> {
    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
    scored.truncate(k);
    scored
}
