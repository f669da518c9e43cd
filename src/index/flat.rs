//! Brute-force exact index (SPEC_FULL.md §4.3).
//!
//! No training step, no approximation: `search` scores every stored vector by cosine
//! similarity. Correct by construction, used as the default and as the oracle other
//! backends are checked against in tests.

use std::collections::HashMap;

use crate::error::Result;
use crate::index::{sort_and_truncate, IndexBackend, IndexStats};
use crate::model::ScoredId;

#[derive(Debug, Clone)]
pub struct FlatIndex {
    pub(crate) dims: usize,
    vectors: HashMap<String, Vec<f32>>,
}

impl FlatIndex {
    pub fn new(dims: usize) -> Self {
        FlatIndex {
            dims,
            vectors: HashMap::new(),
        }
    }
}

impl IndexBackend for FlatIndex {
    fn add(&mut self, id: String, embedding: &[f32]) -> Result<()> {
        self.vectors.insert(id, embedding.to_vec());
        Ok(())
    }

    fn remove(&mut self, id: &str) {
        self.vectors.remove(id);
    }

    fn train(&mut self, _vectors: &[(String, Vec<f32>)]) -> Result<()> {
        Ok(())
    }

    fn rebuild(&mut self, vectors: &[(String, Vec<f32>)]) -> Result<()> {
        self.vectors = vectors
            .iter()
            .map(|(id, v)| (id.clone(), v.clone()))
            .collect();
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> Vec<ScoredId> {
        let scored: Vec<ScoredId> = self
            .vectors
            .iter()
            .map(|(id, v)| ScoredId {
                id: id.clone(),
                score: crate::kernel::cosine(query, v),
            })
            .collect();
        sort_and_truncate(scored, k)
    }

    fn stats(&self) -> IndexStats {
        IndexStats {
            num_vectors: self.vectors.len(),
            dimension: self.dims,
            kind: "flat",
            trained: true,
        }
    }

    fn len(&self) -> usize {
        self.vectors.len()
    }
}
