//! LSH-SimHash index: random-hyperplane locality-sensitive hashing (SPEC_FULL.md §4.5).
//!
//! Grounded on the teacher's `dense/classic/lsh/search.rs` (hash-table-per-table bucketing,
//! candidate union, exact cosine rerank), adapted to: a seeded PRNG instead of
//! `rand::thread_rng()` (determinism is a spec requirement), the `sign(0) = 1` convention,
//! and no fallback exhaustive scan when the candidate set is empty (by design, per §4.5).

use std::collections::HashMap;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::error::Result;
use crate::index::{sort_and_truncate, IndexBackend, IndexStats};
use crate::model::{LshParams, ScoredId};

#[derive(Debug, Clone)]
pub struct LshIndex {
    pub(crate) dims: usize,
    pub(crate) params: LshParams,
    /// One hyperplane matrix per table: `n_bits` rows of `dims` components each.
    hyperplanes: Vec<Vec<Vec<f32>>>,
    /// Per table, bucket signature -> ids hashed into it.
    buckets: Vec<HashMap<u64, Vec<String>>>,
    vectors: HashMap<String, Vec<f32>>,
}

impl LshIndex {
    pub fn new(dims: usize, params: LshParams) -> Self {
        let hyperplanes = Self::sample_hyperplanes(dims, params.n_tables, params.n_bits, params.seed);
        let buckets = vec![HashMap::new(); params.n_tables];
        LshIndex {
            dims,
            params,
            hyperplanes,
            buckets,
            vectors: HashMap::new(),
        }
    }

    fn sample_hyperplanes(dims: usize, n_tables: usize, n_bits: usize, seed: u64) -> Vec<Vec<Vec<f32>>> {
        (0..n_tables)
            .map(|table_idx| {
                let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(table_idx as u64 * 0x9E3779B97F4A7C15));
                (0..n_bits)
                    .map(|_| (0..dims).map(|_| standard_normal(&mut rng)).collect())
                    .collect()
            })
            .collect()
    }

    fn signature(&self, table: usize, v: &[f32]) -> u64 {
        let mut sig: u64 = 0;
        for (bit, hyperplane) in self.hyperplanes[table].iter().enumerate() {
            let proj = crate::kernel::dot(hyperplane, v);
            if proj >= 0.0 {
                sig |= 1 << bit;
            }
        }
        sig
    }

    fn insert_into_buckets(&mut self, id: &str, v: &[f32]) {
        for table in 0..self.params.n_tables {
            let sig = self.signature(table, v);
            self.buckets[table].entry(sig).or_default().push(id.to_string());
        }
    }

    fn remove_from_buckets(&mut self, id: &str, v: &[f32]) {
        for table in 0..self.params.n_tables {
            let sig = self.signature(table, v);
            if let Some(bucket) = self.buckets[table].get_mut(&sig) {
                bucket.retain(|x| x != id);
            }
        }
    }
}

/// Box-Muller transform, avoiding a dependency on a normal-distribution crate the teacher
/// doesn't already carry.
fn standard_normal(rng: &mut ChaCha8Rng) -> f32 {
    let u1: f32 = rng.gen_range(f32::EPSILON..1.0);
    let u2: f32 = rng.gen::<f32>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f32::consts::PI * u2).cos()
}

impl IndexBackend for LshIndex {
    fn add(&mut self, id: String, embedding: &[f32]) -> Result<()> {
        self.remove(&id);
        self.insert_into_buckets(&id, embedding);
        self.vectors.insert(id, embedding.to_vec());
        Ok(())
    }

    fn remove(&mut self, id: &str) {
        if let Some(v) = self.vectors.remove(id) {
            self.remove_from_buckets(id, &v);
        }
    }

    fn train(&mut self, vectors: &[(String, Vec<f32>)]) -> Result<()> {
        self.rebuild(vectors)
    }

    fn rebuild(&mut self, vectors: &[(String, Vec<f32>)]) -> Result<()> {
        self.hyperplanes = Self::sample_hyperplanes(
            self.dims,
            self.params.n_tables,
            self.params.n_bits,
            self.params.seed,
        );
        self.buckets = vec![HashMap::new(); self.params.n_tables];
        self.vectors.clear();
        for (id, v) in vectors {
            self.add(id.clone(), v)?;
        }
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> Vec<ScoredId> {
        let mut candidates: Vec<&str> = Vec::new();
        for table in 0..self.params.n_tables {
            let sig = self.signature(table, query);
            if let Some(bucket) = self.buckets[table].get(&sig) {
                for id in bucket {
                    if !candidates.contains(&id.as_str()) {
                        candidates.push(id.as_str());
                    }
                }
            }
        }
        let scored: Vec<ScoredId> = candidates
            .into_iter()
            .filter_map(|id| {
                self.vectors.get(id).map(|v| ScoredId {
                    id: id.to_string(),
                    score: crate::kernel::cosine(query, v),
                })
            })
            .collect();
        sort_and_truncate(scored, k)
    }

    fn stats(&self) -> IndexStats {
        IndexStats {
            num_vectors: self.vectors.len(),
            dimension: self.dims,
            kind: "lsh_simhash",
            trained: true,
        }
    }

    fn len(&self) -> usize {
        self.vectors.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_finds_self_in_top_position() {
        let mut idx = LshIndex::new(8, LshParams::new(4, 8, 0).unwrap());
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut vectors = Vec::new();
        for i in 0..100 {
            let v: Vec<f32> = (0..8).map(|_| standard_normal(&mut rng)).collect();
            idx.add(format!("v{i}"), &v).unwrap();
            vectors.push(v);
        }
        let target = &vectors[42];
        let hits = idx.search(target, 5);
        assert_eq!(hits[0].id, "v42");
    }

    #[test]
    fn empty_candidate_set_returns_empty_no_fallback() {
        let idx = LshIndex::new(4, LshParams::new(1, 64, 0).unwrap());
        assert!(idx.search(&[1.0, 0.0, 0.0, 0.0], 5).is_empty());
    }

    #[test]
    fn remove_drops_from_future_results() {
        let mut idx = LshIndex::new(4, LshParams::new(2, 4, 0).unwrap());
        idx.add("a".into(), &[1.0, 0.0, 0.0, 0.0]).unwrap();
        idx.remove("a");
        assert!(idx.search(&[1.0, 0.0, 0.0, 0.0], 5).is_empty());
    }

    #[test]
    fn deterministic_hyperplanes_given_same_seed() {
        let a = LshIndex::new(4, LshParams::new(2, 4, 7).unwrap());
        let b = LshIndex::new(4, LshParams::new(2, 4, 7).unwrap());
        assert_eq!(a.hyperplanes, b.hyperplanes);
    }
}
