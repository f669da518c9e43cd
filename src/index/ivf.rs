//! Inverted-file (IVF) index: k-means clusters plus posting lists (SPEC_FULL.md §4.4).
//!
//! Grounded on the k-means++ seeding and Lloyd-iteration core of the teacher's
//! `dense/classic/trees/kmeans_tree.rs`, but flattened to a single level of clusters (the
//! teacher's version is a recursive hierarchy) and extended with the empty-cluster
//! re-seeding and 1e-4 convergence threshold the spec requires and the teacher's tree did not
//! implement.

use std::collections::HashMap;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::error::{Error, Result};
use crate::index::{sort_and_truncate, IndexBackend, IndexStats};
use crate::kernel::normalize;
use crate::model::{IvfParams, ScoredId};

const CONVERGENCE_THRESHOLD: f32 = 1e-4;

#[derive(Debug, Clone)]
pub struct IvfIndex {
    pub(crate) dims: usize,
    pub(crate) params: IvfParams,
    trained: bool,
    /// Unit-normalized cluster centers, used for assignment; `centers.len() == n_clusters`
    /// once trained.
    centers: Vec<Vec<f32>>,
    /// Raw (non-normalized) vectors as given by the caller, keyed by id.
    vectors: HashMap<String, Vec<f32>>,
    /// cluster index -> ids assigned to it.
    postings: Vec<Vec<String>>,
    /// id -> cluster index, kept so `add`/`remove` can find an id's posting list in O(1).
    assignment: HashMap<String, usize>,
}

impl IvfIndex {
    pub fn new(dims: usize, params: IvfParams) -> Self {
        IvfIndex {
            dims,
            params,
            trained: false,
            centers: Vec::new(),
            vectors: HashMap::new(),
            postings: Vec::new(),
            assignment: HashMap::new(),
        }
    }

    /// Nearest center to `normalized_v` by cosine (equivalently dot, since both are unit
    /// vectors); ties broken by lowest cluster index.
    fn nearest_center(&self, normalized_v: &[f32]) -> usize {
        let mut best = 0;
        let mut best_sim = f32::NEG_INFINITY;
        for (i, c) in self.centers.iter().enumerate() {
            let sim = crate::kernel::dot(normalized_v, c);
            if sim > best_sim {
                best_sim = sim;
                best = i;
            }
        }
        best
    }

    fn assign_all(&mut self) {
        self.postings = vec![Vec::new(); self.centers.len()];
        self.assignment.clear();
        let ids: Vec<String> = self.vectors.keys().cloned().collect();
        for id in ids {
            let v = &self.vectors[&id];
            let n = normalize(v);
            let cluster = self.nearest_center(&n);
            self.postings[cluster].push(id.clone());
            self.assignment.insert(id, cluster);
        }
    }

    fn kmeans_plus_plus_init(normalized: &[Vec<f32>], k: usize, seed: u64) -> Vec<Vec<f32>> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let n = normalized.len();
        let mut centers: Vec<Vec<f32>> = Vec::with_capacity(k);
        centers.push(normalized[rng.gen_range(0..n)].clone());
        while centers.len() < k {
            let dists: Vec<f32> = normalized
                .iter()
                .map(|v| {
                    centers
                        .iter()
                        .map(|c| 1.0 - crate::kernel::dot(v, c))
                        .fold(f32::INFINITY, f32::min)
                })
                .collect();
            let total: f32 = dists.iter().sum();
            let chosen = if total <= 0.0 {
                rng.gen_range(0..n)
            } else {
                let mut r = rng.gen::<f32>() * total;
                let mut idx = n - 1;
                for (i, d) in dists.iter().enumerate() {
                    if r <= *d {
                        idx = i;
                        break;
                    }
                    r -= d;
                }
                idx
            };
            centers.push(normalized[chosen].clone());
        }
        centers
    }

    /// Lloyd iterations with empty-cluster re-seeding and a convergence threshold on max
    /// centroid shift, per §4.4.
    fn lloyd(normalized: &[Vec<f32>], mut centers: Vec<Vec<f32>>, max_iters: usize) -> Vec<Vec<f32>> {
        let k = centers.len();
        for _ in 0..max_iters {
            let mut members: Vec<Vec<usize>> = vec![Vec::new(); k];
            for (i, v) in normalized.iter().enumerate() {
                let mut best = 0;
                let mut best_sim = f32::NEG_INFINITY;
                for (c_idx, c) in centers.iter().enumerate() {
                    let sim = crate::kernel::dot(v, c);
                    if sim > best_sim {
                        best_sim = sim;
                        best = c_idx;
                    }
                }
                members[best].push(i);
            }

            // Empty-cluster re-seeding: farthest point of the largest cluster becomes the
            // new center for each empty cluster.
            for empty_idx in 0..k {
                if !members[empty_idx].is_empty() {
                    continue;
                }
                let (largest_idx, _) = members
                    .iter()
                    .enumerate()
                    .max_by_key(|(_, m)| m.len())
                    .unwrap();
                if members[largest_idx].len() <= 1 {
                    continue;
                }
                let farthest = *members[largest_idx]
                    .iter()
                    .max_by(|&&a, &&b| {
                        let da = crate::kernel::dot(&normalized[a], &centers[largest_idx]);
                        let db = crate::kernel::dot(&normalized[b], &centers[largest_idx]);
                        da.partial_cmp(&db).unwrap().reverse()
                    })
                    .unwrap();
                members[largest_idx].retain(|&x| x != farthest);
                members[empty_idx].push(farthest);
            }

            let mut new_centers = Vec::with_capacity(k);
            let mut max_shift: f32 = 0.0;
            for (c_idx, member_idxs) in members.iter().enumerate() {
                let new_center = if member_idxs.is_empty() {
                    centers[c_idx].clone()
                } else {
                    let mut sum = vec![0.0f32; centers[c_idx].len()];
                    for &i in member_idxs {
                        for (s, x) in sum.iter_mut().zip(normalized[i].iter()) {
                            *s += x;
                        }
                    }
                    normalize(&sum)
                };
                let shift = crate::kernel::norm(
                    &new_center
                        .iter()
                        .zip(centers[c_idx].iter())
                        .map(|(a, b)| a - b)
                        .collect::<Vec<f32>>(),
                );
                max_shift = max_shift.max(shift);
                new_centers.push(new_center);
            }
            centers = new_centers;
            if max_shift < CONVERGENCE_THRESHOLD {
                break;
            }
        }
        centers
    }
}

impl IndexBackend for IvfIndex {
    fn add(&mut self, id: String, embedding: &[f32]) -> Result<()> {
        if !self.trained {
            return Err(Error::state(
                "ivf: cannot add before the index is trained",
            ));
        }
        self.remove(&id);
        let n = normalize(embedding);
        let cluster = self.nearest_center(&n);
        self.vectors.insert(id.clone(), embedding.to_vec());
        self.postings[cluster].push(id.clone());
        self.assignment.insert(id, cluster);
        Ok(())
    }

    fn remove(&mut self, id: &str) {
        if let Some(cluster) = self.assignment.remove(id) {
            if let Some(list) = self.postings.get_mut(cluster) {
                list.retain(|x| x != id);
            }
        }
        self.vectors.remove(id);
    }

    fn train(&mut self, vectors: &[(String, Vec<f32>)]) -> Result<()> {
        if vectors.len() < self.params.n_clusters {
            return Err(Error::state(format!(
                "ivf: insufficient data to train: need at least {} samples, got {}",
                self.params.n_clusters,
                vectors.len()
            )));
        }
        let normalized: Vec<Vec<f32>> = vectors.iter().map(|(_, v)| normalize(v)).collect();
        let init = Self::kmeans_plus_plus_init(&normalized, self.params.n_clusters, self.params.seed);
        self.centers = Self::lloyd(&normalized, init, self.params.kmeans_iters);

        self.vectors = vectors
            .iter()
            .map(|(id, v)| (id.clone(), v.clone()))
            .collect();
        self.assign_all();
        self.trained = true;
        Ok(())
    }

    fn rebuild(&mut self, vectors: &[(String, Vec<f32>)]) -> Result<()> {
        if self.trained {
            self.vectors = vectors
                .iter()
                .map(|(id, v)| (id.clone(), v.clone()))
                .collect();
            self.assign_all();
            Ok(())
        } else {
            self.train(vectors)
        }
    }

    fn search(&self, query: &[f32], k: usize) -> Vec<ScoredId> {
        if !self.trained || self.centers.is_empty() {
            return Vec::new();
        }
        let nq = normalize(query);
        let mut centroid_order: Vec<usize> = (0..self.centers.len()).collect();
        centroid_order.sort_by(|&a, &b| {
            let sa = crate::kernel::dot(&nq, &self.centers[a]);
            let sb = crate::kernel::dot(&nq, &self.centers[b]);
            sb.partial_cmp(&sa).unwrap().then(a.cmp(&b))
        });
        let probes = self.params.n_probes.min(self.centers.len());

        let mut scored = Vec::new();
        for &cluster in centroid_order.iter().take(probes) {
            for id in &self.postings[cluster] {
                if let Some(v) = self.vectors.get(id) {
                    scored.push(ScoredId {
                        id: id.clone(),
                        score: crate::kernel::cosine(query, v),
                    });
                }
            }
        }
        sort_and_truncate(scored, k)
    }

    fn stats(&self) -> IndexStats {
        IndexStats {
            num_vectors: self.vectors.len(),
            dimension: self.dims,
            kind: "ivf",
            trained: self.trained,
        }
    }

    fn len(&self) -> usize {
        self.vectors.len()
    }
}
