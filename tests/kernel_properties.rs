//! Property tests over the vector kernel and the index backends' round-trip/idempotence
//! guarantees (SPEC_FULL.md §8).

use proptest::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use vectordb_core::index::flat::FlatIndex;
use vectordb_core::index::ivf::IvfIndex;
use vectordb_core::index::lsh::LshIndex;
use vectordb_core::index::{IndexBackend, VectorIndex};
use vectordb_core::kernel::cosine;
use vectordb_core::model::{IvfParams, LshParams};

fn finite_vec(dims: usize) -> impl Strategy<Value = Vec<f32>> {
    prop::collection::vec(-100.0f32..100.0, dims)
}

proptest! {
    #[test]
    fn cosine_is_symmetric(a in finite_vec(6), b in finite_vec(6)) {
        let ab = cosine(&a, &b);
        let ba = cosine(&b, &a);
        prop_assert!((ab - ba).abs() < 1e-4);
    }

    #[test]
    fn cosine_is_bounded(a in finite_vec(6), b in finite_vec(6)) {
        let s = cosine(&a, &b);
        prop_assert!(s >= -1.0001 && s <= 1.0001);
    }

    #[test]
    fn cosine_of_identical_nonzero_vector_is_one(a in finite_vec(6).prop_filter(
        "nonzero",
        |v| v.iter().any(|x| x.abs() > 1e-3),
    )) {
        let s = cosine(&a, &a);
        prop_assert!((s - 1.0).abs() < 1e-3);
    }
}

/// `rebuild` is a fixed point: two consecutive rebuilds on an unchanged snapshot produce
/// identical index state.
#[test]
fn flat_rebuild_is_a_fixed_point() {
    let sample: Vec<(String, Vec<f32>)> = vec![
        ("a".into(), vec![1.0, 0.0, 0.0]),
        ("b".into(), vec![0.0, 1.0, 0.0]),
        ("c".into(), vec![0.0, 0.0, 1.0]),
    ];
    let mut idx = FlatIndex::new(3);
    idx.rebuild(&sample).unwrap();
    let first = idx.search(&[1.0, 1.0, 1.0], 3);
    idx.rebuild(&sample).unwrap();
    let second = idx.search(&[1.0, 1.0, 1.0], 3);
    assert_eq!(first, second);
}

#[test]
fn ivf_rebuild_is_a_fixed_point() {
    let sample: Vec<(String, Vec<f32>)> = (0..20)
        .map(|i| {
            let angle = i as f32 * 0.3;
            (format!("v{i}"), vec![angle.cos(), angle.sin()])
        })
        .collect();
    let mut idx = IvfIndex::new(2, IvfParams::new(3, 3, 11).unwrap());
    idx.train(&sample).unwrap();
    let first = idx.search(&[1.0, 0.0], 5);
    idx.rebuild(&sample).unwrap();
    let second = idx.search(&[1.0, 0.0], 5);
    assert_eq!(first, second);
}

/// FLAT always returns the globally optimal top-k by cosine similarity.
#[test]
fn flat_search_matches_brute_force_oracle() {
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let sample: Vec<(String, Vec<f32>)> = (0..200)
        .map(|i| (format!("v{i}"), (0..16).map(|_| rng.gen_range(-1.0..1.0)).collect()))
        .collect();
    let mut idx = FlatIndex::new(16);
    for (id, v) in &sample {
        idx.add(id.clone(), v).unwrap();
    }
    let query: Vec<f32> = (0..16).map(|_| rng.gen_range(-1.0..1.0)).collect();

    let got = idx.search(&query, 10);
    let want = VectorIndex::exhaustive_search(&sample, &query, 10);
    assert_eq!(got, want);
}

/// IVF with `n_probes == n_clusters` must match FLAT's result over the same data, since every
/// cluster is scanned and no recall is traded away.
#[test]
fn ivf_with_full_probes_matches_flat() {
    let mut rng = ChaCha8Rng::seed_from_u64(9);
    let sample: Vec<(String, Vec<f32>)> = (0..100)
        .map(|i| (format!("v{i}"), (0..8).map(|_| rng.gen_range(-1.0..1.0)).collect()))
        .collect();

    let mut flat = FlatIndex::new(8);
    for (id, v) in &sample {
        flat.add(id.clone(), v).unwrap();
    }
    let mut ivf = IvfIndex::new(8, IvfParams::new(5, 5, 4).unwrap());
    ivf.train(&sample).unwrap();

    let query: Vec<f32> = (0..8).map(|_| rng.gen_range(-1.0..1.0)).collect();
    let flat_hits = flat.search(&query, 10);
    let ivf_hits = ivf.search(&query, 10);
    let flat_ids: Vec<&str> = flat_hits.iter().map(|h| h.id.as_str()).collect();
    let ivf_ids: Vec<&str> = ivf_hits.iter().map(|h| h.id.as_str()).collect();
    assert_eq!(flat_ids, ivf_ids);
}

/// LSH recall@k over a synthetic clustered dataset exceeds 0.8 with default-shaped
/// parameters, using a fixed seed so the property is deterministic.
#[test]
fn lsh_recall_at_k_exceeds_threshold_on_clustered_data() {
    let mut rng = ChaCha8Rng::seed_from_u64(123);
    let dims = 32;
    let n = 300;
    let k = 10;

    // Cluster the synthetic corpus around a handful of centers so near-duplicates exist,
    // which is the regime LSH is meant to perform well in.
    let centers: Vec<Vec<f32>> = (0..6)
        .map(|_| (0..dims).map(|_| rng.gen_range(-1.0..1.0)).collect())
        .collect();
    let sample: Vec<(String, Vec<f32>)> = (0..n)
        .map(|i| {
            let c = &centers[i % centers.len()];
            let v: Vec<f32> = c.iter().map(|x| x + rng.gen_range(-0.05..0.05)).collect();
            (format!("v{i}"), v)
        })
        .collect();

    let mut lsh = LshIndex::new(dims, LshParams::new(8, 12, 42).unwrap());
    for (id, v) in &sample {
        lsh.add(id.clone(), v).unwrap();
    }

    let mut hits_at_k = 0usize;
    let mut queries = 0usize;
    for i in (0..n).step_by(7) {
        let (_, query) = &sample[i];
        let oracle = VectorIndex::exhaustive_search(&sample, query, k);
        let oracle_ids: std::collections::HashSet<&str> =
            oracle.iter().map(|h| h.id.as_str()).collect();
        let got = lsh.search(query, k);
        let overlap = got.iter().filter(|h| oracle_ids.contains(h.id.as_str())).count();
        hits_at_k += overlap;
        queries += 1;
    }
    let recall = hits_at_k as f32 / (queries * k) as f32;
    assert!(recall > 0.8, "recall@{k} was {recall}, expected > 0.8");
}
