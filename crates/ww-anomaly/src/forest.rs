//! Isolation forest.
//!
//! Each of `n_estimators` trees is grown on a bootstrap sample (drawn with
//! replacement) of at most [`MAX_SAMPLES`] feature vectors.  Internal nodes
//! pick a random feature and a uniform random split between that feature's
//! min and max within the node; instances that are easy to isolate end up
//! with short paths.  An instance's score is
//!
//!   s(x) = 2 ^ ( − E[path(x)] / c(sample_size) )
//!
//! where `c(n)` is the average path length of an unsuccessful BST search —
//! the usual normalization, so scores land in (0, 1) with higher = more
//! anomalous.
//!
//! # Determinism
//!
//! Tree `i` draws every random decision from `RunRng::tree_rng(i)`.  Seeds
//! are derived up front, so fitting with `rayon` yields the same forest at
//! any thread count.

use rand::Rng;
use rand::rngs::SmallRng;
use rayon::prelude::*;

use ww_core::RunRng;

/// Cap on the per-tree sample size (full data is used below this).
pub const MAX_SAMPLES: usize = 256;

/// Euler–Mascheroni constant, for the harmonic-number approximation in `c(n)`.
const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

// ── Tree storage ──────────────────────────────────────────────────────────────

/// Arena-allocated node; children refer to positions in the tree's `nodes`.
enum Node {
    Internal { feature: usize, split: f64, left: usize, right: usize },
    Leaf { size: usize },
}

struct Tree {
    nodes: Vec<Node>,
}

// ── Forest ────────────────────────────────────────────────────────────────────

/// A fitted ensemble of isolation trees.
pub struct IsolationForest {
    trees:       Vec<Tree>,
    sample_size: usize,
}

impl IsolationForest {
    /// Fit `n_estimators` trees on `data` (one feature vector per row).
    ///
    /// `data` must be non-empty, rectangular, and free of NaN — the engine
    /// imputes before fitting.  Tree growth runs on the Rayon pool.
    pub fn fit(data: &[Vec<f64>], n_estimators: usize, rng: RunRng) -> Self {
        assert!(!data.is_empty(), "isolation forest requires at least one row");

        let sample_size = data.len().min(MAX_SAMPLES);
        let depth_cap = (sample_size as f64).log2().ceil().max(1.0) as usize;

        let trees: Vec<Tree> = (0..n_estimators as u64)
            .into_par_iter()
            .map(|i| {
                let mut tree_rng = rng.tree_rng(i);
                grow_tree(data, sample_size, depth_cap, &mut tree_rng)
            })
            .collect();

        Self { trees, sample_size }
    }

    /// Anomaly score for one feature vector; higher = more anomalous.
    pub fn score(&self, x: &[f64]) -> f64 {
        let norm = average_path_length(self.sample_size);
        if norm == 0.0 {
            // Sample size 1: every path is empty.  Score the neutral 0.5
            // instead of dividing zero by zero.
            return 0.5;
        }
        let total: f64 = self.trees.iter().map(|t| path_length(t, x)).sum();
        let avg = total / self.trees.len() as f64;
        2f64.powf(-avg / norm)
    }

    /// Score every row of `data`.
    pub fn score_all(&self, data: &[Vec<f64>]) -> Vec<f64> {
        data.iter().map(|x| self.score(x)).collect()
    }
}

// ── Growth ────────────────────────────────────────────────────────────────────

fn grow_tree(data: &[Vec<f64>], sample_size: usize, depth_cap: usize, rng: &mut SmallRng) -> Tree {
    // Bootstrap: sample_size draws with replacement from the full table.
    let sample: Vec<usize> = (0..sample_size)
        .map(|_| rng.gen_range(0..data.len()))
        .collect();

    let mut tree = Tree { nodes: Vec::new() };
    split_node(data, sample, 0, depth_cap, rng, &mut tree);
    tree
}

/// Recursively split `indices`, appending nodes to the arena.  Returns the
/// index of the node created for this subset.
fn split_node(
    data: &[Vec<f64>],
    indices: Vec<usize>,
    depth: usize,
    depth_cap: usize,
    rng: &mut SmallRng,
    tree: &mut Tree,
) -> usize {
    if depth >= depth_cap || indices.len() <= 1 {
        tree.nodes.push(Node::Leaf { size: indices.len() });
        return tree.nodes.len() - 1;
    }

    let n_features = data[0].len();
    let feature = rng.gen_range(0..n_features);

    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for &i in &indices {
        let v = data[i][feature];
        lo = lo.min(v);
        hi = hi.max(v);
    }
    if lo >= hi {
        // Constant feature within this node; nothing to split on.
        tree.nodes.push(Node::Leaf { size: indices.len() });
        return tree.nodes.len() - 1;
    }

    let split = rng.gen_range(lo..hi);
    let (left_idx, right_idx): (Vec<usize>, Vec<usize>) =
        indices.into_iter().partition(|&i| data[i][feature] < split);

    if left_idx.is_empty() || right_idx.is_empty() {
        // `gen_range` can land exactly on `lo`; treat as unsplittable.
        let size = left_idx.len() + right_idx.len();
        tree.nodes.push(Node::Leaf { size });
        return tree.nodes.len() - 1;
    }

    // Reserve this node's slot before recursing so children land after it.
    let slot = tree.nodes.len();
    tree.nodes.push(Node::Leaf { size: 0 }); // placeholder
    let left = split_node(data, left_idx, depth + 1, depth_cap, rng, tree);
    let right = split_node(data, right_idx, depth + 1, depth_cap, rng, tree);
    tree.nodes[slot] = Node::Internal { feature, split, left, right };
    slot
}

// ── Scoring ───────────────────────────────────────────────────────────────────

fn path_length(tree: &Tree, x: &[f64]) -> f64 {
    let mut node = 0;
    let mut depth = 0usize;
    loop {
        match tree.nodes[node] {
            Node::Leaf { size } => return depth as f64 + average_path_length(size),
            Node::Internal { feature, split, left, right } => {
                node = if x[feature] < split { left } else { right };
                depth += 1;
            }
        }
    }
}

/// `c(n)`: expected path length of an unsuccessful BST search over `n` items.
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        n => {
            let m = n as f64;
            2.0 * ((m - 1.0).ln() + EULER_GAMMA) - 2.0 * (m - 1.0) / m
        }
    }
}

#[cfg(test)]
mod unit {
    use super::average_path_length;

    #[test]
    fn path_normalization_anchors() {
        assert_eq!(average_path_length(0), 0.0);
        assert_eq!(average_path_length(1), 0.0);
        assert_eq!(average_path_length(2), 1.0);
        // c(256) ≈ 10.24 — the usual normalizer for the default sample size
        let c = average_path_length(256);
        assert!((c - 10.244).abs() < 0.01, "got {c}");
    }
}
