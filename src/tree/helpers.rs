//! Helper functions for tree building algorithms.
//!
//! Trees are grown over row indices into the caller's feature matrix, with
//! labels remapped to dense class indices `0..n_classes` so per-node class
//! counts are plain vectors.

use rand::rngs::StdRng;
use rand::seq::index;

use super::{Leaf, Node, TreeNode};
use crate::primitives::Matrix;

/// Calculate Gini impurity for a set of labels.
///
/// Formula: Gini = 1 - `Σ(p_i²)` where `p_i` is the proportion of class i
#[must_use]
pub fn gini_impurity(labels: &[usize]) -> f32 {
    let mut counts = std::collections::BTreeMap::new();
    for &label in labels {
        *counts.entry(label).or_insert(0usize) += 1;
    }
    let counts: Vec<usize> = counts.into_values().collect();
    gini_from_counts(&counts, labels.len())
}

/// Gini impurity from per-class counts.
pub(super) fn gini_from_counts(counts: &[usize], n: usize) -> f32 {
    if n == 0 {
        return 0.0;
    }
    let n = n as f32;
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f32 / n;
            p * p
        })
        .sum::<f32>()
}

/// Index of the most frequent class; ties go to the lowest index.
pub(super) fn majority_index(counts: &[usize]) -> usize {
    let mut best = 0;
    for (class, &count) in counts.iter().enumerate() {
        if count > counts[best] {
            best = class;
        }
    }
    best
}

/// Creates a bootstrap sample (random sample with replacement).
pub(super) fn bootstrap_sample(n_samples: usize, rng: &mut StdRng) -> Vec<usize> {
    use rand::distributions::{Distribution, Uniform};

    let dist = Uniform::from(0..n_samples);
    (0..n_samples).map(|_| dist.sample(rng)).collect()
}

/// Candidate split chosen at a node.
#[derive(Debug, Clone, Copy)]
pub(super) struct Split {
    pub feature_idx: usize,
    pub threshold: f32,
    pub gain: f32,
}

/// Read-only state shared by every node while one tree grows.
pub(super) struct TreeBuilder<'a> {
    pub x: &'a Matrix<f32>,
    /// Dense class index per row of `x`.
    pub y: &'a [usize],
    /// Original label for each dense class index.
    pub classes: &'a [usize],
    pub max_depth: Option<usize>,
    /// Features examined per node.
    pub n_split_features: usize,
}

impl TreeBuilder<'_> {
    fn class_counts(&self, indices: &[usize]) -> Vec<usize> {
        let mut counts = vec![0; self.classes.len()];
        for &i in indices {
            counts[self.y[i]] += 1;
        }
        counts
    }

    /// Build a decision tree recursively.
    pub fn build(&self, indices: Vec<usize>, depth: usize, rng: &mut StdRng) -> TreeNode {
        let n_samples = indices.len();
        let counts = self.class_counts(&indices);
        let leaf = TreeNode::Leaf(Leaf {
            class_label: self.classes[majority_index(&counts)],
            n_samples,
        });

        let pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
        let at_max_depth = self.max_depth.is_some_and(|d| depth >= d);
        if pure || at_max_depth || n_samples < 2 {
            return leaf;
        }

        let Some(split) = self.find_best_split(&indices, &counts, rng) else {
            return leaf;
        };

        let (left, right): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| self.x.get(i, split.feature_idx) <= split.threshold);
        if left.is_empty() || right.is_empty() {
            return leaf;
        }

        TreeNode::Node(Node {
            feature_idx: split.feature_idx,
            threshold: split.threshold,
            left: Box::new(self.build(left, depth + 1, rng)),
            right: Box::new(self.build(right, depth + 1, rng)),
        })
    }

    /// Best split over a random feature subset, falling back to every
    /// feature when the subset has no informative split.
    fn find_best_split(&self, indices: &[usize], counts: &[usize], rng: &mut StdRng) -> Option<Split> {
        let n_features = self.x.n_cols();
        if self.n_split_features >= n_features {
            return self.best_over(indices, counts, 0..n_features);
        }

        let mut subset = index::sample(rng, n_features, self.n_split_features).into_vec();
        subset.sort_unstable();
        self.best_over(indices, counts, subset.iter().copied())
            .or_else(|| self.best_over(indices, counts, 0..n_features))
    }

    fn best_over(
        &self,
        indices: &[usize],
        counts: &[usize],
        features: impl Iterator<Item = usize>,
    ) -> Option<Split> {
        let parent = gini_from_counts(counts, indices.len());
        let mut best: Option<Split> = None;
        for feature_idx in features {
            if let Some(split) = self.best_split_for_feature(indices, counts, parent, feature_idx) {
                if best.map_or(true, |b| split.gain > b.gain) {
                    best = Some(split);
                }
            }
        }
        best
    }

    /// Sweep the sorted feature values once, moving rows from the right
    /// counts to the left counts, and score each midpoint threshold.
    fn best_split_for_feature(
        &self,
        indices: &[usize],
        counts: &[usize],
        parent: f32,
        feature_idx: usize,
    ) -> Option<Split> {
        let n = indices.len();
        let mut sorted: Vec<(f32, usize)> = indices
            .iter()
            .map(|&i| (self.x.get(i, feature_idx), self.y[i]))
            .collect();
        sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut left = vec![0usize; counts.len()];
        let mut right = counts.to_vec();
        let mut best: Option<Split> = None;

        for pos in 0..n - 1 {
            let (value, class) = sorted[pos];
            left[class] += 1;
            right[class] -= 1;

            let next = sorted[pos + 1].0;
            if next <= value {
                continue;
            }

            let n_left = pos + 1;
            let n_right = n - n_left;
            let weighted = (n_left as f32 * gini_from_counts(&left, n_left)
                + n_right as f32 * gini_from_counts(&right, n_right))
                / n as f32;
            let gain = parent - weighted;

            if gain > 0.0 && best.map_or(true, |b| gain > b.gain) {
                best = Some(Split {
                    feature_idx,
                    threshold: (value + next) / 2.0,
                    gain,
                });
            }
        }
        best
    }
}

#[cfg(test)]
#[path = "helpers_tests.rs"]
mod tests;
