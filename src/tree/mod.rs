//! Decision tree algorithms and the random forest backend.
//!
//! This module implements:
//! - CART (Classification and Regression Trees) using Gini impurity
//! - Random Forest ensemble classifier with per-node feature subsampling
//! - [`RandomForestFactory`], the default estimator backend for grid search
//!
//! # Example
//!
//! ```
//! use hypergrid::prelude::*;
//!
//! // Training data (simple 2D binary classification)
//! let x = Matrix::from_vec(6, 2, vec![
//!     0.0, 0.0,
//!     0.1, 0.2,
//!     0.2, 0.1,
//!     1.0, 1.0,
//!     0.9, 1.1,
//!     1.1, 0.9,
//! ]).expect("6x2 matrix");
//! let y = vec![0, 0, 0, 1, 1, 1];
//!
//! let mut forest = RandomForestClassifier::new(10)
//!     .with_max_depth(3)
//!     .with_random_state(42);
//! forest.fit(&x, &y).expect("fit should succeed");
//! assert_eq!(forest.predict(&x).expect("predict"), y);
//! ```

mod factory;
mod helpers;

pub use factory::RandomForestFactory;
pub use helpers::gini_impurity;

use std::collections::BTreeMap;
use std::fmt;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SearchError};
use crate::primitives::Matrix;
use crate::traits::Classifier;
use helpers::{bootstrap_sample, TreeBuilder};

/// Internal node in a decision tree.
///
/// Contains a split condition (feature and threshold) and pointers to
/// left and right subtrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Index of the feature to split on
    pub feature_idx: usize,
    /// Threshold value for the split
    pub threshold: f32,
    /// Left subtree (samples where feature <= threshold)
    pub left: Box<TreeNode>,
    /// Right subtree (samples where feature > threshold)
    pub right: Box<TreeNode>,
}

/// Leaf node in a decision tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leaf {
    /// Predicted class label for this leaf
    pub class_label: usize,
    /// Number of training samples in this leaf
    pub n_samples: usize,
}

/// A node in a decision tree (either internal node or leaf).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    /// Internal decision node with split condition
    Node(Node),
    /// Leaf node with class prediction
    Leaf(Leaf),
}

impl TreeNode {
    /// Returns the depth of the tree rooted at this node.
    ///
    /// Leaf nodes have depth 0, internal nodes have depth 1 + max(left, right).
    #[must_use]
    pub fn depth(&self) -> usize {
        match self {
            TreeNode::Leaf(_) => 0,
            TreeNode::Node(node) => 1 + node.left.depth().max(node.right.depth()),
        }
    }

    fn predict_one(&self, sample: &[f32]) -> usize {
        let mut node = self;
        loop {
            match node {
                TreeNode::Leaf(leaf) => return leaf.class_label,
                TreeNode::Node(internal) => {
                    node = if sample[internal.feature_idx] <= internal.threshold {
                        &internal.left
                    } else {
                        &internal.right
                    };
                }
            }
        }
    }
}

/// Number of features examined at each split.
///
/// Mirrors the usual `max_features` choices: all features, `sqrt(n)`,
/// `log2(n)`, a fixed count or a fraction of `n`. Always resolves to at
/// least one feature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MaxFeatures {
    All,
    Sqrt,
    Log2,
    Count(usize),
    Fraction(f64),
}

impl MaxFeatures {
    /// Features to examine when the data has `n_features` columns.
    #[must_use]
    pub fn resolve(&self, n_features: usize) -> usize {
        let n = n_features as f64;
        let k = match *self {
            MaxFeatures::All => n_features,
            MaxFeatures::Sqrt => n.sqrt() as usize,
            MaxFeatures::Log2 => n.log2() as usize,
            MaxFeatures::Count(k) => k,
            MaxFeatures::Fraction(f) => (n * f) as usize,
        };
        k.clamp(1, n_features.max(1))
    }
}

impl fmt::Display for MaxFeatures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaxFeatures::All => f.write_str("None"),
            MaxFeatures::Sqrt => f.write_str("sqrt"),
            MaxFeatures::Log2 => f.write_str("log2"),
            MaxFeatures::Count(k) => write!(f, "{k}"),
            MaxFeatures::Fraction(v) => write!(f, "{v}"),
        }
    }
}

/// Decision tree classifier using the CART algorithm.
///
/// Uses Gini impurity for splitting criterion and builds trees recursively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTreeClassifier {
    tree: Option<TreeNode>,
    max_depth: Option<usize>,
    max_features: MaxFeatures,
    random_state: Option<u64>,
    /// Number of features the model was trained on (for validation)
    n_features: Option<usize>,
}

impl Default for DecisionTreeClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionTreeClassifier {
    /// Creates a new decision tree classifier with default parameters.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tree: None,
            max_depth: None,
            max_features: MaxFeatures::All,
            random_state: None,
            n_features: None,
        }
    }

    /// Sets the maximum depth of the tree (root has depth 0).
    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Sets how many features each split examines.
    #[must_use]
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    /// Sets the seed for feature subsampling.
    #[must_use]
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Depth of the fitted tree.
    #[must_use]
    pub fn depth(&self) -> Option<usize> {
        self.tree.as_ref().map(TreeNode::depth)
    }

    /// Root of the fitted tree.
    #[must_use]
    pub fn root(&self) -> Option<&TreeNode> {
        self.tree.as_ref()
    }

    /// Fit on the rows of `x` named by `indices`.
    fn fit_rows(&mut self, x: &Matrix<f32>, y: &[usize], indices: Vec<usize>) -> Result<()> {
        check_training_data(x, y)?;

        let classes: Vec<usize> = y
            .iter()
            .copied()
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect();
        let dense: Vec<usize> = y
            .iter()
            .map(|label| classes.partition_point(|c| c < label))
            .collect();

        let builder = TreeBuilder {
            x,
            y: &dense,
            classes: &classes,
            max_depth: self.max_depth,
            n_split_features: self.max_features.resolve(x.n_cols()),
        };
        let mut rng = seeded_rng(self.random_state);

        self.tree = Some(builder.build(indices, 0, &mut rng));
        self.n_features = Some(x.n_cols());
        Ok(())
    }
}

impl Classifier for DecisionTreeClassifier {
    fn fit(&mut self, x: &Matrix<f32>, y: &[usize]) -> Result<()> {
        self.fit_rows(x, y, (0..y.len()).collect())
    }

    fn predict(&self, x: &Matrix<f32>) -> Result<Vec<usize>> {
        let (tree, n_features) = match (&self.tree, self.n_features) {
            (Some(tree), Some(n)) => (tree, n),
            _ => return Err(SearchError::NotFitted),
        };
        check_feature_count(n_features, x)?;
        Ok(x.rows().map(|sample| tree.predict_one(sample)).collect())
    }
}

/// Random Forest classifier - an ensemble of decision trees.
///
/// Each tree is grown on a bootstrap sample and examines a random subset of
/// features at every split. Predictions are a majority vote; ties go to the
/// lowest class label. Tree `i` is seeded with `random_state + i`, so a
/// seeded forest is reproducible regardless of how trees are scheduled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestClassifier {
    trees: Vec<DecisionTreeClassifier>,
    n_estimators: usize,
    max_depth: Option<usize>,
    max_features: MaxFeatures,
    random_state: Option<u64>,
    n_features: Option<usize>,
}

impl RandomForestClassifier {
    /// Creates a new Random Forest classifier with `n_estimators` trees.
    #[must_use]
    pub fn new(n_estimators: usize) -> Self {
        Self {
            trees: Vec::new(),
            n_estimators,
            max_depth: None,
            max_features: MaxFeatures::Sqrt,
            random_state: None,
            n_features: None,
        }
    }

    /// Sets the maximum depth for each tree.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    /// Sets or clears the maximum depth for each tree.
    #[must_use]
    pub fn with_max_depth_opt(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Sets how many features each split examines.
    #[must_use]
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    /// Sets the random state for reproducibility.
    #[must_use]
    pub fn with_random_state(mut self, random_state: u64) -> Self {
        self.random_state = Some(random_state);
        self
    }

    /// Sets the number of trees.
    #[must_use]
    pub fn with_n_estimators(mut self, n_estimators: usize) -> Self {
        self.n_estimators = n_estimators;
        self
    }

    #[must_use]
    pub fn n_estimators(&self) -> usize {
        self.n_estimators
    }

    #[must_use]
    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    #[must_use]
    pub fn max_features(&self) -> MaxFeatures {
        self.max_features
    }

    /// Fitted trees; empty before `fit`.
    #[must_use]
    pub fn trees(&self) -> &[DecisionTreeClassifier] {
        &self.trees
    }
}

impl Classifier for RandomForestClassifier {
    fn fit(&mut self, x: &Matrix<f32>, y: &[usize]) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(SearchError::InvalidHyperparameter {
                param: "n_estimators".to_string(),
                value: "0".to_string(),
                constraint: ">= 1".to_string(),
            });
        }
        check_training_data(x, y)?;

        let base_seed = self
            .random_state
            .unwrap_or_else(|| rand::thread_rng().gen());
        let n_samples = y.len();
        let max_depth = self.max_depth;
        let max_features = self.max_features;

        let trees = (0..self.n_estimators)
            .into_par_iter()
            .map(|i| {
                let seed = base_seed.wrapping_add(i as u64);
                let mut rng = StdRng::seed_from_u64(seed);
                let bootstrap = bootstrap_sample(n_samples, &mut rng);

                let mut tree = DecisionTreeClassifier::new()
                    .with_max_features(max_features)
                    .with_random_state(rng.gen());
                tree.max_depth = max_depth;
                tree.fit_rows(x, y, bootstrap)?;
                Ok(tree)
            })
            .collect::<Result<Vec<_>>>()?;

        self.trees = trees;
        self.n_features = Some(x.n_cols());
        Ok(())
    }

    fn predict(&self, x: &Matrix<f32>) -> Result<Vec<usize>> {
        let Some(n_features) = self.n_features else {
            return Err(SearchError::NotFitted);
        };
        check_feature_count(n_features, x)?;

        let per_tree = self
            .trees
            .iter()
            .map(|tree| tree.predict(x))
            .collect::<Result<Vec<_>>>()?;

        let predictions = (0..x.n_rows())
            .map(|row| {
                let mut votes: BTreeMap<usize, usize> = BTreeMap::new();
                for tree_predictions in &per_tree {
                    *votes.entry(tree_predictions[row]).or_insert(0) += 1;
                }
                let mut winner = (0, 0);
                for (class, count) in votes {
                    if count > winner.1 {
                        winner = (class, count);
                    }
                }
                winner.0
            })
            .collect();
        Ok(predictions)
    }
}

fn check_training_data(x: &Matrix<f32>, y: &[usize]) -> Result<()> {
    if x.n_rows() != y.len() {
        return Err(SearchError::dimension_mismatch("n_samples", x.n_rows(), y.len()));
    }
    if y.is_empty() {
        return Err(SearchError::InvalidDataset {
            message: "cannot fit with zero samples".to_string(),
        });
    }
    if x.n_cols() == 0 {
        return Err(SearchError::InvalidDataset {
            message: "cannot fit with zero features".to_string(),
        });
    }
    Ok(())
}

fn check_feature_count(expected: usize, x: &Matrix<f32>) -> Result<()> {
    if x.n_cols() == expected {
        Ok(())
    } else {
        Err(SearchError::dimension_mismatch("n_features", expected, x.n_cols()))
    }
}

fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}
