//! Estimator contracts the search engine trains against.
//!
//! The engine never looks inside a model: it builds one per
//! [`HyperparameterSet`] through a [`ClassifierFactory`], fits it on the
//! train partition and asks it for labels.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;
use crate::primitives::Matrix;
use crate::search::HyperparameterSet;

/// Supervised classifier over `f32` features and class-id labels.
///
/// # Examples
///
/// ```
/// use hypergrid::prelude::*;
///
/// let x = Matrix::from_vec(4, 1, vec![0.0, 0.1, 0.9, 1.0]).expect("4x1");
/// let y = vec![0, 0, 1, 1];
///
/// let mut tree = DecisionTreeClassifier::new().with_max_depth(2);
/// tree.fit(&x, &y).expect("fit");
/// assert_eq!(tree.predict(&x).expect("predict"), y);
/// ```
pub trait Classifier {
    /// Fits the model to training data.
    ///
    /// # Errors
    ///
    /// Returns an error if the data is empty or shapes disagree.
    fn fit(&mut self, x: &Matrix<f32>, y: &[usize]) -> Result<()>;

    /// Predicts one label per row of `x`.
    ///
    /// # Errors
    ///
    /// Returns an error if the model is unfitted or the feature count
    /// differs from training.
    fn predict(&self, x: &Matrix<f32>) -> Result<Vec<usize>>;
}

/// Builds unfitted classifiers from hyperparameter sets.
///
/// Shared by every training unit, so it must be `Send + Sync`. Models are
/// serializable so trained results can be memoized.
pub trait ClassifierFactory: Send + Sync {
    /// The classifier this factory builds.
    type Model: Classifier + Serialize + DeserializeOwned + Send + Sync;

    /// Stable backend name; part of the training cache key.
    fn identity(&self) -> &str;

    /// Hyperparameter names `build` understands.
    fn parameter_names(&self) -> &[&'static str];

    /// Backend settings outside the hyperparameter set that change the
    /// fitted model (seeds, fixed options). Folded into training cache keys.
    fn settings(&self) -> String {
        String::new()
    }

    /// Builds an unfitted model.
    ///
    /// # Errors
    ///
    /// `InvalidHyperparameter` if a value is rejected.
    fn build(&self, hyperparameters: &HyperparameterSet) -> Result<Self::Model>;
}
