//! Training one grid point.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SearchError};
use crate::primitives::Matrix;
use crate::search::HyperparameterSet;
use crate::traits::{Classifier, ClassifierFactory};

/// A fitted model and the grid point it was trained with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModel<M> {
    /// Position of the hyperparameter set in the grid.
    pub grid_index: usize,
    pub hyperparameters: HyperparameterSet,
    pub model: M,
}

impl<M: Classifier> TrainedModel<M> {
    /// Predict with the wrapped model.
    ///
    /// # Errors
    ///
    /// Whatever the model's `predict` returns.
    pub fn predict(&self, x: &Matrix<f32>) -> Result<Vec<usize>> {
        self.model.predict(x)
    }
}

/// Builds and fits one model per call.
///
/// Holds only a shared reference to the factory, so any number of calls
/// may run in parallel; each depends on nothing but its arguments.
#[derive(Debug)]
pub struct Trainer<'a, F> {
    factory: &'a F,
}

impl<F> Clone for Trainer<'_, F> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<F> Copy for Trainer<'_, F> {}

impl<'a, F: ClassifierFactory> Trainer<'a, F> {
    #[must_use]
    pub fn new(factory: &'a F) -> Self {
        Self { factory }
    }

    #[must_use]
    pub fn factory(&self) -> &'a F {
        self.factory
    }

    /// Build a model from `hyperparameters` and fit it.
    ///
    /// # Errors
    ///
    /// `Training` wrapping the factory or fit error, tagged with the
    /// rendered hyperparameter set.
    pub fn train(
        &self,
        grid_index: usize,
        features: &Matrix<f32>,
        labels: &[usize],
        hyperparameters: &HyperparameterSet,
    ) -> Result<TrainedModel<F::Model>> {
        debug!(grid_index, %hyperparameters, backend = self.factory.identity(), "training");

        let fitted = self.factory.build(hyperparameters).and_then(|mut model| {
            model.fit(features, labels)?;
            Ok(model)
        });

        match fitted {
            Ok(model) => Ok(TrainedModel {
                grid_index,
                hyperparameters: hyperparameters.clone(),
                model,
            }),
            Err(source) => Err(SearchError::Training {
                hyperparameters: hyperparameters.to_string(),
                source: Box::new(source),
            }),
        }
    }
}
