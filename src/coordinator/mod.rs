//! Fan-out training and validation-based model selection.
//!
//! # Fan-out
//!
//! One independent training unit per grid point, dispatched on rayon.
//! Results come back in grid order regardless of completion order.
//!
//! - [`FailurePolicy::BestEffort`]: failed units are recorded as
//!   [`TrainingFailure`]s and the rest continue.
//! - [`FailurePolicy::FailFast`]: the first failure observed stops
//!   dispatching further units and is returned as the error.
//!
//! # Selection
//!
//! Every model is scored on the validation partition. Prediction errors and
//! NaN scores exclude the model (a [`ScoringFailure`]), they are never
//! treated as a zero score. The highest score wins; on a tie the model
//! earliest in grid order wins.

mod metric;
mod report;

pub use metric::Metric;
pub use report::{ResultsTable, SearchReport};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cache::{self, fingerprint, Fingerprint, Memoizer};
use crate::data::Dataset;
use crate::error::{Result, SearchError};
use crate::primitives::Matrix;
use crate::search::{Grid, HyperparameterSet};
use crate::train::{TrainedModel, Trainer};
use crate::traits::{Classifier, ClassifierFactory};

/// What to do when a training unit fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailurePolicy {
    /// Record the failure and select among the models that trained.
    #[default]
    BestEffort,
    /// Abort the run on the first failure.
    FailFast,
}

/// A training unit that did not produce a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingFailure {
    pub grid_index: usize,
    pub hyperparameters: HyperparameterSet,
    pub message: String,
}

/// Outcome of the training fan-out, both lists in grid order.
#[derive(Debug, Clone)]
pub struct FanOut<M> {
    pub models: Vec<TrainedModel<M>>,
    pub failures: Vec<TrainingFailure>,
}

/// Validation score of one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub grid_index: usize,
    pub hyperparameters: HyperparameterSet,
    pub score: f64,
}

/// A trained model excluded from selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringFailure {
    pub grid_index: usize,
    pub hyperparameters: HyperparameterSet,
    pub message: String,
}

/// Winner of selection plus everything needed to report on it.
#[derive(Debug, Clone)]
pub struct Selection<M> {
    pub best: TrainedModel<M>,
    pub best_score: f64,
    /// One record per scorable model, in grid order.
    pub records: Vec<ScoreRecord>,
    pub scoring_failures: Vec<ScoringFailure>,
}

/// Memoized form of a selection; the winner is referenced by grid index.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SelectionOutcome {
    best_grid_index: usize,
    best_score: f64,
    records: Vec<ScoreRecord>,
    scoring_failures: Vec<ScoringFailure>,
}

/// Drives training across a grid and picks the best model.
///
/// # Examples
///
/// ```
/// use hypergrid::prelude::*;
///
/// let df = make_blobs(&[12, 12, 12], 2, 0.4, 3).expect("blobs");
/// let ds = Dataset::from_frame(&df, "target").expect("dataset");
/// let parts = split(&ds, 0.25, 0.25, 42).expect("split");
///
/// let grid = generate(&SearchSpace::new().add("n_estimators", [3, 5]).add("max_depth", [2])).expect("grid");
/// let factory = RandomForestFactory::new(42);
/// let coordinator = SearchCoordinator::new(Metric::MacroF1, FailurePolicy::BestEffort);
///
/// let fan_out = coordinator.train_all(Trainer::new(&factory), &parts.train, &grid).expect("fan-out");
/// assert_eq!(fan_out.models.len(), 2);
///
/// let selection = coordinator
///     .select_best(parts.validation.features(), parts.validation.labels(), fan_out.models)
///     .expect("selection");
/// assert_eq!(selection.records.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct SearchCoordinator {
    metric: Metric,
    policy: FailurePolicy,
    n_workers: Option<usize>,
    memoizer: Memoizer,
    cache_version: String,
}

impl SearchCoordinator {
    #[must_use]
    pub fn new(metric: Metric, policy: FailurePolicy) -> Self {
        Self {
            metric,
            policy,
            n_workers: None,
            memoizer: Memoizer::disabled(),
            cache_version: cache::DEFAULT_CACHE_VERSION.to_string(),
        }
    }

    /// Run the fan-out on a dedicated pool of `n` threads instead of the
    /// global rayon pool.
    #[must_use]
    pub fn with_workers(mut self, n: Option<usize>) -> Self {
        self.n_workers = n;
        self
    }

    /// Memoize training and selection through `memoizer` under `version`.
    #[must_use]
    pub fn with_memoizer(mut self, memoizer: Memoizer, version: impl Into<String>) -> Self {
        self.memoizer = memoizer;
        self.cache_version = version.into();
        self
    }

    #[must_use]
    pub fn metric(&self) -> Metric {
        self.metric
    }

    #[must_use]
    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Train one model per grid point on `train`.
    ///
    /// # Errors
    ///
    /// - `Training` for the failing unit under [`FailurePolicy::FailFast`]
    /// - `InvalidConfig` if the worker pool cannot be built
    pub fn train_all<F: ClassifierFactory>(
        &self,
        trainer: Trainer<'_, F>,
        train: &Dataset,
        grid: &Grid,
    ) -> Result<FanOut<F::Model>> {
        let train_fp = if self.memoizer.is_enabled() {
            Some(fingerprint(train)?)
        } else {
            None
        };
        let operation = cache::train_operation(trainer.factory().identity());
        let settings = trainer.factory().settings();

        let unit = |(grid_index, hyperparameters): (usize, &HyperparameterSet)| {
            self.train_unit(trainer, train, grid_index, hyperparameters, &operation, &settings, train_fp.as_ref())
        };

        let run = || -> Result<FanOut<F::Model>> {
            let units = grid.as_slice().par_iter().enumerate().map(unit);
            match self.policy {
                FailurePolicy::FailFast => Ok(FanOut {
                    models: units.collect::<Result<Vec<_>>>()?,
                    failures: Vec::new(),
                }),
                FailurePolicy::BestEffort => {
                    let outcomes: Vec<Result<TrainedModel<F::Model>>> = units.collect();
                    let mut fan_out = FanOut {
                        models: Vec::with_capacity(outcomes.len()),
                        failures: Vec::new(),
                    };
                    for (grid_index, outcome) in outcomes.into_iter().enumerate() {
                        match outcome {
                            Ok(model) => fan_out.models.push(model),
                            Err(err) => fan_out.failures.push(TrainingFailure {
                                grid_index,
                                hyperparameters: grid[grid_index].clone(),
                                message: err.to_string(),
                            }),
                        }
                    }
                    Ok(fan_out)
                }
            }
        };

        info!(units = grid.len(), policy = ?self.policy, workers = ?self.n_workers, "training fan-out");
        let fan_out = match self.n_workers {
            Some(n) => rayon::ThreadPoolBuilder::new()
                .num_threads(n)
                .build()
                .map_err(|e| SearchError::InvalidConfig {
                    message: format!("cannot build a pool of {n} workers: {e}"),
                })?
                .install(run)?,
            None => run()?,
        };
        info!(
            trained = fan_out.models.len(),
            failed = fan_out.failures.len(),
            "training fan-in"
        );
        Ok(fan_out)
    }

    #[allow(clippy::too_many_arguments)]
    fn train_unit<F: ClassifierFactory>(
        &self,
        trainer: Trainer<'_, F>,
        train: &Dataset,
        grid_index: usize,
        hyperparameters: &HyperparameterSet,
        operation: &str,
        settings: &str,
        train_fp: Option<&Fingerprint>,
    ) -> Result<TrainedModel<F::Model>> {
        let fit = || trainer.train(grid_index, train.features(), train.labels(), hyperparameters);

        let outcome = match train_fp {
            Some(train_fp) => {
                let unit_fp = fingerprint(&(train_fp, settings, hyperparameters))?;
                self.memoizer
                    .memoize(operation, &self.cache_version, &unit_fp, || Ok(fit()?.model))
                    .map(|model| TrainedModel {
                        grid_index,
                        hyperparameters: hyperparameters.clone(),
                        model,
                    })
            }
            None => fit(),
        };

        if let Err(err) = &outcome {
            warn!(grid_index, %hyperparameters, error = %err, "training unit failed");
        }
        outcome
    }

    /// Score `models` on the validation data and pick the best.
    ///
    /// # Errors
    ///
    /// `EmptyModelSet` if no model could be scored.
    pub fn select_best<M>(
        &self,
        val_features: &Matrix<f32>,
        val_labels: &[usize],
        models: Vec<TrainedModel<M>>,
    ) -> Result<Selection<M>>
    where
        M: Classifier + Serialize + Sync,
    {
        if !self.memoizer.is_enabled() {
            return select_best(val_features, val_labels, models, self.metric);
        }

        let mut models = models;
        models.sort_by_key(|m| m.grid_index);
        let key_fp = fingerprint(&(val_features, val_labels, self.metric, &models))?;

        let outcome: SelectionOutcome =
            self.memoizer
                .memoize(cache::OP_COMPARE, &self.cache_version, &key_fp, || {
                    let (outcome, _) = score_and_rank(val_features, val_labels, &models, self.metric)?;
                    Ok(outcome)
                })?;

        let Some(pos) = models
            .iter()
            .position(|m| m.grid_index == outcome.best_grid_index)
        else {
            return Err(SearchError::Cache {
                message: format!(
                    "cached selection names grid index {} which is not among the models",
                    outcome.best_grid_index
                ),
            });
        };
        Ok(Selection {
            best: models.swap_remove(pos),
            best_score: outcome.best_score,
            records: outcome.records,
            scoring_failures: outcome.scoring_failures,
        })
    }
}

/// Score every model on validation data and select the best.
///
/// Models are ranked in grid order; the first model reaching the maximum
/// score wins.
///
/// # Errors
///
/// `EmptyModelSet` when `models` is empty or every model failed to score.
pub fn select_best<M>(
    val_features: &Matrix<f32>,
    val_labels: &[usize],
    mut models: Vec<TrainedModel<M>>,
    metric: Metric,
) -> Result<Selection<M>>
where
    M: Classifier + Sync,
{
    models.sort_by_key(|m| m.grid_index);
    let (outcome, pos) = score_and_rank(val_features, val_labels, &models, metric)?;
    Ok(Selection {
        best: models.swap_remove(pos),
        best_score: outcome.best_score,
        records: outcome.records,
        scoring_failures: outcome.scoring_failures,
    })
}

/// Returns the outcome and the winner's position in `models`.
fn score_and_rank<M>(
    val_features: &Matrix<f32>,
    val_labels: &[usize],
    models: &[TrainedModel<M>],
    metric: Metric,
) -> Result<(SelectionOutcome, usize)>
where
    M: Classifier + Sync,
{
    let scores: Vec<Result<f64>> = models
        .par_iter()
        .map(|m| score_model(m, val_features, val_labels, metric))
        .collect();

    let mut records = Vec::with_capacity(models.len());
    let mut scoring_failures = Vec::new();
    let mut best: Option<(usize, f64)> = None;

    for (pos, (model, score)) in models.iter().zip(scores).enumerate() {
        match score {
            Ok(score) => {
                debug!(grid_index = model.grid_index, hyperparameters = %model.hyperparameters, score, "scored");
                if best.map_or(true, |(_, top)| score > top) {
                    best = Some((pos, score));
                }
                records.push(ScoreRecord {
                    grid_index: model.grid_index,
                    hyperparameters: model.hyperparameters.clone(),
                    score,
                });
            }
            Err(err) => {
                warn!(grid_index = model.grid_index, error = %err, "model excluded from selection");
                scoring_failures.push(ScoringFailure {
                    grid_index: model.grid_index,
                    hyperparameters: model.hyperparameters.clone(),
                    message: err.to_string(),
                });
            }
        }
    }

    let Some((pos, best_score)) = best else {
        return Err(SearchError::EmptyModelSet {
            trained: models.len(),
            excluded: scoring_failures.len(),
        });
    };
    let winner = &models[pos];
    info!(
        grid_index = winner.grid_index,
        hyperparameters = %winner.hyperparameters,
        %metric,
        score = best_score,
        "selected best model"
    );

    Ok((
        SelectionOutcome {
            best_grid_index: winner.grid_index,
            best_score,
            records,
            scoring_failures,
        },
        pos,
    ))
}

fn score_model<M: Classifier>(
    model: &TrainedModel<M>,
    x: &Matrix<f32>,
    y: &[usize],
    metric: Metric,
) -> Result<f64> {
    let predictions = model
        .predict(x)
        .map_err(|e| scoring_error(model, e.to_string()))?;
    let score = metric
        .score(y, &predictions)
        .map_err(|e| scoring_error(model, e.to_string()))?;
    reject_nan(model, metric, score)
}

/// A NaN score cannot be ranked, so it excludes the model.
fn reject_nan<M>(model: &TrainedModel<M>, metric: Metric, score: f64) -> Result<f64> {
    if score.is_nan() {
        return Err(scoring_error(model, format!("{metric} is NaN")));
    }
    Ok(score)
}

fn scoring_error<M>(model: &TrainedModel<M>, message: String) -> SearchError {
    SearchError::Scoring {
        hyperparameters: model.hyperparameters.to_string(),
        message,
    }
}

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
