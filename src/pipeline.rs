//! End-to-end search pipeline.
//!
//! ```text
//!            ┌──> split ──┐
//! load ──────┤            ├──> train (fan-out) ──> select ──> evaluate
//!            └──> grid ───┘
//! ```
//!
//! Split and grid share no inputs and run as sibling rayon tasks. Every
//! other stage starts only once all of its inputs exist. Any fatal error
//! comes back attributed to the stage that raised it (see
//! [`SearchError::stage`](crate::error::SearchError::stage)).

use std::sync::Arc;

use tracing::{info, info_span};

use crate::cache::{self, fingerprint, CacheBackend, CacheStats, Memoizer};
use crate::config::PipelineConfig;
use crate::coordinator::{FanOut, SearchCoordinator, SearchReport};
use crate::data::{DataFrame, Dataset};
use crate::error::{Result, Stage};
use crate::evaluate::{evaluate, EvaluationReport};
use crate::model_selection::{split_with, Partitions};
use crate::search::{generate, Grid};
use crate::train::{TrainedModel, Trainer};
use crate::traits::ClassifierFactory;

/// Everything a successful run produces.
#[derive(Debug, Clone)]
pub struct PipelineOutput<M> {
    pub grid: Grid,
    pub partitions: Partitions,
    pub search: SearchReport,
    /// The selected model.
    pub best: TrainedModel<M>,
    pub evaluation: EvaluationReport,
}

/// Grid search over one estimator backend.
///
/// # Examples
///
/// ```
/// use hypergrid::prelude::*;
///
/// let df = make_blobs(&[20, 20, 20], 3, 0.5, 7).expect("blobs");
/// let config = PipelineConfig::default().with_search_space(
///     SearchSpace::new()
///         .add("n_estimators", [5, 10])
///         .add("max_depth", [Some(3), None]),
/// );
///
/// let output = Pipeline::new(config, RandomForestFactory::new(42))
///     .run(&df)
///     .expect("pipeline");
///
/// assert_eq!(output.grid.len(), 4);
/// assert_eq!(output.search.records.len(), 4);
/// assert!(output.search.records.iter().all(|r| r.score <= output.search.best_score));
/// ```
#[derive(Debug)]
pub struct Pipeline<F> {
    config: PipelineConfig,
    factory: F,
    memoizer: Memoizer,
}

impl<F: ClassifierFactory> Pipeline<F> {
    /// A pipeline without a cache backend; every stage computes.
    #[must_use]
    pub fn new(config: PipelineConfig, factory: F) -> Self {
        Self {
            config,
            factory,
            memoizer: Memoizer::disabled(),
        }
    }

    /// Memoize stages through `backend`, unless the config disables caching.
    #[must_use]
    pub fn with_cache(mut self, backend: Arc<dyn CacheBackend>) -> Self {
        self.memoizer = Memoizer::from_config(&self.config.cache, Some(backend));
        self
    }

    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    #[must_use]
    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Hits and misses over every run of this pipeline.
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.memoizer.stats()
    }

    /// Run the whole search on `frame`.
    ///
    /// # Errors
    ///
    /// A [`SearchError::Stage`](crate::error::SearchError::Stage) naming the failing stage and wrapping the
    /// cause. Per-unit training failures are only fatal under
    /// [`FailurePolicy::FailFast`](crate::coordinator::FailurePolicy::FailFast);
    /// scoring failures are fatal only when no model is left to select.
    pub fn run(&self, frame: &DataFrame) -> Result<PipelineOutput<F::Model>> {
        let span = info_span!("pipeline", backend = self.factory.identity());
        let _guard = span.enter();

        let dataset = self
            .config
            .validate()
            .and_then(|()| Dataset::from_frame(frame, &self.config.target_column))
            .map_err(|e| e.in_stage(Stage::Load))?;
        info!(
            samples = dataset.n_samples(),
            features = dataset.feature_names().len(),
            classes = dataset.class_counts().len(),
            "loaded dataset"
        );

        let (grid, partitions) = rayon::join(|| self.grid(), || self.split(&dataset));
        let grid = grid.map_err(|e| e.in_stage(Stage::Grid))?;
        let partitions = partitions.map_err(|e| e.in_stage(Stage::Split))?;
        info!(
            grid = grid.len(),
            train = partitions.train.n_samples(),
            validation = partitions.validation.n_samples(),
            test = partitions.test.n_samples(),
            "prepared grid and partitions"
        );

        let coordinator = SearchCoordinator::new(self.config.metric, self.config.failure_policy)
            .with_workers(self.config.n_workers)
            .with_memoizer(self.memoizer.clone(), self.config.cache.version.clone());

        let FanOut { models, failures } = coordinator
            .train_all(Trainer::new(&self.factory), &partitions.train, &grid)
            .map_err(|e| e.in_stage(Stage::Train))?;

        let selection = coordinator
            .select_best(
                partitions.validation.features(),
                partitions.validation.labels(),
                models,
            )
            .map_err(|e| e.in_stage(Stage::Select))?;
        let search = SearchReport::new(self.config.metric, failures, &selection);

        let evaluation =
            evaluate(&selection.best, &partitions).map_err(|e| e.in_stage(Stage::Evaluate))?;
        info!(
            best = %selection.best.hyperparameters,
            score = search.best_score,
            test_f1_macro = evaluation.test.macro_avg.f1,
            cache_hits = self.memoizer.stats().hits,
            "pipeline finished"
        );

        Ok(PipelineOutput {
            grid,
            partitions,
            search,
            best: selection.best,
            evaluation,
        })
    }

    fn grid(&self) -> Result<Grid> {
        let space = &self.config.search_space;
        space.validate()?;
        space.validate_names(self.factory.parameter_names())?;
        if !self.memoizer.is_enabled() {
            return generate(space);
        }
        let fp = fingerprint(space)?;
        self.memoizer
            .memoize(cache::OP_CREATE_GRID, &self.config.cache.version, &fp, || generate(space))
    }

    fn split(&self, dataset: &Dataset) -> Result<Partitions> {
        let split = &self.config.split;
        if !self.memoizer.is_enabled() {
            return split_with(dataset, split);
        }
        let fp = fingerprint(&(dataset, split))?;
        self.memoizer
            .memoize(cache::OP_SPLIT, &self.config.cache.version, &fp, || {
                split_with(dataset, split)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::error::SearchError;
    use crate::coordinator::FailurePolicy;
    use crate::data::synthetic::make_blobs;
    use crate::search::SearchSpace;
    use crate::tree::RandomForestFactory;

    fn small_config() -> PipelineConfig {
        PipelineConfig::default().with_search_space(
            SearchSpace::new()
                .add("n_estimators", [3, 6])
                .add("max_depth", [Some(2), None]),
        )
    }

    fn frame() -> DataFrame {
        make_blobs(&[16, 16, 16], 2, 0.4, 11).expect("blobs")
    }

    #[test]
    fn test_run_produces_one_record_per_grid_point() {
        let output = Pipeline::new(small_config(), RandomForestFactory::new(3))
            .run(&frame())
            .expect("run");
        assert_eq!(output.grid.len(), 4);
        assert_eq!(output.search.records.len(), 4);
        assert!(output.search.training_failures.is_empty());
        assert_eq!(output.best.grid_index, output.search.best_grid_index);
        assert_eq!(output.partitions.total_samples(), 48);
    }

    #[test]
    fn test_unknown_target_is_load_error() {
        let err = Pipeline::new(small_config().with_target_column("label"), RandomForestFactory::new(3))
            .run(&frame())
            .expect_err("no such column");
        assert_eq!(err.stage(), Some(Stage::Load));
    }

    #[test]
    fn test_unknown_hyperparameter_is_grid_error() {
        let config = small_config().with_search_space(SearchSpace::new().add("learning_rate", [0.1]));
        let err = Pipeline::new(config, RandomForestFactory::new(3))
            .run(&frame())
            .expect_err("forest has no learning rate");
        assert_eq!(err.stage(), Some(Stage::Grid));
        assert!(matches!(err.root(), SearchError::InvalidSearchSpace { .. }));
    }

    #[test]
    fn test_tiny_class_is_split_error() {
        let df = make_blobs(&[16, 2], 2, 0.4, 11).expect("blobs");
        let err = Pipeline::new(small_config(), RandomForestFactory::new(3))
            .run(&df)
            .expect_err("class of two");
        assert_eq!(err.stage(), Some(Stage::Split));
        assert!(matches!(
            err.root(),
            SearchError::InsufficientSamplesForStratification { label: 1, .. }
        ));
    }

    #[test]
    fn test_fail_fast_is_train_error() {
        let config = small_config()
            .with_search_space(SearchSpace::new().add("n_estimators", [0, 3]))
            .with_failure_policy(FailurePolicy::FailFast);
        let err = Pipeline::new(config, RandomForestFactory::new(3))
            .run(&frame())
            .expect_err("zero trees");
        assert_eq!(err.stage(), Some(Stage::Train));
        assert!(err.to_string().contains("n_estimators=0"));
    }

    #[test]
    fn test_every_unit_failing_is_select_error() {
        let config = small_config().with_search_space(SearchSpace::new().add("n_estimators", [0]));
        let err = Pipeline::new(config, RandomForestFactory::new(3))
            .run(&frame())
            .expect_err("nothing trained");
        assert_eq!(err.stage(), Some(Stage::Select));
        assert!(matches!(
            err.root(),
            SearchError::EmptyModelSet { trained: 0, .. }
        ));
    }

    #[test]
    fn test_cached_rerun_hits_every_stage() {
        let pipeline = Pipeline::new(small_config(), RandomForestFactory::new(3))
            .with_cache(Arc::new(MemoryCache::new()));
        let first = pipeline.run(&frame()).expect("first run");
        let misses = pipeline.cache_stats().misses;
        // grid + split + 4 training units + selection
        assert_eq!(misses, 7);

        let second = pipeline.run(&frame()).expect("second run");
        assert_eq!(pipeline.cache_stats().hits, 7);
        assert_eq!(pipeline.cache_stats().misses, misses);
        assert_eq!(first.search, second.search);
        assert_eq!(first.best.model, second.best.model);
        assert_eq!(first.evaluation, second.evaluation);
    }

    #[test]
    fn test_disabled_cache_config_ignores_backend() {
        let pipeline = Pipeline::new(
            small_config().with_cache(cache::CacheConfig::disabled()),
            RandomForestFactory::new(3),
        )
        .with_cache(Arc::new(MemoryCache::new()));
        pipeline.run(&frame()).expect("run");
        assert_eq!(pipeline.cache_stats(), CacheStats::default());
    }
}
