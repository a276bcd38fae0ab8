//! Pipeline configuration.
//!
//! A [`PipelineConfig`] is an immutable value handed to
//! [`Pipeline::new`](crate::pipeline::Pipeline::new) and threaded through
//! every stage. Fields missing from a JSON document take their defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::cache::CacheConfig;
use crate::coordinator::{FailurePolicy, Metric};
use crate::data::synthetic::TARGET_COLUMN;
use crate::error::{Result, SearchError};
use crate::model_selection::SplitConfig;
use crate::search::SearchSpace;

/// Everything a pipeline run depends on besides the data and the estimator.
///
/// # Examples
///
/// ```
/// use hypergrid::prelude::*;
///
/// let config = PipelineConfig::default()
///     .with_metric(Metric::Accuracy)
///     .with_failure_policy(FailurePolicy::FailFast)
///     .with_workers(4);
/// assert!(config.validate().is_ok());
///
/// let parsed = PipelineConfig::from_json(r#"{"target_column": "class", "n_workers": 2}"#)
///     .expect("valid config");
/// assert_eq!(parsed.target_column, "class");
/// assert_eq!(parsed.split.seed, 42);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Label column of the input frame.
    pub target_column: String,
    pub search_space: SearchSpace,
    pub split: SplitConfig,
    /// Validation metric used for selection.
    pub metric: Metric,
    pub failure_policy: FailurePolicy,
    /// Size of a dedicated training pool; `None` uses the global rayon pool.
    pub n_workers: Option<usize>,
    pub cache: CacheConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target_column: TARGET_COLUMN.to_string(),
            search_space: SearchSpace::random_forest_default(),
            split: SplitConfig::default(),
            metric: Metric::default(),
            failure_policy: FailurePolicy::default(),
            n_workers: None,
            cache: CacheConfig::default(),
        }
    }
}

impl PipelineConfig {
    #[must_use]
    pub fn with_target_column(mut self, name: impl Into<String>) -> Self {
        self.target_column = name.into();
        self
    }

    #[must_use]
    pub fn with_search_space(mut self, space: SearchSpace) -> Self {
        self.search_space = space;
        self
    }

    #[must_use]
    pub fn with_split(mut self, split: SplitConfig) -> Self {
        self.split = split;
        self
    }

    #[must_use]
    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    #[must_use]
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    #[must_use]
    pub fn with_workers(mut self, n: usize) -> Self {
        self.n_workers = Some(n);
        self
    }

    #[must_use]
    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    /// Parse a config from JSON.
    ///
    /// # Errors
    ///
    /// `Serialization` if the document is malformed, `InvalidConfig` or
    /// `InvalidSplit` if it parses but fails [`validate`](Self::validate).
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON config file.
    ///
    /// # Errors
    ///
    /// `Io` if the file cannot be read, otherwise as [`from_json`](Self::from_json).
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&json)
    }

    /// Check values that are wrong regardless of the data.
    ///
    /// The search space itself is validated when the grid is generated,
    /// so that its errors are attributed to the grid stage.
    ///
    /// # Errors
    ///
    /// - `InvalidSplit` if a split fraction is outside (0, 1)
    /// - `InvalidConfig` for an empty target column name or zero workers
    pub fn validate(&self) -> Result<()> {
        self.split.validate()?;
        if self.target_column.is_empty() {
            return Err(SearchError::InvalidConfig {
                message: "target_column cannot be empty".to_string(),
            });
        }
        if self.n_workers == Some(0) {
            return Err(SearchError::InvalidConfig {
                message: "n_workers must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
