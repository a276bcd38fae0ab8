//! Convenience re-exports for common usage.
//!
//! # Usage
//!
//! ```
//! use hypergrid::prelude::*;
//! ```

pub use crate::cache::{CacheBackend, CacheConfig, CacheStats, DiskCache, MemoryCache};
pub use crate::config::PipelineConfig;
pub use crate::coordinator::{FailurePolicy, Metric, SearchCoordinator, SearchReport};
pub use crate::data::synthetic::make_blobs;
pub use crate::data::{DataFrame, Dataset};
pub use crate::error::{Result, SearchError, Stage};
pub use crate::evaluate::{evaluate, EvaluationReport};
pub use crate::metrics::ClassificationReport;
pub use crate::model_selection::{split, Partition, Partitions, SplitConfig};
pub use crate::pipeline::{Pipeline, PipelineOutput};
pub use crate::primitives::Matrix;
pub use crate::search::{generate, Grid, HyperparameterSet, ParamValue, SearchSpace};
pub use crate::traits::{Classifier, ClassifierFactory};
pub use crate::train::{TrainedModel, Trainer};
pub use crate::tree::{DecisionTreeClassifier, MaxFeatures, RandomForestClassifier, RandomForestFactory};
