//! Hypergrid: exhaustive hyperparameter grid search for classifiers.
//!
//! Hypergrid expands a declared search space into every hyperparameter
//! combination, trains one model per combination in parallel, picks the
//! best on a stratified validation partition and reports on the winner
//! for every partition. Each stage can be memoized in a content-addressed
//! cache so that re-running unchanged work is free.
//!
//! # Quick Start
//!
//! ```
//! use hypergrid::prelude::*;
//!
//! // Three well-separated classes
//! let df = make_blobs(&[30, 30, 30], 2, 0.5, 42).expect("blobs");
//!
//! let config = PipelineConfig::default().with_search_space(
//!     SearchSpace::new()
//!         .add("n_estimators", [10, 50])
//!         .add("max_depth", [Some(5), None]),
//! );
//! let output = Pipeline::new(config, RandomForestFactory::default())
//!     .run(&df)
//!     .expect("search");
//!
//! assert_eq!(output.grid.len(), 4);
//! assert!(output.search.best_score > 0.8);
//! println!("{}", output.evaluation.test);
//! ```
//!
//! # Modules
//!
//! - [`data`]: tabular input and labeled datasets
//! - [`search`]: search spaces and grid generation
//! - [`model_selection`]: stratified train/validation/test splits
//! - [`tree`]: random forest backend
//! - [`train`]: training one grid point
//! - [`coordinator`]: parallel fan-out and model selection
//! - [`metrics`]: classification metrics and reports
//! - [`evaluate`]: per-partition evaluation of the winner
//! - [`cache`]: content-addressed memoization
//! - [`pipeline`]: the end-to-end run

pub mod cache;
pub mod config;
pub mod coordinator;
pub mod data;
pub mod error;
pub mod evaluate;
pub mod metrics;
pub mod model_selection;
pub mod pipeline;
pub mod prelude;
pub mod primitives;
pub mod search;
pub mod traits;
pub mod train;
pub mod tree;

pub use error::{Result, SearchError, Stage};
pub use primitives::Matrix;
pub use traits::{Classifier, ClassifierFactory};
