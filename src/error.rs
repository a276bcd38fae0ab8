//! Error types for grid search operations.
//!
//! Structural errors (bad search space, unsplittable dataset) abort a run.
//! Per-unit errors (training, scoring) are isolated and aggregated by the
//! coordinator; they only become fatal through [`SearchError::EmptyModelSet`]
//! or under the fail-fast policy.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Pipeline stage an error is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// Turning the input frame into a labeled dataset.
    Load,
    /// Expanding the search space into a grid.
    Grid,
    /// Stratified train/validation/test partitioning.
    Split,
    /// Fan-out training across the grid.
    Train,
    /// Validation scoring and winner selection.
    Select,
    /// Per-partition diagnostics for the winner.
    Evaluate,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Load => "load",
            Stage::Grid => "grid",
            Stage::Split => "split",
            Stage::Train => "train",
            Stage::Select => "select",
            Stage::Evaluate => "evaluate",
        };
        f.write_str(name)
    }
}

/// Main error type for hypergrid operations.
///
/// # Examples
///
/// ```
/// use hypergrid::error::SearchError;
///
/// let err = SearchError::InvalidSearchSpace {
///     reason: "candidate list for 'max_depth' is empty".to_string(),
/// };
/// assert!(err.to_string().contains("max_depth"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// Malformed search space (empty candidate list, duplicate names, unknown names).
    #[error("Invalid search space: {reason}")]
    InvalidSearchSpace {
        /// What is wrong with the space
        reason: String,
    },

    /// A class cannot be represented in every partition.
    #[error(
        "Insufficient samples for stratification: class {label} has {available} sample(s), needs at least {required}"
    )]
    InsufficientSamplesForStratification {
        /// Class label id
        label: usize,
        /// Samples of this class in the input
        available: usize,
        /// Samples needed to cover all partitions
        required: usize,
    },

    /// Split fractions or other split parameters are out of range.
    #[error("Invalid split: {message}")]
    InvalidSplit {
        /// Error description
        message: String,
    },

    /// Pipeline configuration is unusable.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Error description
        message: String,
    },

    /// Input table cannot be turned into a labeled dataset.
    #[error("Invalid dataset: {message}")]
    InvalidDataset {
        /// Error description
        message: String,
    },

    /// Label column has no value at this row.
    #[error("Missing label value at row {row}")]
    MissingLabel {
        /// Zero-based row index
        row: usize,
    },

    /// Estimator backend rejected a hyperparameter value.
    #[error("Invalid hyperparameter: {param} = {value}, expected {constraint}")]
    InvalidHyperparameter {
        /// Parameter name
        param: String,
        /// Provided value
        value: String,
        /// Constraint description
        constraint: String,
    },

    /// One training unit failed.
    #[error("Training failed for {hyperparameters}: {source}")]
    Training {
        /// Rendered hyperparameter set of the failing unit
        hyperparameters: String,
        /// Underlying cause
        #[source]
        source: Box<SearchError>,
    },

    /// One model could not be scored on the validation partition.
    #[error("Scoring failed for {hyperparameters}: {message}")]
    Scoring {
        /// Rendered hyperparameter set of the failing model
        hyperparameters: String,
        /// Error description
        message: String,
    },

    /// `predict` called before `fit`.
    #[error("Model not fitted: call fit() before predict()")]
    NotFitted,

    /// Nothing left to select from.
    #[error("Empty model set: {trained} model(s) reached selection, {excluded} excluded")]
    EmptyModelSet {
        /// Models handed to selection
        trained: usize,
        /// Models excluded by scoring failures
        excluded: usize,
    },

    /// Matrix/vector dimensions don't match for the operation.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimensions description
        expected: String,
        /// Actual dimensions found
        actual: String,
    },

    /// Cache backend failure.
    #[error("Cache error: {message}")]
    Cache {
        /// Error description
        message: String,
    },

    /// I/O error (file not found, permission denied, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Fatal error attributed to a pipeline stage.
    #[error("{stage} stage failed: {source}")]
    Stage {
        /// Stage that failed
        stage: Stage,
        /// Underlying cause
        #[source]
        source: Box<SearchError>,
    },
}

impl SearchError {
    /// Create a dimension mismatch error with descriptive context
    #[must_use]
    pub fn dimension_mismatch(context: &str, expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch {
            expected: format!("{context}={expected}"),
            actual: format!("{actual}"),
        }
    }

    /// Attribute this error to a pipeline stage.
    ///
    /// Already-attributed errors are returned unchanged.
    #[must_use]
    pub fn in_stage(self, stage: Stage) -> Self {
        match self {
            Self::Stage { .. } => self,
            other => Self::Stage {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// Stage this error is attributed to, if any.
    #[must_use]
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Innermost error, skipping stage attribution.
    #[must_use]
    pub fn root(&self) -> &SearchError {
        match self {
            Self::Stage { source, .. } => source.root(),
            other => other,
        }
    }
}

impl From<bincode::Error> for SearchError {
    fn from(err: bincode::Error) -> Self {
        SearchError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for SearchError {
    fn from(err: serde_json::Error) -> Self {
        SearchError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results.
pub type Result<T> = std::result::Result<T, SearchError>;
