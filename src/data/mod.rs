//! Tabular input and labeled datasets.
//!
//! [`DataFrame`] is the raw table handed to the pipeline: named `f32`
//! columns of equal length. [`Dataset`] is the same data after the label
//! column has been pulled out and validated as categorical.

pub mod synthetic;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SearchError};
use crate::primitives::Matrix;

/// A minimal `DataFrame` with named columns.
///
/// # Examples
///
/// ```
/// use hypergrid::data::DataFrame;
///
/// let columns = vec![
///     ("x".to_string(), vec![1.0, 2.0, 3.0]),
///     ("target".to_string(), vec![0.0, 1.0, 0.0]),
/// ];
/// let df = DataFrame::new(columns).expect("DataFrame creation should succeed with valid columns");
/// assert_eq!(df.shape(), (3, 2));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataFrame {
    columns: Vec<(String, Vec<f32>)>,
    n_rows: usize,
}

impl DataFrame {
    /// Creates a new `DataFrame` from named columns.
    ///
    /// # Errors
    ///
    /// Returns an error if there are no columns, columns have different
    /// lengths, or a name is empty or duplicated.
    pub fn new(columns: Vec<(String, Vec<f32>)>) -> Result<Self> {
        if columns.is_empty() {
            return Err(invalid("DataFrame must have at least one column"));
        }

        let n_rows = columns[0].1.len();

        for (name, col) in &columns {
            if col.len() != n_rows {
                return Err(invalid(format!(
                    "column '{name}' has {} rows, expected {n_rows}",
                    col.len()
                )));
            }
            if name.is_empty() {
                return Err(invalid("Column names cannot be empty"));
            }
        }

        let mut names: Vec<&str> = columns.iter().map(|(n, _)| n.as_str()).collect();
        names.sort_unstable();
        if let Some(dup) = names.windows(2).find(|w| w[0] == w[1]) {
            return Err(invalid(format!("Duplicate column name '{}'", dup[0])));
        }

        Ok(Self { columns, n_rows })
    }

    /// Returns the shape as (`n_rows`, `n_cols`).
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.n_rows, self.columns.len())
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Returns the column names in declared order.
    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Returns a column by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the column does not exist.
    pub fn column(&self, name: &str) -> Result<&[f32]> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
            .ok_or_else(|| invalid(format!("Column '{name}' not found")))
    }
}

/// Feature matrix plus one categorical label column.
///
/// Labels are class ids (`usize`). Partitions share this type, so a
/// dataset is never mutated after it has been built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    feature_names: Vec<String>,
    label_name: String,
    features: Matrix<f32>,
    labels: Vec<usize>,
}

impl Dataset {
    /// Builds a dataset directly from parts.
    ///
    /// # Errors
    ///
    /// Returns an error if the label count differs from the row count or
    /// the feature names don't match the column count.
    pub fn new(
        feature_names: Vec<String>,
        label_name: impl Into<String>,
        features: Matrix<f32>,
        labels: Vec<usize>,
    ) -> Result<Self> {
        if features.n_rows() != labels.len() {
            return Err(SearchError::dimension_mismatch(
                "labels",
                features.n_rows(),
                labels.len(),
            ));
        }
        if features.n_cols() != feature_names.len() {
            return Err(SearchError::dimension_mismatch(
                "feature_names",
                features.n_cols(),
                feature_names.len(),
            ));
        }
        Ok(Self {
            feature_names,
            label_name: label_name.into(),
            features,
            labels,
        })
    }

    /// Splits a frame into features and the `target_column` labels.
    ///
    /// # Errors
    ///
    /// - `InvalidDataset` if the target column is absent, it is the only
    ///   column, or a label is negative or not integral
    /// - `MissingLabel` if a label is NaN
    ///
    /// # Examples
    ///
    /// ```
    /// use hypergrid::data::{DataFrame, Dataset};
    ///
    /// let df = DataFrame::new(vec![
    ///     ("alcohol".to_string(), vec![13.2, 12.4, 14.1]),
    ///     ("target".to_string(), vec![0.0, 1.0, 2.0]),
    /// ]).expect("valid frame");
    /// let ds = Dataset::from_frame(&df, "target").expect("valid dataset");
    /// assert_eq!(ds.labels(), &[0, 1, 2]);
    /// assert_eq!(ds.feature_names(), &["alcohol".to_string()]);
    /// ```
    pub fn from_frame(frame: &DataFrame, target_column: &str) -> Result<Self> {
        let raw_labels = frame.column(target_column)?;

        let feature_cols: Vec<&(String, Vec<f32>)> = frame
            .columns
            .iter()
            .filter(|(name, _)| name != target_column)
            .collect();
        if feature_cols.is_empty() {
            return Err(invalid(format!(
                "no feature columns besides target '{target_column}'"
            )));
        }

        let labels = raw_labels
            .iter()
            .enumerate()
            .map(|(row, &value)| label_from_f32(row, value))
            .collect::<Result<Vec<usize>>>()?;

        let n_rows = frame.n_rows();
        let mut data = Vec::with_capacity(n_rows * feature_cols.len());
        for row in 0..n_rows {
            for (_, col) in &feature_cols {
                data.push(col[row]);
            }
        }
        let features = Matrix::from_vec(n_rows, feature_cols.len(), data)?;
        let feature_names = feature_cols.iter().map(|(n, _)| n.clone()).collect();

        Self::new(feature_names, target_column, features, labels)
    }

    /// Feature column names.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Label column name.
    #[must_use]
    pub fn label_name(&self) -> &str {
        &self.label_name
    }

    /// Feature matrix, one row per sample.
    #[must_use]
    pub fn features(&self) -> &Matrix<f32> {
        &self.features
    }

    /// Class label per sample.
    #[must_use]
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Number of samples.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.labels.len()
    }

    /// Whether the dataset has no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Samples per class, in label order.
    #[must_use]
    pub fn class_counts(&self) -> BTreeMap<usize, usize> {
        let mut counts = BTreeMap::new();
        for &label in &self.labels {
            *counts.entry(label).or_insert(0) += 1;
        }
        counts
    }

    /// New dataset holding the given rows, in the given order.
    ///
    /// # Panics
    ///
    /// Panics if an index is out of bounds.
    #[must_use]
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            feature_names: self.feature_names.clone(),
            label_name: self.label_name.clone(),
            features: self.features.select_rows(indices),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
        }
    }
}

fn label_from_f32(row: usize, value: f32) -> Result<usize> {
    if value.is_nan() {
        return Err(SearchError::MissingLabel { row });
    }
    if value < 0.0 || value.fract() != 0.0 || !value.is_finite() {
        return Err(invalid(format!(
            "label at row {row} is {value}, expected a non-negative integer class id"
        )));
    }
    Ok(value as usize)
}

fn invalid(message: impl Into<String>) -> SearchError {
    SearchError::InvalidDataset {
        message: message.into(),
    }
}

#[cfg(test)]
#[path = "data_tests.rs"]
mod tests;
