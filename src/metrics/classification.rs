//! Classification metrics for evaluating classifier performance.
//!
//! Provides accuracy, precision, recall, F1-score, and confusion matrix
//! computation for multi-class classification tasks. Arguments follow the
//! `(y_pred, y_true)` order used throughout this module. A class with no
//! predicted (or no true) samples contributes 0.0 instead of dividing by
//! zero.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SearchError};
use crate::primitives::Matrix;

/// Averaging strategy for multi-class metrics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Average {
    /// Calculate metrics for each label, return unweighted mean.
    Macro,
    /// Calculate metrics globally by counting total TP, FP, FN.
    Micro,
    /// Weighted mean by support (number of true instances per label).
    Weighted,
}

/// Sorted, deduplicated labels appearing in either slice.
///
/// # Examples
///
/// ```
/// use hypergrid::metrics::labels_union;
///
/// assert_eq!(labels_union(&[4, 1, 4], &[1, 9]), vec![1, 4, 9]);
/// ```
#[must_use]
pub fn labels_union(y_pred: &[usize], y_true: &[usize]) -> Vec<usize> {
    let mut labels: Vec<usize> = y_true.iter().chain(y_pred).copied().collect();
    labels.sort_unstable();
    labels.dedup();
    labels
}

/// Compute classification accuracy.
///
/// accuracy = `correct_predictions` / `total_predictions`
///
/// # Errors
///
/// Returns an error if the slices differ in length or are empty.
///
/// # Examples
///
/// ```
/// use hypergrid::metrics::classification::accuracy;
///
/// let y_true = vec![0, 1, 2, 0, 1, 2];
/// let y_pred = vec![0, 2, 1, 0, 0, 1];
/// let acc = accuracy(&y_pred, &y_true).expect("same length");
/// assert!((acc - 1.0 / 3.0).abs() < 1e-12);
/// ```
pub fn accuracy(y_pred: &[usize], y_true: &[usize]) -> Result<f64> {
    check_inputs(y_pred, y_true)?;
    let correct = y_pred
        .iter()
        .zip(y_true.iter())
        .filter(|(p, t)| p == t)
        .count();
    Ok(correct as f64 / y_true.len() as f64)
}

/// Compute precision score: TP / (TP + FP).
///
/// # Errors
///
/// Returns an error if the slices differ in length or are empty.
pub fn precision(y_pred: &[usize], y_true: &[usize], average: Average) -> Result<f64> {
    Ok(precision_recall_f1(y_pred, y_true, average)?.0)
}

/// Compute recall score: TP / (TP + FN).
///
/// # Errors
///
/// Returns an error if the slices differ in length or are empty.
pub fn recall(y_pred: &[usize], y_true: &[usize], average: Average) -> Result<f64> {
    Ok(precision_recall_f1(y_pred, y_true, average)?.1)
}

/// Compute F1 score, the harmonic mean of precision and recall.
///
/// # Errors
///
/// Returns an error if the slices differ in length or are empty.
///
/// # Examples
///
/// ```
/// use hypergrid::metrics::classification::{f1_score, Average};
///
/// let y_true = vec![0, 0, 1, 1];
/// let y_pred = vec![0, 1, 1, 1];
/// let f1 = f1_score(&y_pred, &y_true, Average::Macro).expect("same length");
/// // class 0: p=1, r=0.5, f1=2/3; class 1: p=2/3, r=1, f1=0.8
/// assert!((f1 - (2.0 / 3.0 + 0.8) / 2.0).abs() < 1e-12);
/// ```
pub fn f1_score(y_pred: &[usize], y_true: &[usize], average: Average) -> Result<f64> {
    Ok(precision_recall_f1(y_pred, y_true, average)?.2)
}

/// Precision, recall and F1 under one averaging strategy.
///
/// # Errors
///
/// Returns an error if the slices differ in length or are empty.
pub fn precision_recall_f1(
    y_pred: &[usize],
    y_true: &[usize],
    average: Average,
) -> Result<(f64, f64, f64)> {
    check_inputs(y_pred, y_true)?;
    let labels = labels_union(y_pred, y_true);
    let counts = ClassCounts::compute(y_pred, y_true, &labels);

    let triple = match average {
        Average::Micro => {
            let tp: usize = counts.tp.iter().sum();
            let fp: usize = counts.fp.iter().sum();
            let fn_: usize = counts.fn_.iter().sum();
            (ratio(tp, tp + fp), ratio(tp, tp + fn_), class_f1(tp, fp, fn_))
        }
        Average::Macro => {
            let n = labels.len() as f64;
            let (p, r, f) = (0..labels.len())
                .map(|i| counts.per_class(i))
                .fold((0.0, 0.0, 0.0), |acc, (p, r, f)| (acc.0 + p, acc.1 + r, acc.2 + f));
            (p / n, r / n, f / n)
        }
        Average::Weighted => {
            let total: usize = counts.support.iter().sum();
            let mut acc = (0.0, 0.0, 0.0);
            for i in 0..labels.len() {
                let w = ratio(counts.support[i], total);
                let (p, r, f) = counts.per_class(i);
                acc = (acc.0 + w * p, acc.1 + w * r, acc.2 + w * f);
            }
            acc
        }
    };
    Ok(triple)
}

/// Compute confusion matrix over `labels`.
///
/// Element `[i, j]` counts samples whose true label is `labels[i]` and
/// predicted label is `labels[j]`. Pairs with a label outside `labels`
/// are not counted.
///
/// # Errors
///
/// Returns an error if the slices differ in length or are empty.
///
/// # Examples
///
/// ```
/// use hypergrid::metrics::classification::{confusion_matrix, labels_union};
///
/// let y_true = vec![0, 0, 5, 5, 9, 9];
/// let y_pred = vec![0, 5, 5, 5, 9, 0];
/// let labels = labels_union(&y_pred, &y_true);
/// let cm = confusion_matrix(&y_pred, &y_true, &labels).expect("same length");
/// assert_eq!(cm.to_nested(), vec![vec![1, 1, 0], vec![0, 2, 0], vec![1, 0, 1]]);
/// ```
pub fn confusion_matrix(y_pred: &[usize], y_true: &[usize], labels: &[usize]) -> Result<Matrix<usize>> {
    check_inputs(y_pred, y_true)?;
    let n = labels.len();
    let mut cm = Matrix::filled(n, n, 0usize);
    for (t, p) in y_true.iter().zip(y_pred) {
        if let (Ok(i), Ok(j)) = (labels.binary_search(t), labels.binary_search(p)) {
            cm.set(i, j, cm.get(i, j) + 1);
        }
    }
    Ok(cm)
}

/// Per-label TP, FP, FN and support, indexed like the label list.
pub(crate) struct ClassCounts {
    pub tp: Vec<usize>,
    pub fp: Vec<usize>,
    pub fn_: Vec<usize>,
    pub support: Vec<usize>,
}

impl ClassCounts {
    /// `labels` must be sorted and contain every label in both slices.
    pub(crate) fn compute(y_pred: &[usize], y_true: &[usize], labels: &[usize]) -> Self {
        let n = labels.len();
        let mut counts = Self {
            tp: vec![0; n],
            fp: vec![0; n],
            fn_: vec![0; n],
            support: vec![0; n],
        };
        for (t, p) in y_true.iter().zip(y_pred) {
            let (Ok(ti), Ok(pi)) = (labels.binary_search(t), labels.binary_search(p)) else {
                continue;
            };
            counts.support[ti] += 1;
            if ti == pi {
                counts.tp[ti] += 1;
            } else {
                counts.fp[pi] += 1;
                counts.fn_[ti] += 1;
            }
        }
        counts
    }

    /// (precision, recall, f1) for label index `i`.
    pub(crate) fn per_class(&self, i: usize) -> (f64, f64, f64) {
        (
            ratio(self.tp[i], self.tp[i] + self.fp[i]),
            ratio(self.tp[i], self.tp[i] + self.fn_[i]),
            class_f1(self.tp[i], self.fp[i], self.fn_[i]),
        )
    }
}

/// F1 = 2TP / (2TP + FP + FN), 0.0 when undefined.
fn class_f1(tp: usize, fp: usize, fn_: usize) -> f64 {
    ratio(2 * tp, 2 * tp + fp + fn_)
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

pub(crate) fn check_inputs(y_pred: &[usize], y_true: &[usize]) -> Result<()> {
    if y_pred.len() != y_true.len() {
        return Err(SearchError::dimension_mismatch("y_true", y_true.len(), y_pred.len()));
    }
    if y_true.is_empty() {
        return Err(SearchError::InvalidDataset {
            message: "cannot compute metrics on an empty label set".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
#[path = "classification_tests.rs"]
mod tests;
