//! Evaluation metrics for classifiers.
//!
//! Labels are arbitrary class ids. Every metric works over the sorted
//! union of the true and predicted labels it is given, so a partition
//! that never sees some class simply has fewer rows in its reports.

pub mod classification;
mod report;

pub use classification::{
    accuracy, confusion_matrix, f1_score, labels_union, precision, precision_recall_f1, recall,
    Average,
};
pub use report::{AverageMetrics, ClassMetrics, ClassificationReport};
