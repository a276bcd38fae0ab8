use std::fmt;

use serde::{Deserialize, Serialize};

use super::classification::{confusion_matrix, labels_union, ClassCounts};
use crate::error::Result;
use crate::primitives::Matrix;

/// Precision, recall, F1 and support for one label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub label: usize,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// True samples with this label.
    pub support: usize,
}

/// Averaged precision, recall and F1 over the report's labels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AverageMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Confusion matrix and per-class metrics for one set of predictions.
///
/// Rows of [`confusion`](Self::confusion) are true labels and columns are
/// predicted labels, both in [`labels`](Self::labels) order. Labels are the
/// sorted union of the true and predicted labels, so a label that was only
/// ever predicted still gets a row (with zero support).
///
/// # Examples
///
/// ```
/// use hypergrid::metrics::ClassificationReport;
///
/// let report = ClassificationReport::new(&[0, 1, 1, 1], &[0, 0, 1, 1]).expect("same length");
/// assert_eq!(report.labels, vec![0, 1]);
/// assert_eq!(report.confusion.to_nested(), vec![vec![1, 1], vec![0, 2]]);
/// assert!((report.accuracy - 0.75).abs() < 1e-12);
/// assert_eq!(report.support, 4);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub labels: Vec<usize>,
    pub confusion: Matrix<usize>,
    pub per_class: Vec<ClassMetrics>,
    pub accuracy: f64,
    pub macro_avg: AverageMetrics,
    pub weighted_avg: AverageMetrics,
    /// Total samples.
    pub support: usize,
}

impl ClassificationReport {
    /// Build a report from predictions and ground truth.
    ///
    /// # Errors
    ///
    /// Returns an error if the slices differ in length or are empty.
    pub fn new(y_pred: &[usize], y_true: &[usize]) -> Result<Self> {
        let labels = labels_union(y_pred, y_true);
        let confusion = confusion_matrix(y_pred, y_true, &labels)?;
        let counts = ClassCounts::compute(y_pred, y_true, &labels);
        let n = labels.len();

        let per_class: Vec<ClassMetrics> = labels
            .iter()
            .enumerate()
            .map(|(i, &label)| {
                let (precision, recall, f1) = counts.per_class(i);
                ClassMetrics {
                    label,
                    precision,
                    recall,
                    f1,
                    support: counts.support[i],
                }
            })
            .collect();

        let support = y_true.len();
        let correct: usize = counts.tp.iter().sum();

        Ok(Self {
            macro_avg: average(&per_class, support, |_| 1.0 / n as f64),
            weighted_avg: average(&per_class, support, |m| m.support as f64 / support as f64),
            accuracy: correct as f64 / support as f64,
            labels,
            confusion,
            per_class,
            support,
        })
    }

    /// Metrics for one label, if it appears in the report.
    #[must_use]
    pub fn class(&self, label: usize) -> Option<&ClassMetrics> {
        self.per_class.iter().find(|m| m.label == label)
    }
}

fn average(
    per_class: &[ClassMetrics],
    support: usize,
    weight: impl Fn(&ClassMetrics) -> f64,
) -> AverageMetrics {
    let mut avg = AverageMetrics {
        precision: 0.0,
        recall: 0.0,
        f1: 0.0,
        support,
    };
    for m in per_class {
        let w = weight(m);
        avg.precision += w * m.precision;
        avg.recall += w * m.recall;
        avg.f1 += w * m.f1;
    }
    avg
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>14} {:>9} {:>9} {:>9} {:>9}", "", "precision", "recall", "f1-score", "support")?;
        writeln!(f)?;
        for m in &self.per_class {
            writeln!(
                f,
                "{:>14} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                m.label, m.precision, m.recall, m.f1, m.support
            )?;
        }
        writeln!(f)?;
        writeln!(f, "{:>14} {:>9} {:>9} {:>9.2} {:>9}", "accuracy", "", "", self.accuracy, self.support)?;
        for (name, avg) in [("macro avg", &self.macro_avg), ("weighted avg", &self.weighted_avg)] {
            writeln!(
                f,
                "{:>14} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                name, avg.precision, avg.recall, avg.f1, avg.support
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{f1_score, Average};

    #[test]
    fn test_report_matches_averaged_metrics() {
        let y_true = [0, 0, 1, 1, 2, 2, 2];
        let y_pred = [0, 1, 1, 1, 2, 0, 2];
        let report = ClassificationReport::new(&y_pred, &y_true).expect("ok");

        let macro_f1 = f1_score(&y_pred, &y_true, Average::Macro).expect("ok");
        let weighted_f1 = f1_score(&y_pred, &y_true, Average::Weighted).expect("ok");
        assert!((report.macro_avg.f1 - macro_f1).abs() < 1e-12);
        assert!((report.weighted_avg.f1 - weighted_f1).abs() < 1e-12);
        assert_eq!(report.confusion.total(), 7);
        assert_eq!(report.class(2).map(|m| m.support), Some(3));
    }

    #[test]
    fn test_report_predicted_only_label_gets_a_row() {
        let report = ClassificationReport::new(&[4, 4, 9], &[4, 4, 4]).expect("ok");
        assert_eq!(report.labels, vec![4, 9]);
        let nine = report.class(9).expect("row for 9");
        assert_eq!(nine.support, 0);
        assert_eq!(nine.f1, 0.0);
        assert_eq!(report.confusion.to_nested(), vec![vec![2, 1], vec![0, 0]]);
    }

    #[test]
    fn test_report_confusion_agrees_with_confusion_matrix() {
        let y_true = [3, 3, 7, 7, 1];
        let y_pred = [3, 7, 7, 1, 1];
        let report = ClassificationReport::new(&y_pred, &y_true).expect("ok");
        let labels = crate::metrics::labels_union(&y_pred, &y_true);
        let cm = crate::metrics::confusion_matrix(&y_pred, &y_true, &labels).expect("ok");
        assert_eq!(report.confusion, cm);
    }

    #[test]
    fn test_report_rejects_empty_and_mismatched_inputs() {
        assert!(ClassificationReport::new(&[], &[]).is_err());
        assert!(ClassificationReport::new(&[0, 1], &[0]).is_err());
    }

    #[test]
    fn test_report_display_has_summary_rows() {
        let report = ClassificationReport::new(&[0, 1], &[0, 1]).expect("ok");
        let text = report.to_string();
        assert!(text.contains("precision"));
        assert!(text.contains("accuracy"));
        assert!(text.contains("macro avg"));
        assert!(text.contains("weighted avg"));
    }

    #[test]
    fn test_report_serializes_to_json() {
        let report = ClassificationReport::new(&[0, 1, 1], &[0, 1, 0]).expect("ok");
        let json = serde_json::to_value(&report).expect("json");
        assert_eq!(json["labels"], serde_json::json!([0, 1]));
        assert_eq!(json["support"], serde_json::json!(3));
        assert!(json["per_class"].is_array());
    }
}
