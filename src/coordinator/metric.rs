use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::metrics::{accuracy, precision_recall_f1, Average};

/// Validation metric used to rank models. Higher is better for all of them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Metric {
    /// Unweighted mean of per-class F1; every class counts equally.
    #[default]
    MacroF1,
    WeightedF1,
    MicroF1,
    Accuracy,
    MacroPrecision,
    MacroRecall,
}

impl Metric {
    /// Score predictions against ground truth.
    ///
    /// # Errors
    ///
    /// Returns an error if the slices differ in length or are empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use hypergrid::coordinator::Metric;
    ///
    /// let score = Metric::MacroF1.score(&[0, 0, 1, 1], &[0, 0, 1, 1]).expect("same length");
    /// assert!((score - 1.0).abs() < 1e-12);
    /// ```
    pub fn score(&self, y_true: &[usize], y_pred: &[usize]) -> Result<f64> {
        let prf = |average| precision_recall_f1(y_pred, y_true, average);
        Ok(match self {
            Metric::MacroF1 => prf(Average::Macro)?.2,
            Metric::WeightedF1 => prf(Average::Weighted)?.2,
            Metric::MicroF1 => prf(Average::Micro)?.2,
            Metric::Accuracy => accuracy(y_pred, y_true)?,
            Metric::MacroPrecision => prf(Average::Macro)?.0,
            Metric::MacroRecall => prf(Average::Macro)?.1,
        })
    }

    /// Column name used in reports.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Metric::MacroF1 => "f1_macro",
            Metric::WeightedF1 => "f1_weighted",
            Metric::MicroF1 => "f1_micro",
            Metric::Accuracy => "accuracy",
            Metric::MacroPrecision => "precision_macro",
            Metric::MacroRecall => "recall_macro",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
