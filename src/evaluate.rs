//! Final evaluation of the selected model on every partition.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;
use crate::metrics::ClassificationReport;
use crate::model_selection::{Partition, Partitions};
use crate::train::TrainedModel;
use crate::traits::Classifier;

/// One [`ClassificationReport`] per partition.
///
/// The label set of each report is what was observed in that partition
/// (true and predicted labels), so the three confusion matrices may
/// differ in size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub train: ClassificationReport,
    pub validation: ClassificationReport,
    pub test: ClassificationReport,
}

impl EvaluationReport {
    #[must_use]
    pub fn get(&self, partition: Partition) -> &ClassificationReport {
        match partition {
            Partition::Train => &self.train,
            Partition::Validation => &self.validation,
            Partition::Test => &self.test,
        }
    }

    /// Pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// `Serialization` if encoding fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Predict every partition with `model` and report on each.
///
/// The model is only read; nothing is refitted.
///
/// # Errors
///
/// Prediction errors from the model, or metric errors for an empty
/// partition.
///
/// # Examples
///
/// ```
/// use hypergrid::prelude::*;
///
/// let df = make_blobs(&[15, 15], 2, 0.3, 5).expect("blobs");
/// let ds = Dataset::from_frame(&df, "target").expect("dataset");
/// let parts = split(&ds, 0.25, 0.25, 42).expect("split");
///
/// let grid = generate(&SearchSpace::new().add("n_estimators", [5])).expect("grid");
/// let factory = RandomForestFactory::new(1);
/// let model = Trainer::new(&factory)
///     .train(0, parts.train.features(), parts.train.labels(), &grid[0])
///     .expect("trained");
///
/// let report = evaluate(&model, &parts).expect("evaluated");
/// assert_eq!(report.test.support, parts.test.n_samples());
/// ```
pub fn evaluate<M: Classifier>(
    model: &TrainedModel<M>,
    partitions: &Partitions,
) -> Result<EvaluationReport> {
    let report_on = |partition: Partition| -> Result<ClassificationReport> {
        let data = partitions.get(partition);
        let predictions = model.predict(data.features())?;
        let report = ClassificationReport::new(&predictions, data.labels())?;
        info!(
            %partition,
            samples = report.support,
            accuracy = report.accuracy,
            f1_macro = report.macro_avg.f1,
            "evaluated"
        );
        Ok(report)
    };

    Ok(EvaluationReport {
        train: report_on(Partition::Train)?,
        validation: report_on(Partition::Validation)?,
        test: report_on(Partition::Test)?,
    })
}
