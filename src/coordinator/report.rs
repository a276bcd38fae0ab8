use serde::{Deserialize, Serialize};

use super::{Metric, ScoreRecord, ScoringFailure, Selection, TrainingFailure};
use crate::error::Result;
use crate::search::ParamValue;

/// Everything the search produced except the models themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchReport {
    pub metric: Metric,
    /// One record per scored model, in grid order.
    pub records: Vec<ScoreRecord>,
    pub training_failures: Vec<TrainingFailure>,
    pub scoring_failures: Vec<ScoringFailure>,
    pub best_grid_index: usize,
    pub best_score: f64,
}

/// Hyperparameter columns followed by the score column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultsTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<ParamValue>>,
}

impl SearchReport {
    /// Assemble the report from the fan-out failures and the selection.
    #[must_use]
    pub fn new<M>(metric: Metric, training_failures: Vec<TrainingFailure>, selection: &Selection<M>) -> Self {
        Self {
            metric,
            records: selection.records.clone(),
            training_failures,
            scoring_failures: selection.scoring_failures.clone(),
            best_grid_index: selection.best.grid_index,
            best_score: selection.best_score,
        }
    }

    /// Record of the winning model.
    #[must_use]
    pub fn best(&self) -> Option<&ScoreRecord> {
        self.records
            .iter()
            .find(|r| r.grid_index == self.best_grid_index)
    }

    /// Pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// `Serialization` if encoding fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// One row per scored model: its hyperparameter values, then the score.
    ///
    /// # Examples
    ///
    /// ```
    /// use hypergrid::prelude::*;
    ///
    /// let df = make_blobs(&[10, 10], 2, 0.3, 1).expect("blobs");
    /// let out = Pipeline::new(
    ///     PipelineConfig::default()
    ///         .with_search_space(SearchSpace::new().add("n_estimators", [2, 4]).add("max_depth", [3])),
    ///     RandomForestFactory::new(0),
    /// )
    /// .run(&df)
    /// .expect("pipeline");
    ///
    /// let table = out.search.table();
    /// assert_eq!(table.columns, ["n_estimators", "max_depth", "f1_macro"]);
    /// assert_eq!(table.rows.len(), 2);
    /// ```
    #[must_use]
    pub fn table(&self) -> ResultsTable {
        let mut columns: Vec<String> = self
            .records
            .first()
            .map(|r| r.hyperparameters.iter().map(|(name, _)| name.to_string()).collect())
            .unwrap_or_default();
        columns.push(self.metric.name().to_string());

        let rows = self
            .records
            .iter()
            .map(|r| {
                let mut row: Vec<ParamValue> =
                    r.hyperparameters.iter().map(|(_, v)| v.clone()).collect();
                row.push(ParamValue::Float(r.score));
                row
            })
            .collect();

        ResultsTable { columns, rows }
    }
}
