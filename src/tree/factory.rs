use crate::error::{Result, SearchError};
use crate::search::{HyperparameterSet, ParamValue};
use crate::traits::ClassifierFactory;

use super::{MaxFeatures, RandomForestClassifier};

const PARAMETER_NAMES: [&str; 3] = ["n_estimators", "max_depth", "max_features"];

/// Builds [`RandomForestClassifier`]s from grid points.
///
/// Accepts `n_estimators` (integer >= 1), `max_depth` (integer >= 1 or
/// `None` for unlimited) and `max_features` (`None`, `"sqrt"`, `"log2"`,
/// an integer count >= 1 or a fraction in (0, 1]). Names missing from a
/// set keep the forest defaults: 100 trees, unlimited depth, `sqrt`.
#[derive(Debug, Clone)]
pub struct RandomForestFactory {
    random_state: u64,
}

impl Default for RandomForestFactory {
    fn default() -> Self {
        Self::new(42)
    }
}

impl RandomForestFactory {
    /// Every forest built by this factory is seeded with `random_state`.
    #[must_use]
    pub fn new(random_state: u64) -> Self {
        Self { random_state }
    }

    #[must_use]
    pub fn random_state(&self) -> u64 {
        self.random_state
    }
}

impl ClassifierFactory for RandomForestFactory {
    type Model = RandomForestClassifier;

    fn identity(&self) -> &str {
        "random_forest"
    }

    fn parameter_names(&self) -> &[&'static str] {
        &PARAMETER_NAMES
    }

    fn settings(&self) -> String {
        format!("random_state={}", self.random_state)
    }

    fn build(&self, hyperparameters: &HyperparameterSet) -> Result<RandomForestClassifier> {
        let mut forest = RandomForestClassifier::new(100).with_random_state(self.random_state);

        for (name, value) in hyperparameters.iter() {
            forest = match name {
                "n_estimators" => forest.with_n_estimators(positive_int(name, value)?),
                "max_depth" if value.is_none() => forest.with_max_depth_opt(None),
                "max_depth" => forest.with_max_depth(positive_int(name, value)?),
                "max_features" => forest.with_max_features(parse_max_features(value)?),
                other => {
                    return Err(rejected(
                        other,
                        value,
                        &format!("one of {}", PARAMETER_NAMES.join(", ")),
                    ))
                }
            };
        }
        Ok(forest)
    }
}

fn positive_int(name: &str, value: &ParamValue) -> Result<usize> {
    match value.as_i64() {
        Some(v) if v >= 1 => Ok(v as usize),
        _ => Err(rejected(name, value, "an integer >= 1")),
    }
}

fn parse_max_features(value: &ParamValue) -> Result<MaxFeatures> {
    const CONSTRAINT: &str = "None, \"sqrt\", \"log2\", an integer >= 1 or a fraction in (0, 1]";
    match value {
        ParamValue::None => Ok(MaxFeatures::All),
        ParamValue::Str(s) if s == "sqrt" => Ok(MaxFeatures::Sqrt),
        ParamValue::Str(s) if s == "log2" => Ok(MaxFeatures::Log2),
        ParamValue::Int(k) if *k >= 1 => Ok(MaxFeatures::Count(*k as usize)),
        ParamValue::Float(f) if *f > 0.0 && *f <= 1.0 => Ok(MaxFeatures::Fraction(*f)),
        _ => Err(rejected("max_features", value, CONSTRAINT)),
    }
}

fn rejected(param: &str, value: &ParamValue, constraint: &str) -> SearchError {
    SearchError::InvalidHyperparameter {
        param: param.to_string(),
        value: value.to_string(),
        constraint: constraint.to_string(),
    }
}
