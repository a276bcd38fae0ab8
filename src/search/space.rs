//! Hyperparameter values, search spaces and concrete assignments.

use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{Result, SearchError};

/// A concrete, discrete hyperparameter value.
///
/// Human-readable formats (JSON configs and reports) write plain values:
/// `null`, `true`, `5`, `0.5` and `"sqrt"` map to `None`, `Bool`, `Int`,
/// `Float` and `Str`. Binary formats (fingerprints, cache entries) write
/// an explicit variant tag, since they cannot infer the variant back.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    /// Explicit absence ("no limit", "use the backend default").
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl ParamValue {
    /// Get as f64 if numeric.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Get as i64 if integer.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as bool.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(v) => Some(v),
            _ => None,
        }
    }

    /// Whether this is the explicit `None` value.
    #[must_use]
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<usize> for ParamValue {
    fn from(v: usize) -> Self {
        Self::Int(v as i64)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::None, Into::into)
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Str(v) => f.write_str(v),
        }
    }
}

/// Variant-tagged form used by binary formats.
#[derive(Serialize)]
#[serde(rename = "ParamValue")]
enum TaggedRef<'a> {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(&'a str),
}

#[derive(Deserialize)]
#[serde(rename = "ParamValue")]
enum Tagged {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Serialize for ParamValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            return match self {
                Self::None => serializer.serialize_none(),
                Self::Bool(v) => serializer.serialize_bool(*v),
                Self::Int(v) => serializer.serialize_i64(*v),
                Self::Float(v) => serializer.serialize_f64(*v),
                Self::Str(v) => serializer.serialize_str(v),
            };
        }
        let tagged = match self {
            Self::None => TaggedRef::None,
            Self::Bool(v) => TaggedRef::Bool(*v),
            Self::Int(v) => TaggedRef::Int(*v),
            Self::Float(v) => TaggedRef::Float(*v),
            Self::Str(v) => TaggedRef::Str(v),
        };
        tagged.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ParamValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        if !deserializer.is_human_readable() {
            return Ok(match Tagged::deserialize(deserializer)? {
                Tagged::None => Self::None,
                Tagged::Bool(v) => Self::Bool(v),
                Tagged::Int(v) => Self::Int(v),
                Tagged::Float(v) => Self::Float(v),
                Tagged::Str(v) => Self::Str(v),
            });
        }
        deserializer.deserialize_any(PlainVisitor)
    }
}

struct PlainVisitor;

impl<'de> Visitor<'de> for PlainVisitor {
    type Value = ParamValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("null, a boolean, a number or a string")
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<ParamValue, E> {
        Ok(ParamValue::None)
    }

    fn visit_none<E: de::Error>(self) -> std::result::Result<ParamValue, E> {
        Ok(ParamValue::None)
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> std::result::Result<ParamValue, E> {
        Ok(ParamValue::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<ParamValue, E> {
        Ok(ParamValue::Int(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<ParamValue, E> {
        i64::try_from(v)
            .map(ParamValue::Int)
            .map_err(|_| E::invalid_value(de::Unexpected::Unsigned(v), &self))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<ParamValue, E> {
        Ok(ParamValue::Float(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<ParamValue, E> {
        Ok(ParamValue::Str(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> std::result::Result<ParamValue, E> {
        Ok(ParamValue::Str(v))
    }
}

/// Ordered mapping from hyperparameter name to candidate values.
///
/// Declaration order matters: it fixes grid order (first-declared
/// hyperparameter varies slowest).
///
/// # Example
///
/// ```
/// use hypergrid::search::SearchSpace;
///
/// let space = SearchSpace::new()
///     .add("max_depth", [50, 100])
///     .add("max_features", [None, Some("sqrt")]);
///
/// assert_eq!(space.len(), 2);
/// assert_eq!(space.grid_size(), 4);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchSpace {
    params: Vec<(String, Vec<ParamValue>)>,
}

impl SearchSpace {
    /// Create an empty search space.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a hyperparameter with its candidate values.
    #[must_use]
    pub fn add<I, V>(mut self, name: impl Into<String>, candidates: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<ParamValue>,
    {
        self.params
            .push((name.into(), candidates.into_iter().map(Into::into).collect()));
        self
    }

    /// The random-forest space searched by default: depth, feature
    /// subsampling and forest size, two candidates each.
    #[must_use]
    pub fn random_forest_default() -> Self {
        Self::new()
            .add("max_depth", [50, 100])
            .add("max_features", [None, Some("sqrt")])
            .add("n_estimators", [100, 2000])
    }

    /// Number of hyperparameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Check if space has no hyperparameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Hyperparameter names in declared order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.params.iter().map(|(n, _)| n.as_str())
    }

    /// Candidates for one hyperparameter.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&[ParamValue]> {
        self.params
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, c)| c.as_slice())
    }

    /// Iterate over `(name, candidates)` in declared order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[ParamValue])> {
        self.params.iter().map(|(n, c)| (n.as_str(), c.as_slice()))
    }

    /// Number of combinations the grid will hold.
    #[must_use]
    pub fn grid_size(&self) -> usize {
        self.params.iter().map(|(_, c)| c.len()).product()
    }

    /// Check structural invariants.
    ///
    /// # Errors
    ///
    /// `InvalidSearchSpace` on an empty or duplicated name, an empty
    /// candidate list, a repeated candidate, or a non-finite float.
    pub fn validate(&self) -> Result<()> {
        for (i, (name, candidates)) in self.params.iter().enumerate() {
            if name.is_empty() {
                return Err(invalid_space("hyperparameter names cannot be empty"));
            }
            if self.params[..i].iter().any(|(other, _)| other == name) {
                return Err(invalid_space(format!("hyperparameter '{name}' declared twice")));
            }
            if candidates.is_empty() {
                return Err(invalid_space(format!("candidate list for '{name}' is empty")));
            }
            for (j, value) in candidates.iter().enumerate() {
                if let ParamValue::Float(v) = value {
                    if !v.is_finite() {
                        return Err(invalid_space(format!(
                            "candidate {v} for '{name}' is not finite"
                        )));
                    }
                }
                if candidates[..j].contains(value) {
                    return Err(invalid_space(format!(
                        "candidate {value} for '{name}' is listed twice"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Check that every name is one the estimator backend accepts.
    ///
    /// # Errors
    ///
    /// `InvalidSearchSpace` naming the first unknown hyperparameter.
    pub fn validate_names(&self, accepted: &[&str]) -> Result<()> {
        match self.names().find(|name| !accepted.contains(name)) {
            Some(unknown) => Err(invalid_space(format!(
                "hyperparameter '{unknown}' is not accepted by the estimator (accepted: {})",
                accepted.join(", ")
            ))),
            None => Ok(()),
        }
    }
}

/// One concrete assignment of a value to each hyperparameter.
///
/// Only produced by grid generation; entry order follows the search
/// space's declared order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HyperparameterSet {
    values: Vec<(String, ParamValue)>,
}

impl HyperparameterSet {
    pub(crate) fn from_entries(values: Vec<(String, ParamValue)>) -> Self {
        Self { values }
    }

    /// Get a parameter value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Iterate over `(name, value)` in declared order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.values.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Number of assigned hyperparameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no hyperparameter is assigned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Display for HyperparameterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<String> = self
            .values
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        write!(f, "{{{}}}", params.join(", "))
    }
}

fn invalid_space(reason: impl Into<String>) -> SearchError {
    SearchError::InvalidSearchSpace {
        reason: reason.into(),
    }
}
