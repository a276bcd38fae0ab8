//! Exhaustive grid expansion.

use std::ops::Index;

use serde::{Deserialize, Serialize};

use super::space::{HyperparameterSet, ParamValue, SearchSpace};
use crate::error::Result;

/// Ordered sequence of hyperparameter sets, one per grid point.
///
/// Position in the grid is the tie-break order used during selection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    sets: Vec<HyperparameterSet>,
}

impl Grid {
    /// Number of grid points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    /// Whether the grid is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Iterate over sets in grid order.
    pub fn iter(&self) -> std::slice::Iter<'_, HyperparameterSet> {
        self.sets.iter()
    }

    /// Sets as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[HyperparameterSet] {
        &self.sets
    }
}

impl Index<usize> for Grid {
    type Output = HyperparameterSet;

    fn index(&self, index: usize) -> &Self::Output {
        &self.sets[index]
    }
}

impl<'a> IntoIterator for &'a Grid {
    type Item = &'a HyperparameterSet;
    type IntoIter = std::slice::Iter<'a, HyperparameterSet>;

    fn into_iter(self) -> Self::IntoIter {
        self.sets.iter()
    }
}

/// Expand a search space into its Cartesian product.
///
/// The first-declared hyperparameter varies slowest. A space with no
/// hyperparameters yields a single empty set.
///
/// # Errors
///
/// `InvalidSearchSpace` if [`SearchSpace::validate`] fails.
///
/// # Example
///
/// ```
/// use hypergrid::search::{generate, SearchSpace};
///
/// let space = SearchSpace::new().add("a", [1, 2]).add("b", ["x", "y"]);
/// let grid = generate(&space).expect("valid space");
/// let rendered: Vec<String> = grid.iter().map(ToString::to_string).collect();
/// assert_eq!(rendered, ["{a=1, b=x}", "{a=1, b=y}", "{a=2, b=x}", "{a=2, b=y}"]);
/// ```
pub fn generate(space: &SearchSpace) -> Result<Grid> {
    space.validate()?;

    let mut configs: Vec<Vec<(String, ParamValue)>> = vec![Vec::new()];

    for (name, values) in space.iter() {
        let mut new_configs = Vec::with_capacity(configs.len() * values.len());
        for config in &configs {
            for value in values {
                let mut new_config = config.clone();
                new_config.push((name.to_string(), value.clone()));
                new_configs.push(new_config);
            }
        }
        configs = new_configs;
    }

    Ok(Grid {
        sets: configs
            .into_iter()
            .map(HyperparameterSet::from_entries)
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SearchError;

    #[test]
    fn test_generate_slowest_first_order() {
        let space = SearchSpace::new().add("a", [1, 2]).add("b", ["x", "y"]);
        let grid = generate(&space).expect("valid");
        let pairs: Vec<(i64, String)> = grid
            .iter()
            .map(|s| {
                (
                    s.get("a").and_then(ParamValue::as_i64).expect("a set"),
                    s.get("b").and_then(ParamValue::as_str).expect("b set").to_string(),
                )
            })
            .collect();
        assert_eq!(
            pairs,
            vec![
                (1, "x".to_string()),
                (1, "y".to_string()),
                (2, "x".to_string()),
                (2, "y".to_string()),
            ]
        );
    }

    #[test]
    fn test_generate_single_candidate() {
        let space = SearchSpace::new().add("n_estimators", [10]);
        let grid = generate(&space).expect("valid");
        assert_eq!(grid.len(), 1);
        assert_eq!(grid[0].to_string(), "{n_estimators=10}");
    }

    #[test]
    fn test_generate_empty_space() {
        let grid = generate(&SearchSpace::new()).expect("valid");
        assert_eq!(grid.len(), 1);
        assert!(grid[0].is_empty());
    }

    #[test]
    fn test_generate_rejects_empty_candidates() {
        let space = SearchSpace::new().add("a", [1]).add("b", Vec::<i64>::new());
        assert!(matches!(
            generate(&space),
            Err(SearchError::InvalidSearchSpace { .. })
        ));
    }

    #[test]
    fn test_generate_entries_follow_declared_order() {
        let space = SearchSpace::new()
            .add("n_estimators", [10, 50])
            .add("max_depth", [ParamValue::Int(5), ParamValue::None]);
        let grid = generate(&space).expect("valid");
        for set in &grid {
            let names: Vec<&str> = set.iter().map(|(n, _)| n).collect();
            assert_eq!(names, vec!["n_estimators", "max_depth"]);
        }
        assert_eq!(grid[3].to_string(), "{n_estimators=50, max_depth=None}");
    }
}
