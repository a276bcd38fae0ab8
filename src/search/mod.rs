//! Search space definition and grid expansion.
//!
//! A [`SearchSpace`] lists candidate values per hyperparameter in declared
//! order; [`generate`] expands it into the ordered [`Grid`] of
//! [`HyperparameterSet`]s that the trainer fans out over.
//!
//! # Example
//!
//! ```
//! use hypergrid::search::{generate, ParamValue, SearchSpace};
//!
//! let space = SearchSpace::new()
//!     .add("n_estimators", [10, 50])
//!     .add("max_depth", [ParamValue::Int(5), ParamValue::None]);
//!
//! let grid = generate(&space).expect("valid space");
//! assert_eq!(grid.len(), 4);
//! assert_eq!(grid[1].to_string(), "{n_estimators=10, max_depth=None}");
//! ```

mod grid;
mod space;

pub use grid::{generate, Grid};
pub use space::{HyperparameterSet, ParamValue, SearchSpace};
