//! Core compute primitives.
//!
//! Dense row-major storage shared by datasets, estimators and reports.

mod matrix;

pub use matrix::Matrix;
