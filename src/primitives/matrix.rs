//! Matrix type for 2D data.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SearchError};

/// A 2D matrix (row-major storage).
///
/// Used for feature tables (`Matrix<f32>`) and confusion counts
/// (`Matrix<usize>`).
///
/// # Examples
///
/// ```
/// use hypergrid::primitives::Matrix;
///
/// let m = Matrix::from_vec(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).expect("data length matches rows * cols");
/// assert_eq!(m.shape(), (2, 3));
/// assert_eq!(m.row(1), &[4.0, 5.0, 6.0]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix<T> {
    data: Vec<T>,
    rows: usize,
    cols: usize,
}

impl<T: Copy> Matrix<T> {
    /// Creates a new matrix from a vector of data.
    ///
    /// # Errors
    ///
    /// Returns an error if data length doesn't match rows * cols.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<T>) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(SearchError::DimensionMismatch {
                expected: format!("{rows}x{cols}={} elements", rows * cols),
                actual: format!("{} elements", data.len()),
            });
        }
        Ok(Self { data, rows, cols })
    }

    /// Creates a matrix filled with `value`.
    #[must_use]
    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self {
            data: vec![value; rows * cols],
            rows,
            cols,
        }
    }

    /// Returns the shape as (rows, cols).
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.rows
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn n_cols(&self) -> usize {
        self.cols
    }

    /// Gets element at (row, col).
    ///
    /// # Panics
    ///
    /// Panics if indices are out of bounds.
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> T {
        self.data[row * self.cols + col]
    }

    /// Sets element at (row, col).
    ///
    /// # Panics
    ///
    /// Panics if indices are out of bounds.
    pub fn set(&mut self, row: usize, col: usize, value: T) {
        self.data[row * self.cols + col] = value;
    }

    /// Returns a row as a slice.
    ///
    /// # Panics
    ///
    /// Panics if `row_idx` is out of bounds.
    #[must_use]
    pub fn row(&self, row_idx: usize) -> &[T] {
        let start = row_idx * self.cols;
        &self.data[start..start + self.cols]
    }

    /// Iterates over rows.
    pub fn rows(&self) -> impl Iterator<Item = &[T]> {
        // chunks_exact(0) panics; a zero-column matrix has empty rows
        let cols = self.cols.max(1);
        let n = self.rows;
        self.data
            .chunks_exact(cols)
            .chain(std::iter::repeat(&[][..]))
            .take(n)
    }

    /// Returns a column as a vector.
    #[must_use]
    pub fn column(&self, col_idx: usize) -> Vec<T> {
        (0..self.rows)
            .map(|row| self.data[row * self.cols + col_idx])
            .collect()
    }

    /// Gathers the given rows, in the given order, into a new matrix.
    ///
    /// # Panics
    ///
    /// Panics if any index is out of bounds.
    #[must_use]
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        let mut data = Vec::with_capacity(indices.len() * self.cols);
        for &idx in indices {
            data.extend_from_slice(self.row(idx));
        }
        Self {
            data,
            rows: indices.len(),
            cols: self.cols,
        }
    }

    /// Returns the underlying data as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }
}

impl Matrix<usize> {
    /// Sum of all cells.
    #[must_use]
    pub fn total(&self) -> usize {
        self.data.iter().sum()
    }

    /// Matrix as nested rows, the shape report consumers expect.
    #[must_use]
    pub fn to_nested(&self) -> Vec<Vec<usize>> {
        (0..self.rows).map(|r| self.row(r).to_vec()).collect()
    }
}

#[cfg(test)]
#[path = "matrix_tests.rs"]
mod tests;
