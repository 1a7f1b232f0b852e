//! Dense 2-D buffer used by every layer
//!
//! A `Matrix` is a row-major `f32` buffer. Layer buffers put one sample per
//! row, so `rows` is the batch size and `cols` the number of features per
//! sample. Arithmetic never broadcasts implicitly; the one broadcast layers
//! need (bias rows) is the explicit [`Matrix::add_row`].

use crate::error::{NetworkError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Row-major `rows × cols` buffer with contiguous storage.
///
/// Invariant: `data.len() == rows * cols`. Constructors and deserialization
/// enforce it, so every operation can index without bounds surprises.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawMatrix")]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

#[derive(Deserialize)]
struct RawMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl TryFrom<RawMatrix> for Matrix {
    type Error = NetworkError;

    fn try_from(raw: RawMatrix) -> Result<Self> {
        Matrix::create(raw.data, raw.rows, raw.cols)
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.rows, self.cols)
    }
}

impl Matrix {
    /// Zero-filled buffer of the given shape.
    pub fn with(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// Wrap an existing buffer. Takes ownership of `data`, so the caller can
    /// no longer alias it.
    pub fn create(data: Vec<f32>, rows: usize, cols: usize) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(NetworkError::shape_mismatch(
                "create",
                format!("{} elements ({}x{})", rows * cols, rows, cols),
                format!("{} elements", data.len()),
            ));
        }
        Ok(Self { rows, cols, data })
    }

    /// Build a matrix from equally sized rows.
    pub fn from_rows(rows: &[Vec<f32>]) -> Result<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(rows.len() * cols);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != cols {
                return Err(NetworkError::shape_mismatch(
                    "from_rows",
                    format!("{} columns", cols),
                    format!("{} columns in row {}", row.len(), i),
                ));
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            rows: rows.len(),
            cols,
            data,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    /// Borrow one row (one sample of a batch).
    pub fn row(&self, index: usize) -> &[f32] {
        &self.data[index * self.cols..(index + 1) * self.cols]
    }

    pub fn row_mut(&mut self, index: usize) -> &mut [f32] {
        let cols = self.cols;
        &mut self.data[index * cols..(index + 1) * cols]
    }

    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.data[row * self.cols + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: f32) {
        self.data[row * self.cols + col] = value;
    }

    fn ensure_same_shape(&self, other: &Matrix, operation: &'static str) -> Result<()> {
        if self.shape() != other.shape() {
            return Err(NetworkError::shape_mismatch(operation, self, other));
        }
        Ok(())
    }

    /// Element-wise combination of two equally shaped matrices.
    pub fn zip_map(
        &self,
        other: &Matrix,
        operation: &'static str,
        f: impl Fn(f32, f32) -> f32,
    ) -> Result<Matrix> {
        self.ensure_same_shape(other, operation)?;
        let data = self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(&a, &b)| f(a, b))
            .collect();
        Ok(Matrix {
            rows: self.rows,
            cols: self.cols,
            data,
        })
    }

    pub fn add(&self, other: &Matrix) -> Result<Matrix> {
        self.zip_map(other, "add", |a, b| a + b)
    }

    pub fn sub(&self, other: &Matrix) -> Result<Matrix> {
        self.zip_map(other, "sub", |a, b| a - b)
    }

    /// Element-wise product.
    pub fn hadamard(&self, other: &Matrix) -> Result<Matrix> {
        self.zip_map(other, "hadamard", |a, b| a * b)
    }

    pub fn map(&self, f: impl Fn(f32) -> f32) -> Matrix {
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(|&v| f(v)).collect(),
        }
    }

    pub fn scale(&self, factor: f32) -> Matrix {
        self.map(|v| v * factor)
    }

    /// Matrix product `self × other`.
    pub fn dot(&self, other: &Matrix) -> Result<Matrix> {
        if self.cols != other.rows {
            return Err(NetworkError::shape_mismatch(
                "dot",
                format!("{} rows on the right operand", self.cols),
                format!("{}", other),
            ));
        }

        let mut out = Matrix::with(self.rows, other.cols);
        for i in 0..self.rows {
            let lhs = self.row(i);
            let out_row = out.row_mut(i);
            for (k, &a) in lhs.iter().enumerate() {
                if a == 0.0 {
                    continue;
                }
                let rhs = &other.data[k * other.cols..(k + 1) * other.cols];
                for (o, &b) in out_row.iter_mut().zip(rhs.iter()) {
                    *o += a * b;
                }
            }
        }
        Ok(out)
    }

    pub fn transpose(&self) -> Matrix {
        let mut out = Matrix::with(self.cols, self.rows);
        for i in 0..self.rows {
            for j in 0..self.cols {
                out.data[j * self.rows + i] = self.data[i * self.cols + j];
            }
        }
        out
    }

    /// Add a `1 × cols` row to every row of `self`.
    pub fn add_row(&self, row: &Matrix) -> Result<Matrix> {
        if row.rows != 1 || row.cols != self.cols {
            return Err(NetworkError::shape_mismatch(
                "add_row",
                format!("1x{}", self.cols),
                row,
            ));
        }
        let mut out = self.clone();
        for r in 0..out.rows {
            for (o, &b) in out.row_mut(r).iter_mut().zip(row.data.iter()) {
                *o += b;
            }
        }
        Ok(out)
    }

    /// Collapse the row (batch) dimension by summing, producing `1 × cols`.
    pub fn sum_rows(&self) -> Matrix {
        let mut out = Matrix::with(1, self.cols);
        for r in 0..self.rows {
            for (o, &v) in out.data.iter_mut().zip(self.row(r).iter()) {
                *o += v;
            }
        }
        out
    }

    pub fn sum(&self) -> f32 {
        self.data.iter().sum()
    }

    /// Reinterpret the buffer with a different shape of equal size.
    pub fn reshape(self, rows: usize, cols: usize) -> Result<Matrix> {
        Matrix::create(self.data, rows, cols)
    }
}
