/*
* Licensed to Elasticsearch B.V. under one or more contributor
* license agreements. See the NOTICE file distributed with
* this work for additional information regarding copyright
* ownership. Elasticsearch B.V. licenses this file to you under
* the Apache License, Version 2.0 (the "License"); you may
* not use this file except in compliance with the License.
* You may obtain a copy of the License at
*
*  http://www.apache.org/licenses/LICENSE-2.0
*
* Unless required by applicable law or agreed to in writing,
* software distributed under the License is distributed on an
* "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
* KIND, either express or implied.  See the License for the
* specific language governing permissions and limitations
* under the License.
*/

//! The abstract column-major numeric buffer the engine builds trees over.
//!
//! Real matrix/vector storage (memory-mapped columns, sparse formats,
//! GPU-resident buffers, ...) is an external collaborator of this crate,
//! not something it owns. `PointMatrix` is the narrow seam a caller's own
//! storage plugs into; `DenseMatrix` is the one concrete, in-memory
//! implementation the engine and its tests use when no fancier storage is
//! at hand.

/// A column-major 2-D numeric buffer: `rows()` is the ambient dimension
/// `d`, `cols()` is the number of points `n`.
pub trait PointMatrix: Send + Sync {
    /// The number of rows (dimensions per point).
    fn rows(&self) -> usize;
    /// The number of columns (points).
    fn cols(&self) -> usize;
    /// The value at `(axis, column)`.
    fn get(&self, axis: usize, column: usize) -> f64;
    /// Swaps the entire contents of two columns in place. Tree
    /// construction uses this to permute the owning buffer so each leaf's
    /// indices end up contiguous.
    fn swap_columns(&mut self, a: usize, b: usize);
}

/// A dense, owned, column-major `f64` buffer: `data[axis + column * rows]`.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseMatrix {
    rows: usize,
    data: Vec<f64>,
}

impl DenseMatrix {
    /// Builds a matrix from `rows` and flat column-major `data`
    /// (`data.len()` must be a multiple of `rows`).
    pub fn from_column_major(rows: usize, data: Vec<f64>) -> DenseMatrix {
        assert!(rows > 0, "a point matrix needs at least one row");
        assert_eq!(
            data.len() % rows,
            0,
            "data length must be a multiple of the row count"
        );
        DenseMatrix { rows, data }
    }

    /// Builds a matrix from row-major data (convenient for literal test
    /// fixtures), transposing into the column-major layout the engine uses.
    pub fn from_rows(rows: usize, row_major: Vec<f64>) -> DenseMatrix {
        assert!(rows > 0, "a point matrix needs at least one row");
        assert_eq!(
            row_major.len() % rows,
            0,
            "data length must be a multiple of the row count"
        );
        let cols = row_major.len() / rows;
        let mut data = vec![0.0; row_major.len()];
        for col in 0..cols {
            for axis in 0..rows {
                data[axis + col * rows] = row_major[col * rows + axis];
            }
        }
        DenseMatrix { rows, data }
    }

    /// A single point's coordinates as a dense slice.
    pub fn column(&self, column: usize) -> &[f64] {
        let start = column * self.rows;
        &self.data[start..start + self.rows]
    }
}

impl PointMatrix for DenseMatrix {
    #[inline]
    fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    fn cols(&self) -> usize {
        self.data.len() / self.rows
    }

    #[inline]
    fn get(&self, axis: usize, column: usize) -> f64 {
        self.data[axis + column * self.rows]
    }

    fn swap_columns(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        let rows = self.rows;
        let (a_start, b_start) = (a * rows, b * rows);
        for axis in 0..rows {
            self.data.swap(a_start + axis, b_start + axis);
        }
    }
}

/// Squared Euclidean distance between column `i` of `a` and column `j` of
/// `b`. The two matrices must share a row count.
pub fn squared_distance<A: PointMatrix + ?Sized, B: PointMatrix + ?Sized>(
    a: &A,
    i: usize,
    b: &B,
    j: usize,
) -> f64 {
    debug_assert_eq!(a.rows(), b.rows());
    (0..a.rows())
        .map(|axis| {
            let d = a.get(axis, i) - b.get(axis, j);
            d * d
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_rows_transposes_into_column_major() {
        // two points in 2-D: (1,2) and (3,4)
        let m = DenseMatrix::from_rows(2, vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(m.rows(), 2);
        assert_eq!(m.cols(), 2);
        assert_eq!(m.get(0, 0), 1.0);
        assert_eq!(m.get(1, 0), 2.0);
        assert_eq!(m.get(0, 1), 3.0);
        assert_eq!(m.get(1, 1), 4.0);
    }

    #[test]
    fn swap_columns_swaps_whole_points() {
        let mut m = DenseMatrix::from_rows(2, vec![1.0, 2.0, 3.0, 4.0]);
        m.swap_columns(0, 1);
        assert_eq!(m.column(0), &[3.0, 4.0]);
        assert_eq!(m.column(1), &[1.0, 2.0]);
    }

    #[test]
    fn squared_distance_is_symmetric() {
        let m = DenseMatrix::from_rows(2, vec![0.0, 0.0, 3.0, 4.0]);
        assert_eq!(squared_distance(&m, 0, &m, 1), 25.0);
        assert_eq!(squared_distance(&m, 1, &m, 0), 25.0);
        assert_eq!(squared_distance(&m, 0, &m, 0), 0.0);
    }
}
