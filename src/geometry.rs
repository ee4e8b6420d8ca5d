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

//! Axis-aligned bounding boxes and the min/max squared distance between a
//! pair of them, which drives the pruning predicate in `engine`.

use crate::matrix::PointMatrix;

/// An axis-aligned hyper-rectangle, `lo[i] <= hi[i]` for every axis `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct HyperRectangle {
    lo: Vec<f64>,
    hi: Vec<f64>,
}

impl HyperRectangle {
    /// Builds the tight box containing the given columns of `matrix`.
    ///
    /// # Panics
    /// Panics if `indices` is empty; a node always covers at least one point.
    pub fn from_points<M: PointMatrix>(matrix: &M, indices: &[usize]) -> HyperRectangle {
        assert!(!indices.is_empty(), "a hyper-rectangle needs at least one point");
        let dim = matrix.rows();
        let mut lo = vec![f64::INFINITY; dim];
        let mut hi = vec![f64::NEG_INFINITY; dim];
        for &idx in indices {
            for axis in 0..dim {
                let v = matrix.get(axis, idx);
                if v < lo[axis] {
                    lo[axis] = v;
                }
                if v > hi[axis] {
                    hi[axis] = v;
                }
            }
        }
        HyperRectangle { lo, hi }
    }

    /// The tight box containing the union of two boxes.
    pub fn union(a: &HyperRectangle, b: &HyperRectangle) -> HyperRectangle {
        assert_eq!(a.lo.len(), b.lo.len(), "borders of mismatched dimension");
        let lo = a
            .lo
            .iter()
            .zip(&b.lo)
            .map(|(x, y)| x.min(*y))
            .collect();
        let hi = a
            .hi
            .iter()
            .zip(&b.hi)
            .map(|(x, y)| x.max(*y))
            .collect();
        HyperRectangle { lo, hi }
    }

    /// The number of axes this box spans.
    pub fn dim(&self) -> usize {
        self.lo.len()
    }

    /// Lower bound along `axis`.
    pub fn lo(&self, axis: usize) -> f64 {
        self.lo[axis]
    }

    /// Upper bound along `axis`.
    pub fn hi(&self, axis: usize) -> f64 {
        self.hi[axis]
    }

    /// `true` if `point` (a dense slice, one entry per axis) lies within
    /// this box on every axis. Used by tests checking containment.
    pub fn contains(&self, point: &[f64]) -> bool {
        point
            .iter()
            .enumerate()
            .all(|(axis, &v)| self.lo[axis] <= v && v <= self.hi[axis])
    }

    /// Returns `(d_min², d_max²)`, the minimum and maximum squared distance
    /// between any point of `self` and any point of `other`. Axes whose
    /// intervals overlap contribute 0 to `d_min²`.
    pub fn min_max_sq_dist(&self, other: &HyperRectangle) -> (f64, f64) {
        assert_eq!(self.dim(), other.dim(), "borders of mismatched dimension");
        let mut d_min_sq = 0.0;
        let mut d_max_sq = 0.0;
        for axis in 0..self.dim() {
            let (a_lo, a_hi) = (self.lo[axis], self.hi[axis]);
            let (b_lo, b_hi) = (other.lo[axis], other.hi[axis]);

            let min_gap = if a_hi < b_lo {
                b_lo - a_hi
            } else if b_hi < a_lo {
                a_lo - b_hi
            } else {
                0.0
            };
            let max_gap = (a_hi - b_lo).abs().max((b_hi - a_lo).abs());

            d_min_sq += min_gap * min_gap;
            d_max_sq += max_gap * max_gap;
        }
        (d_min_sq, d_max_sq)
    }
}
