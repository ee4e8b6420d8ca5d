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

//! A plain, owning k-d tree: median-split construction over a caller's
//! `PointMatrix`, permuting it in place so every node's index set is a
//! contiguous range. `source_tree` and `query_tree` each wrap one of these
//! with the extra bookkeeping their side of the descent needs.

mod builder;
mod node;

pub use node::KdNode;

use crate::errors::{FskaError, FskaResult};
use crate::matrix::PointMatrix;

/// A k-d tree over a `PointMatrix`, plus the permutation that was applied to
/// build it.
pub struct KdTree {
    root: KdNode,
    /// `original_index[pos]` is the column that now sits at position `pos`.
    original_index: Vec<usize>,
    /// `inverse[original] == pos`; the mapping from caller order to tree
    /// order, used to report results back in caller order.
    inverse: Vec<usize>,
}

impl KdTree {
    /// Builds a tree over every column of `matrix`, permuting it in place.
    ///
    /// # Errors
    /// Returns `FskaError::EmptyInput` if `matrix` has zero columns.
    pub fn build<M: PointMatrix>(matrix: &mut M, n_min: usize) -> FskaResult<KdTree> {
        if matrix.cols() == 0 {
            return Err(FskaError::EmptyInput("a point cloud"));
        }
        let (root, original_index, inverse) = builder::build(matrix, n_min);
        Ok(KdTree {
            root,
            original_index,
            inverse,
        })
    }

    /// The root node.
    pub fn root(&self) -> &KdNode {
        &self.root
    }

    /// The number of points in the tree.
    pub fn len(&self) -> usize {
        self.root.len()
    }

    /// `original_index[pos]` is the caller-order column now sitting at the
    /// (permuted) position `pos`.
    pub fn original_index(&self) -> &[usize] {
        &self.original_index
    }

    /// `inverse()[original] == pos`: maps a caller-order index to its
    /// position in the permuted tree order.
    pub fn inverse(&self) -> &[usize] {
        &self.inverse
    }

    /// Re-orders `permuted`, a dense vector indexed by tree position, back
    /// into caller order.
    pub fn unpermute(&self, permuted: &[f64]) -> Vec<f64> {
        self.inverse.iter().map(|&pos| permuted[pos]).collect()
    }

    /// The flattened, leaf-order sequence of original column indices, plus
    /// one entry per leaf giving that leaf's size. Exists to let tests
    /// check the tree's partition/leaf-size invariants directly.
    pub fn leaf_layout(&self) -> (Vec<usize>, Vec<usize>) {
        let mut indices = Vec::with_capacity(self.len());
        let mut leaf_sizes = Vec::new();
        fn walk(node: &KdNode, original_index: &[usize], indices: &mut Vec<usize>, leaf_sizes: &mut Vec<usize>) {
            match node.children() {
                Some((l, r)) => {
                    walk(l, original_index, indices, leaf_sizes);
                    walk(r, original_index, indices, leaf_sizes);
                }
                None => {
                    indices.extend(node.range().map(|pos| original_index[pos]));
                    leaf_sizes.push(node.len());
                }
            }
        }
        walk(&self.root, &self.original_index, &mut indices, &mut leaf_sizes);
        (indices, leaf_sizes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::DenseMatrix;

    #[test]
    fn rejects_empty_matrix() {
        let mut m = DenseMatrix::from_column_major(2, vec![]);
        assert!(matches!(KdTree::build(&mut m, 4), Err(FskaError::EmptyInput(_))));
    }

    #[test]
    fn unpermute_restores_caller_order() {
        let original = vec![5.0, 1.0, 4.0, 2.0, 3.0, 0.0];
        let mut m = DenseMatrix::from_rows(1, original.clone());
        let tree = KdTree::build(&mut m, 1).unwrap();
        // a "value per tree position" vector equal to the coordinate itself
        let permuted: Vec<f64> = (0..6).map(|pos| m.get(0, pos)).collect();
        let restored = tree.unpermute(&permuted);
        assert_eq!(restored, original);
    }
}
