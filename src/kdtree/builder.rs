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

//! Median-split construction. Builds a `KdNode` tree in place over `matrix`,
//! permuting its columns as it goes, the same way `goko`'s
//! `CoverTreeBuilder` walks its scratch buffer of `NodeAddress`es while
//! assigning each point to a layer.

use crate::kdtree::node::KdNode;
use crate::matrix::PointMatrix;

/// Swaps columns `a` and `b` of `matrix`, keeping `original_index` (which
/// tracks, for each current position, the column index it started at)
/// consistent with the move.
fn swap<M: PointMatrix>(matrix: &mut M, original_index: &mut [usize], a: usize, b: usize) {
    if a == b {
        return;
    }
    matrix.swap_columns(a, b);
    original_index.swap(a, b);
}

/// Partitions `matrix`'s columns in `start..start+len` so that the column
/// landing at `start + k` is the `k`-th smallest by `axis` coordinate
/// (quickselect, Lomuto scheme), then returns that coordinate.
fn select_nth<M: PointMatrix>(
    matrix: &mut M,
    original_index: &mut [usize],
    start: usize,
    len: usize,
    axis: usize,
    k: usize,
) -> f64 {
    let mut lo = start;
    let mut hi = start + len - 1;
    let target = start + k;
    loop {
        if lo == hi {
            return matrix.get(axis, lo);
        }
        let pivot_pos = lo + (hi - lo) / 2;
        let pivot = matrix.get(axis, pivot_pos);
        swap(matrix, original_index, pivot_pos, hi);
        let mut store = lo;
        for i in lo..hi {
            if matrix.get(axis, i) < pivot {
                swap(matrix, original_index, i, store);
                store += 1;
            }
        }
        swap(matrix, original_index, store, hi);
        if store == target {
            return matrix.get(axis, store);
        } else if store < target {
            lo = store + 1;
        } else {
            hi = store - 1;
        }
    }
}

/// The axis with the largest coordinate extent over `start..start+len`.
fn widest_axis<M: PointMatrix>(matrix: &M, start: usize, len: usize) -> usize {
    let dim = matrix.rows();
    let mut best_axis = 0;
    let mut best_extent = -1.0;
    for axis in 0..dim {
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for pos in start..start + len {
            let v = matrix.get(axis, pos);
            if v < lo {
                lo = v;
            }
            if v > hi {
                hi = v;
            }
        }
        let extent = hi - lo;
        if extent > best_extent {
            best_extent = extent;
            best_axis = axis;
        }
    }
    best_axis
}

/// Recursively builds the subtree covering `start..start+len`, permuting
/// `matrix` and `original_index` in place.
fn build_rec<M: PointMatrix>(
    matrix: &mut M,
    original_index: &mut [usize],
    start: usize,
    len: usize,
    n_min: usize,
) -> KdNode {
    if len <= n_min {
        return KdNode::Leaf { start, len };
    }
    let axis = widest_axis(matrix, start, len);
    let mid = len / 2;
    let split = select_nth(matrix, original_index, start, len, axis, mid);

    let left = Box::new(build_rec(matrix, original_index, start, mid, n_min));
    let right = Box::new(build_rec(
        matrix,
        original_index,
        start + mid,
        len - mid,
        n_min,
    ));
    KdNode::Internal {
        start,
        len,
        axis,
        split,
        left,
        right,
    }
}

/// Builds a k-d tree over all of `matrix`'s columns, permuting `matrix` in
/// place, and returns the root plus the forward/inverse permutations that
/// record the move.
///
/// `original_index[pos]` is the column index that now sits at `pos`;
/// `inverse[original_index[pos]] == pos` for every `pos`.
pub fn build<M: PointMatrix>(matrix: &mut M, n_min: usize) -> (KdNode, Vec<usize>, Vec<usize>) {
    let n = matrix.cols();
    let mut original_index: Vec<usize> = (0..n).collect();
    let root = build_rec(matrix, &mut original_index, 0, n, n_min.max(1));

    let mut inverse = vec![0usize; n];
    for (pos, &orig) in original_index.iter().enumerate() {
        inverse[orig] = pos;
    }
    (root, original_index, inverse)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::DenseMatrix;

    fn count_leaves(node: &KdNode) -> usize {
        match node.children() {
            Some((l, r)) => count_leaves(l) + count_leaves(r),
            None => 1,
        }
    }

    fn sum_leaf_lens(node: &KdNode) -> usize {
        match node.children() {
            Some((l, r)) => sum_leaf_lens(l) + sum_leaf_lens(r),
            None => node.len(),
        }
    }

    #[test]
    fn every_leaf_respects_n_min() {
        let mut m = DenseMatrix::from_rows(1, (0..37).map(|i| i as f64).collect());
        let (root, _, _) = build(&mut m, 5);
        fn check(node: &KdNode, n_min: usize) {
            match node.children() {
                Some((l, r)) => {
                    check(l, n_min);
                    check(r, n_min);
                }
                None => assert!(node.len() <= n_min),
            }
        }
        check(&root, 5);
        assert_eq!(sum_leaf_lens(&root), 37);
    }

    #[test]
    fn single_point_builds_one_leaf() {
        let mut m = DenseMatrix::from_rows(2, vec![1.0, 2.0]);
        let (root, original_index, inverse) = build(&mut m, 10);
        assert_eq!(count_leaves(&root), 1);
        assert_eq!(original_index, vec![0]);
        assert_eq!(inverse, vec![0]);
    }

    #[test]
    fn permutation_and_inverse_round_trip() {
        let mut m = DenseMatrix::from_rows(1, vec![5.0, 1.0, 4.0, 2.0, 3.0, 0.0]);
        let (_, original_index, inverse) = build(&mut m, 1);
        for orig in 0..6 {
            assert_eq!(original_index[inverse[orig]], orig);
        }
    }

    #[test]
    fn permutation_matches_final_matrix_contents() {
        let original = vec![5.0, 1.0, 4.0, 2.0, 3.0, 0.0];
        let mut m = DenseMatrix::from_rows(1, original.clone());
        let (_, original_index, _) = build(&mut m, 1);
        for pos in 0..6 {
            assert_eq!(m.get(0, pos), original[original_index[pos]]);
        }
    }

    #[test]
    fn widest_axis_picks_largest_extent() {
        let m = DenseMatrix::from_rows(2, vec![0.0, 0.0, 1.0, 10.0, 2.0, -5.0]);
        assert_eq!(widest_axis(&m, 0, 3), 1);
    }
}
