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

//! The query side (`Y`) of the descent: a k-d tree decorated with bounding
//! boxes, plus one mutex-guarded log-weight buffer per leaf so concurrent
//! tasks touching disjoint leaves never contend, and tasks that land on the
//! same leaf from different source branches serialize correctly instead of
//! racing. Mirrors the reference implementation's `query_node`, whose
//! `add_weight` takes the equivalent of this per-leaf lock.

use crate::errors::{FskaError, FskaResult};
use crate::geometry::HyperRectangle;
use crate::kdtree::{KdNode, KdTree};
use crate::kernel::log_sum_exp_pair;
use crate::matrix::PointMatrix;
use log::debug;
use std::sync::Mutex;

enum Decorated {
    Leaf {
        borders: HyperRectangle,
        /// One log-weight accumulator per point in the leaf, indexed
        /// relative to the leaf's own range (`0..len`). Starts at
        /// `-inf` (`log 0`).
        log_weights: Mutex<Vec<f64>>,
    },
    Internal {
        borders: HyperRectangle,
        left: Box<Decorated>,
        right: Box<Decorated>,
    },
}

impl Decorated {
    fn borders(&self) -> &HyperRectangle {
        match self {
            Decorated::Leaf { borders, .. } | Decorated::Internal { borders, .. } => borders,
        }
    }

    fn children(&self) -> Option<(&Decorated, &Decorated)> {
        match self {
            Decorated::Internal { left, right, .. } => Some((left, right)),
            Decorated::Leaf { .. } => None,
        }
    }
}

/// `Y`'s k-d tree, decorated with borders and per-leaf accumulators.
pub struct QueryTree {
    tree: KdTree,
    decoration: Decorated,
}

/// A node of the query tree paired with its decoration.
#[derive(Clone, Copy)]
pub struct QueryNode<'a> {
    node: &'a KdNode,
    decoration: &'a Decorated,
}

impl<'a> QueryNode<'a> {
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.node.is_leaf()
    }

    #[inline]
    pub fn range(&self) -> std::ops::Range<usize> {
        self.node.range()
    }

    #[inline]
    pub fn borders(&self) -> &'a HyperRectangle {
        self.decoration.borders()
    }

    pub fn children(&self) -> Option<(QueryNode<'a>, QueryNode<'a>)> {
        match (self.node.children(), self.decoration.children()) {
            (Some((ln, rn)), Some((ld, rd))) => Some((
                QueryNode {
                    node: ln,
                    decoration: ld,
                },
                QueryNode {
                    node: rn,
                    decoration: rd,
                },
            )),
            _ => None,
        }
    }

    /// Merges one `log(weight)` contribution per point in this leaf. The
    /// slice is indexed relative to the leaf's own range, same as
    /// `merge_uniform`'s internal buffer.
    ///
    /// # Panics
    /// Panics if called on an internal node, or if `log_weights.len()`
    /// doesn't match the leaf's size.
    pub fn merge_exact(&self, log_weights: &[f64]) {
        match self.decoration {
            Decorated::Leaf {
                log_weights: buf, ..
            } => {
                let mut guard = buf.lock().expect("log-weight mutex poisoned");
                assert_eq!(guard.len(), log_weights.len());
                for (slot, &contribution) in guard.iter_mut().zip(log_weights) {
                    *slot = log_sum_exp_pair(*slot, contribution);
                }
            }
            Decorated::Internal { .. } => panic!("merge_exact called on an internal node"),
        }
    }
}

impl QueryTree {
    /// Builds the tree over `y`, permuting it in place.
    pub fn build<M: PointMatrix>(y: &mut M, n_min: usize) -> FskaResult<QueryTree> {
        if y.cols() == 0 {
            return Err(FskaError::EmptyInput("Y"));
        }
        let tree = KdTree::build(y, n_min)?;
        let decoration = decorate(tree.root(), y);
        debug!("query tree built: {} points, n_min {}", tree.len(), n_min);
        Ok(QueryTree { tree, decoration })
    }

    pub fn tree(&self) -> &KdTree {
        &self.tree
    }

    pub fn root(&self) -> QueryNode<'_> {
        QueryNode {
            node: self.tree.root(),
            decoration: &self.decoration,
        }
    }

    /// Walks from the root following `path` (`false` = left, `true` =
    /// right); see `SourceTree::resolve`.
    ///
    /// # Panics
    /// Panics if `path` is longer than the tree is deep.
    pub fn resolve(&self, path: &[bool]) -> QueryNode<'_> {
        let mut node = self.root();
        for &go_right in path {
            let (left, right) = node.children().expect("path deeper than the tree");
            node = if go_right { right } else { left };
        }
        node
    }

    /// Gathers every leaf's accumulator into one dense vector indexed by
    /// tree position (still in permuted, not caller, order).
    pub fn collect_log_weights(&self) -> Vec<f64> {
        let mut out = vec![f64::NEG_INFINITY; self.tree.len()];
        fn walk(node: &Decorated, out: &mut [f64], start: usize) {
            match node {
                Decorated::Leaf { log_weights, .. } => {
                    let guard = log_weights.lock().expect("log-weight mutex poisoned");
                    out[start..start + guard.len()].copy_from_slice(&guard);
                }
                Decorated::Internal { left, right, .. } => {
                    walk(left, out, start);
                    let left_len = count_leaf_points(left);
                    walk(right, out, start + left_len);
                }
            }
        }
        fn count_leaf_points(node: &Decorated) -> usize {
            match node {
                Decorated::Leaf { log_weights, .. } => {
                    log_weights.lock().expect("log-weight mutex poisoned").len()
                }
                Decorated::Internal { left, right, .. } => {
                    count_leaf_points(left) + count_leaf_points(right)
                }
            }
        }
        walk(&self.decoration, &mut out, 0);
        out
    }
}

fn decorate<M: PointMatrix>(node: &KdNode, y: &M) -> Decorated {
    match node.children() {
        Some((l, r)) => {
            let left = decorate(l, y);
            let right = decorate(r, y);
            let borders = HyperRectangle::union(left.borders(), right.borders());
            Decorated::Internal {
                borders,
                left: Box::new(left),
                right: Box::new(right),
            }
        }
        None => {
            let borders = HyperRectangle::from_points(y, &node.range().collect::<Vec<_>>());
            Decorated::Leaf {
                borders,
                log_weights: Mutex::new(vec![f64::NEG_INFINITY; node.len()]),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::DenseMatrix;

    #[test]
    fn fresh_tree_accumulates_to_neg_infinity() {
        let mut y = DenseMatrix::from_rows(1, vec![0.0, 1.0, 2.0, 3.0]);
        let tree = QueryTree::build(&mut y, 1).unwrap();
        let collected = tree.collect_log_weights();
        assert!(collected.iter().all(|&v| v == f64::NEG_INFINITY));
        assert_eq!(collected.len(), 4);
    }

    #[test]
    fn merge_exact_on_single_point_leaf_accumulates() {
        let mut y = DenseMatrix::from_rows(1, vec![0.0, 10.0]);
        let tree = QueryTree::build(&mut y, 1).unwrap();
        let (l, _) = tree.root().children().unwrap();
        l.merge_exact(&[2.0]);
        l.merge_exact(&[3.0]);
        let collected = tree.collect_log_weights();
        let expected = log_sum_exp_pair(2.0, 3.0);
        assert!(collected.iter().any(|&v| (v - expected).abs() < 1e-12));
    }

    #[test]
    fn merge_exact_matches_leaf_size() {
        let mut y = DenseMatrix::from_rows(1, vec![0.0, 1.0, 2.0]);
        let tree = QueryTree::build(&mut y, 8).unwrap();
        let root = tree.root();
        assert!(root.is_leaf());
        root.merge_exact(&[1.0, 2.0, 3.0]);
        let collected = tree.collect_log_weights();
        assert_eq!(collected, vec![1.0, 2.0, 3.0]);
    }
}
