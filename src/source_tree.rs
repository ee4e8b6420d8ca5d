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

//! The source side (`X`) of the descent: a k-d tree decorated, bottom-up,
//! with each node's total weight, weighted centroid and bounding box.
//! Mirrors the `source_node` struct of the reference implementation, whose
//! `set_weight`/`set_centroid`/`set_borders` are exactly the bottom-up
//! passes computed here at build time instead of lazily.

use crate::errors::{FskaError, FskaResult};
use crate::geometry::HyperRectangle;
use crate::kdtree::{KdNode, KdTree};
use crate::matrix::PointMatrix;
use log::debug;

/// The decoration attached to one node, shaped like the `KdNode` it
/// shadows so the two can be walked together.
enum Decorated {
    Leaf {
        weight: f64,
        centroid: Vec<f64>,
        borders: HyperRectangle,
    },
    Internal {
        weight: f64,
        centroid: Vec<f64>,
        borders: HyperRectangle,
        left: Box<Decorated>,
        right: Box<Decorated>,
    },
}

impl Decorated {
    fn weight(&self) -> f64 {
        match self {
            Decorated::Leaf { weight, .. } | Decorated::Internal { weight, .. } => *weight,
        }
    }

    fn centroid(&self) -> &[f64] {
        match self {
            Decorated::Leaf { centroid, .. } | Decorated::Internal { centroid, .. } => centroid,
        }
    }

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

/// `X`'s k-d tree, decorated with weight/centroid/borders for pruning.
pub struct SourceTree {
    tree: KdTree,
    decoration: Decorated,
}

/// A node of the source tree paired with its decoration, handed to the
/// descent engine so it never has to re-derive weight/centroid/borders.
#[derive(Clone, Copy)]
pub struct SourceNode<'a> {
    node: &'a KdNode,
    decoration: &'a Decorated,
}

impl<'a> SourceNode<'a> {
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.node.is_leaf()
    }

    #[inline]
    pub fn range(&self) -> std::ops::Range<usize> {
        self.node.range()
    }

    #[inline]
    pub fn weight(&self) -> f64 {
        self.decoration.weight()
    }

    #[inline]
    pub fn centroid(&self) -> &'a [f64] {
        self.decoration.centroid()
    }

    #[inline]
    pub fn borders(&self) -> &'a HyperRectangle {
        self.decoration.borders()
    }

    pub fn children(&self) -> Option<(SourceNode<'a>, SourceNode<'a>)> {
        match (self.node.children(), self.decoration.children()) {
            (Some((ln, rn)), Some((ld, rd))) => Some((
                SourceNode {
                    node: ln,
                    decoration: ld,
                },
                SourceNode {
                    node: rn,
                    decoration: rd,
                },
            )),
            _ => None,
        }
    }
}

impl SourceTree {
    /// Builds the tree over `x` and `weights` (`weights.len() == x.cols()`,
    /// already in caller order; `x` is permuted in place to match).
    pub fn build<M: PointMatrix>(
        x: &mut M,
        weights: &[f64],
        n_min: usize,
    ) -> FskaResult<SourceTree> {
        if weights.len() != x.cols() {
            return Err(FskaError::WeightLengthMismatch {
                n_x: x.cols(),
                n_ws: weights.len(),
            });
        }
        let tree = KdTree::build(x, n_min)?;
        // weights must follow the same permutation as the columns of `x`.
        let permuted_weights: Vec<f64> = tree
            .original_index()
            .iter()
            .map(|&orig| weights[orig])
            .collect();

        let decoration = decorate(tree.root(), x, &permuted_weights);
        debug!(
            "source tree built: {} points, n_min {}, total weight {}",
            tree.len(),
            n_min,
            decoration.weight()
        );
        Ok(SourceTree { tree, decoration })
    }

    pub fn tree(&self) -> &KdTree {
        &self.tree
    }

    pub fn root(&self) -> SourceNode<'_> {
        SourceNode {
            node: self.tree.root(),
            decoration: &self.decoration,
        }
    }

    /// Walks from the root following `path` (`false` = left, `true` =
    /// right), used by the descent engine to pass node positions across
    /// task boundaries as plain, `'static` data instead of borrows.
    ///
    /// # Panics
    /// Panics if `path` is longer than the tree is deep.
    pub fn resolve(&self, path: &[bool]) -> SourceNode<'_> {
        let mut node = self.root();
        for &go_right in path {
            let (left, right) = node.children().expect("path deeper than the tree");
            node = if go_right { right } else { left };
        }
        node
    }
}

fn decorate<M: PointMatrix>(node: &KdNode, x: &M, weights: &[f64]) -> Decorated {
    match node.children() {
        Some((l, r)) => {
            let left = decorate(l, x, weights);
            let right = decorate(r, x, weights);
            let (l_w, r_w) = (left.weight(), right.weight());
            let total = l_w + r_w;
            let mut centroid = vec![0.0; x.rows()];
            if total != 0.0 {
                for axis in 0..x.rows() {
                    centroid[axis] =
                        (l_w * left.centroid()[axis] + r_w * right.centroid()[axis]) / total;
                }
            }
            let borders = HyperRectangle::union(left.borders(), right.borders());
            Decorated::Internal {
                weight: total,
                centroid,
                borders,
                left: Box::new(left),
                right: Box::new(right),
            }
        }
        None => {
            let mut total = 0.0;
            let mut centroid = vec![0.0; x.rows()];
            for pos in node.range() {
                let w = weights[pos];
                total += w;
                for axis in 0..x.rows() {
                    centroid[axis] += w * x.get(axis, pos);
                }
            }
            if total != 0.0 {
                for c in centroid.iter_mut() {
                    *c /= total;
                }
            } else {
                // every point in this leaf has zero weight: fall back to
                // the unweighted mean so the centroid stays inside the box.
                let len = node.len() as f64;
                for pos in node.range() {
                    for axis in 0..x.rows() {
                        centroid[axis] += x.get(axis, pos) / len;
                    }
                }
            }
            let borders = HyperRectangle::from_points(x, &node.range().collect::<Vec<_>>());
            Decorated::Leaf {
                weight: total,
                centroid,
                borders,
            }
        }
    }
}
