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

//! The k-d tree node itself. Each node owns its children outright; nothing
//! outside the tree holds an interior pointer past the tree's lifetime.

/// A node of a k-d tree built over the (already permuted) columns
/// `start..start + len` of the owning matrix.
#[derive(Debug)]
pub enum KdNode {
    /// Covers a contiguous run of at most `n_min` points.
    Leaf {
        /// First position (inclusive) this leaf covers.
        start: usize,
        /// Number of points this leaf covers.
        len: usize,
    },
    /// An internal split: everything in `left`'s range precedes everything
    /// in `right`'s range, and together they are exactly this node's range.
    Internal {
        /// First position (inclusive) this node covers.
        start: usize,
        /// Number of points this node covers.
        len: usize,
        /// The axis with the largest extent at build time.
        axis: usize,
        /// The coordinate value used to partition `left` from `right`.
        split: f64,
        /// Points with `coordinate(axis) <= split` (and ties assigned here
        /// to keep the two halves within one of each other).
        left: Box<KdNode>,
        /// The remaining points.
        right: Box<KdNode>,
    },
}

impl KdNode {
    /// `true` for `Leaf` nodes.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        matches!(self, KdNode::Leaf { .. })
    }

    /// First position (inclusive) this node covers.
    #[inline]
    pub fn start(&self) -> usize {
        match *self {
            KdNode::Leaf { start, .. } => start,
            KdNode::Internal { start, .. } => start,
        }
    }

    /// Number of points this node covers.
    #[inline]
    pub fn len(&self) -> usize {
        match *self {
            KdNode::Leaf { len, .. } => len,
            KdNode::Internal { len, .. } => len,
        }
    }

    /// `true` if this node covers no points. Can only happen for a
    /// degenerate (empty) tree, which `KdTree::build` rejects.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The half-open range of (permuted) positions this node covers.
    #[inline]
    pub fn range(&self) -> std::ops::Range<usize> {
        self.start()..self.start() + self.len()
    }

    /// Borrows the two children of an `Internal` node.
    pub fn children(&self) -> Option<(&KdNode, &KdNode)> {
        match self {
            KdNode::Internal { left, right, .. } => Some((left, right)),
            KdNode::Leaf { .. } => None,
        }
    }
}
