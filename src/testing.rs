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

//! A brute-force oracle and small synthetic-cloud generators, gated behind
//! the `test-utils` feature so nothing here ships in a release build of a
//! downstream crate. The oracle mirrors the reference implementation's
//! `naive()`: for every query point, sum `w_j * k(‖x_j - y_i‖²)` over every
//! source point directly, in log space.

use crate::config::EngineConfig;
use crate::engine::EngineCtx;
use crate::errors::FskaResult;
use crate::kdtree::KdTree;
use crate::kernel::{log_k, log_sum_exp};
use crate::matrix::{squared_distance, PointMatrix};
use crate::pool::ThreadPool;
use crate::query_tree::{QueryNode, QueryTree};
use crate::source_tree::SourceTree;
use std::sync::Arc;

/// The O(|X| * |Y|) reference computation `fska::fska` is approximating.
pub fn naive<MX: PointMatrix, MY: PointMatrix>(x: &MX, weights: &[f64], y: &MY) -> Vec<f64> {
    assert_eq!(x.rows(), y.rows(), "naive(): X and Y must share a dimension");
    assert_eq!(weights.len(), x.cols(), "naive(): one weight per column of X");
    let dim = x.rows();
    let mut terms = Vec::with_capacity(x.cols());
    (0..y.cols())
        .map(|j| {
            terms.clear();
            terms.extend((0..x.cols()).map(|i| {
                weights[i].ln() + log_k(squared_distance(x, i, y, j), dim)
            }));
            let max = terms.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            log_sum_exp(&terms, max)
        })
        .collect()
}

/// Builds a plain k-d tree over `x` and reports its leaf structure: the
/// flattened, leaf-order sequence of original column indices and one entry
/// per leaf giving that leaf's size. Exposes the tree itself (rather than
/// the end-to-end summation) so callers can check partition invariants
/// directly, e.g. that every leaf obeys `n_min` or that the flattened
/// sequence is a permutation of `0..x.cols()`.
pub fn leaf_layout<M: PointMatrix>(x: &mut M, n_min: usize) -> FskaResult<(Vec<usize>, Vec<usize>)> {
    let tree = KdTree::build(x, n_min)?;
    Ok(tree.leaf_layout())
}

/// Builds a tree over `y` and checks that every leaf's own bounding box
/// (`QueryNode::borders`) actually contains every point assigned to it —
/// the containment invariant the descent's pruning math relies on, checked
/// here against a real built tree instead of only `HyperRectangle` in
/// isolation.
pub fn every_leaf_border_contains_its_points<M: PointMatrix>(
    y: &mut M,
    n_min: usize,
) -> FskaResult<bool> {
    let tree = QueryTree::build(y, n_min)?;
    fn walk<M: PointMatrix>(node: QueryNode, y: &M) -> bool {
        if let Some((left, right)) = node.children() {
            return walk(left, y) && walk(right, y);
        }
        let borders = node.borders();
        node.range().all(|pos| {
            let point: Vec<f64> = (0..y.rows()).map(|axis| y.get(axis, pos)).collect();
            borders.contains(&point)
        })
    }
    Ok(walk(tree.root(), y))
}

/// Runs a dual-tree summation exactly like `fska::fska`, but instead of the
/// result vector returns how many times the far-field prune rule fired.
/// Lets the "pruning actually prunes" property be checked directly instead
/// of inferred from timing.
pub fn prune_count_for<MX, MY>(
    mut x: MX,
    weights: Vec<f64>,
    mut y: MY,
    config: EngineConfig,
) -> FskaResult<usize>
where
    MX: PointMatrix + 'static,
    MY: PointMatrix + 'static,
{
    config.validate()?;
    let dim = x.rows();
    let source_tree = SourceTree::build(&mut x, &weights, config.n_min)?;
    let query_tree = QueryTree::build(&mut y, config.n_min)?;
    let log_weights_x: Vec<f64> = source_tree
        .tree()
        .original_index()
        .iter()
        .map(|&orig| weights[orig].ln())
        .collect();

    let pool = Arc::new(ThreadPool::new(config.n_threads));
    let ctx = EngineCtx::new(
        Arc::new(source_tree),
        Arc::new(query_tree),
        Arc::new(x),
        Arc::new(y),
        Arc::new(log_weights_x),
        pool,
        config,
        dim,
    );
    ctx.run()?;
    Ok(ctx.prune_count())
}

/// Draws `n` points uniformly from `[lo, hi]^dim` as flat column-major data
/// suitable for `DenseMatrix::from_column_major`.
pub fn uniform_cloud(n: usize, dim: usize, lo: f64, hi: f64, seed: u64) -> Vec<f64> {
    use rand::{Rng, SeedableRng};
    use rand::rngs::SmallRng;
    let mut rng = SmallRng::seed_from_u64(seed);
    (0..n * dim).map(|_| rng.gen_range(lo..hi)).collect()
}

/// Draws `n` points from an isotropic Gaussian centered at `center`
/// (length `dim`) with the given standard deviation, as flat column-major
/// data.
pub fn gaussian_cloud(n: usize, center: &[f64], std_dev: f64, seed: u64) -> Vec<f64> {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use rand_distr::{Distribution, Normal};
    let mut rng = SmallRng::seed_from_u64(seed);
    let normal = Normal::new(0.0, std_dev).expect("std_dev must be finite and positive");
    let mut data = Vec::with_capacity(n * center.len());
    for _ in 0..n {
        for &c in center {
            data.push(c + normal.sample(&mut rng));
        }
    }
    data
}

/// Positive weights drawn uniformly from `[lo, hi]`.
pub fn uniform_weights(n: usize, lo: f64, hi: f64, seed: u64) -> Vec<f64> {
    use rand::{Rng, SeedableRng};
    use rand::rngs::SmallRng;
    let mut rng = SmallRng::seed_from_u64(seed);
    (0..n).map(|_| rng.gen_range(lo..hi)).collect()
}
