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

//! The recursive dual-tree descent itself: at every pair of source/query
//! nodes, decide between a far-field prune, an exact leaf-leaf sum, a
//! two-way split of whichever side is still internal (when only one is),
//! or a four-way descent into every child pair (when both are), forking
//! each split branch off to the pool once the pair is still big enough to
//! be worth the overhead.
//!
//! Node positions cross task boundaries as plain root-to-node paths
//! (`Vec<bool>`) rather than borrowed references, so a forked task can own
//! everything it needs without fighting the borrow checker over a tree
//! that out-lives the call that spawned the task.

use crate::config::EngineConfig;
use crate::errors::FskaResult;
use crate::kernel::{self, log_sum_exp};
use crate::matrix::{squared_distance, PointMatrix};
use crate::pool::{TaskHandle, ThreadPool};
use crate::query_tree::{QueryNode, QueryTree};
use crate::source_tree::{SourceNode, SourceTree};
use log::{trace, warn};
use std::sync::{Arc, Mutex};
#[cfg(feature = "test-utils")]
use std::sync::atomic::{AtomicUsize, Ordering};

struct Inner<MX, MY> {
    source_tree: Arc<SourceTree>,
    query_tree: Arc<QueryTree>,
    x: Arc<MX>,
    y: Arc<MY>,
    /// `ln(w_i)` for each (permuted) source point; `ln(0.0) == -inf`
    /// absorbs zero-weight points with no special case anywhere else.
    log_weights_x: Arc<Vec<f64>>,
    pool: Arc<ThreadPool>,
    pending: Mutex<Vec<TaskHandle<FskaResult<()>>>>,
    config: EngineConfig,
    dim: usize,
    /// How many times rule (A), the far-field prune, has fired. Only
    /// tracked under `test-utils`, where the "pruning actually prunes"
    /// scenario reads it back.
    #[cfg(feature = "test-utils")]
    prune_count: AtomicUsize,
}

/// A cheaply-clonable handle to one dual-tree run, passed into every forked
/// task.
pub struct EngineCtx<MX, MY>(Arc<Inner<MX, MY>>);

impl<MX, MY> Clone for EngineCtx<MX, MY> {
    fn clone(&self) -> Self {
        EngineCtx(Arc::clone(&self.0))
    }
}

impl<MX, MY> EngineCtx<MX, MY>
where
    MX: PointMatrix + 'static,
    MY: PointMatrix + 'static,
{
    pub fn new(
        source_tree: Arc<SourceTree>,
        query_tree: Arc<QueryTree>,
        x: Arc<MX>,
        y: Arc<MY>,
        log_weights_x: Arc<Vec<f64>>,
        pool: Arc<ThreadPool>,
        config: EngineConfig,
        dim: usize,
    ) -> EngineCtx<MX, MY> {
        EngineCtx(Arc::new(Inner {
            source_tree,
            query_tree,
            x,
            y,
            log_weights_x,
            pool,
            pending: Mutex::new(Vec::new()),
            config,
            dim,
            #[cfg(feature = "test-utils")]
            prune_count: AtomicUsize::new(0),
        }))
    }

    /// Number of times the far-field prune rule has fired so far. Exists
    /// only under `test-utils`, for the "pruning actually prunes" scenario.
    #[cfg(feature = "test-utils")]
    pub fn prune_count(&self) -> usize {
        self.0.prune_count.load(Ordering::Relaxed)
    }

    /// Runs the descent over the full source/query root pair, blocking
    /// until every forked task (including ones forked by other forked
    /// tasks) has completed.
    pub fn run(&self) -> FskaResult<()> {
        descend(self.clone(), Vec::new(), Vec::new())?;
        self.join_all()
    }

    fn spawn<F>(&self, job: F) -> FskaResult<()>
    where
        F: FnOnce() -> FskaResult<()> + Send + 'static,
    {
        let handle = self.0.pool.submit(job)?;
        let len = {
            let mut pending = self.0.pending.lock().expect("pending-futures mutex poisoned");
            pending.push(handle);
            pending.len()
        };
        if len > self.0.config.max_futures {
            warn!(
                "outstanding futures {} exceeded max_futures {}, draining to {}",
                len, self.0.config.max_futures, self.0.config.max_futures_clear
            );
            self.drain_to(self.0.config.max_futures_clear)?;
        }
        Ok(())
    }

    /// Drains `pending` down to `target` entries, oldest first. Every
    /// handle in range is always awaited, even after one reports an error:
    /// a task already running on the pool must not be dropped just because
    /// an earlier one failed. The first error seen, if any, is returned
    /// only once every handle has been drained.
    fn drain_to(&self, target: usize) -> FskaResult<()> {
        let mut first_err = None;
        loop {
            let next = {
                let mut pending =
                    self.0.pending.lock().expect("pending-futures mutex poisoned");
                if pending.len() <= target {
                    None
                } else {
                    Some(pending.remove(0))
                }
            };
            match next {
                Some(handle) => {
                    if let Err(e) = handle.get() {
                        if first_err.is_none() {
                            first_err = Some(e);
                        }
                    }
                }
                None => {
                    return match first_err {
                        Some(e) => Err(e),
                        None => Ok(()),
                    }
                }
            }
        }
    }

    fn join_all(&self) -> FskaResult<()> {
        self.drain_to(0)
    }

    /// Gathers every query leaf's accumulator and reports it back in
    /// caller order. Only meaningful after `run` has returned `Ok`.
    pub fn results(&self) -> Vec<f64> {
        let permuted = self.0.query_tree.collect_log_weights();
        self.0.query_tree.tree().unpermute(&permuted)
    }
}

fn descend<MX, MY>(ctx: EngineCtx<MX, MY>, source_path: Vec<bool>, query_path: Vec<bool>) -> FskaResult<()>
where
    MX: PointMatrix + 'static,
    MY: PointMatrix + 'static,
{
    let inner = &ctx.0;
    let source = inner.source_tree.resolve(&source_path);
    let query = inner.query_tree.resolve(&query_path);

    let (d_min_sq, d_max_sq) = source.borders().min_max_sq_dist(query.borders());

    if !inner.config.pruning_disabled() && may_prune(source, d_min_sq, d_max_sq, inner.config.eps, inner.dim)
    {
        trace!("prune: {} source points, {} query points", source.range().len(), query.range().len());
        #[cfg(feature = "test-utils")]
        inner.prune_count.fetch_add(1, Ordering::Relaxed);
        apply_prune(query, inner.y.as_ref(), source.centroid(), source.weight(), inner.dim);
        return Ok(());
    }

    if source.is_leaf() && query.is_leaf() {
        trace!("exact: {} source points, {} query points", source.range().len(), query.range().len());
        apply_exact(
            source,
            query,
            inner.x.as_ref(),
            inner.y.as_ref(),
            &inner.log_weights_x,
            inner.dim,
        );
        return Ok(());
    }

    let combined_len = source.range().len() + query.range().len();

    // Exactly one side is a leaf: split the other one, two-way.
    if query.is_leaf() || source.is_leaf() {
        let split_source = !source.is_leaf();
        return if split_source {
            let mut left_path = source_path.clone();
            left_path.push(false);
            let mut right_path = source_path;
            right_path.push(true);

            if combined_len > inner.config.stop_n_elem {
                let fork_ctx = ctx.clone();
                let fork_query = query_path.clone();
                ctx.spawn(move || descend(fork_ctx, right_path, fork_query))?;
                descend(ctx, left_path, query_path)
            } else {
                descend(ctx.clone(), left_path, query_path.clone())?;
                descend(ctx, right_path, query_path)
            }
        } else {
            let mut left_path = query_path.clone();
            left_path.push(false);
            let mut right_path = query_path;
            right_path.push(true);

            if combined_len > inner.config.stop_n_elem {
                let fork_ctx = ctx.clone();
                let fork_source = source_path.clone();
                ctx.spawn(move || descend(fork_ctx, fork_source, right_path))?;
                descend(ctx, source_path, left_path)
            } else {
                descend(ctx.clone(), source_path.clone(), left_path)?;
                descend(ctx, source_path, right_path)
            }
        };
    }

    // Both sides are internal: descend all four child pairs.
    let mut source_left = source_path.clone();
    source_left.push(false);
    let mut source_right = source_path;
    source_right.push(true);
    let mut query_left = query_path.clone();
    query_left.push(false);
    let mut query_right = query_path;
    query_right.push(true);

    let pairs = [
        (source_left.clone(), query_left.clone()),
        (source_left, query_right.clone()),
        (source_right.clone(), query_left),
        (source_right, query_right),
    ];

    let mut inline = Vec::with_capacity(4);
    for (s_path, q_path) in pairs {
        if combined_len > inner.config.stop_n_elem {
            let fork_ctx = ctx.clone();
            ctx.spawn(move || descend(fork_ctx, s_path, q_path))?;
        } else {
            inline.push((s_path, q_path));
        }
    }
    for (s_path, q_path) in inline {
        descend(ctx.clone(), s_path, q_path)?;
    }
    Ok(())
}

/// `true` if the relative spread of `k` over `[d_min_sq, d_max_sq]` is
/// small enough, weighted by the source node's total weight, that a single
/// centroid evaluation approximates the whole node within `eps`.
fn may_prune(source: SourceNode, d_min_sq: f64, d_max_sq: f64, eps: f64, dim: usize) -> bool {
    let k_max = kernel::k(d_min_sq, dim);
    let k_min = kernel::k(d_max_sq, dim);
    let denom = (k_max + k_min) / 2.0 + 1e-16;
    source.weight() * (k_max - k_min) / denom < 2.0 * eps
}

/// Adds `weight * k(||centroid - y||²)` into every point under `query`,
/// recursing down to each leaf to compute the (per-point-varying) distance.
fn apply_prune<MY: PointMatrix>(query: QueryNode, y: &MY, centroid: &[f64], weight: f64, dim: usize) {
    if let Some((left, right)) = query.children() {
        apply_prune(left, y, centroid, weight, dim);
        apply_prune(right, y, centroid, weight, dim);
        return;
    }
    let log_weight = weight.ln();
    let contributions: Vec<f64> = query
        .range()
        .map(|pos| {
            let d_sq = centroid_sq_dist(centroid, y, pos);
            log_weight + kernel::log_k(d_sq, dim)
        })
        .collect();
    query.merge_exact(&contributions);
}

fn centroid_sq_dist<MY: PointMatrix>(centroid: &[f64], y: &MY, pos: usize) -> f64 {
    centroid
        .iter()
        .enumerate()
        .map(|(axis, &c)| {
            let d = c - y.get(axis, pos);
            d * d
        })
        .sum()
}

/// The brute-force O(|source| * |query|) sum for a leaf-leaf pair.
fn apply_exact<MX: PointMatrix, MY: PointMatrix>(
    source: SourceNode,
    query: QueryNode,
    x: &MX,
    y: &MY,
    log_weights_x: &[f64],
    dim: usize,
) {
    let mut contributions = Vec::with_capacity(query.range().len());
    let mut terms = Vec::with_capacity(source.range().len());
    for q_pos in query.range() {
        terms.clear();
        for s_pos in source.range() {
            let d_sq = squared_distance(x, s_pos, y, q_pos);
            terms.push(log_weights_x[s_pos] + kernel::log_k(d_sq, dim));
        }
        let max = terms.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        contributions.push(log_sum_exp(&terms, max));
    }
    query.merge_exact(&contributions);
}
