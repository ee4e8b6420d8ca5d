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

//! The public entry point: build both trees, run the descent, and hand
//! back `log(Σ w_j k(‖x_j - y_i‖²))` for every query point, in the order
//! the caller supplied them.

use crate::config::EngineConfig;
use crate::engine::EngineCtx;
use crate::errors::{FskaError, FskaResult};
use crate::matrix::PointMatrix;
use crate::pool::ThreadPool;
use crate::query_tree::QueryTree;
use crate::source_tree::SourceTree;
use log::info;
use std::sync::Arc;

/// Computes `f(y_i) = log(Σ_j w_j k(‖x_j - y_i‖²))` for every column `y_i`
/// of `y`, against the weighted source points in `x`/`weights`.
///
/// `x` and `y` are permuted in place during tree construction; callers who
/// need their original column order afterwards should clone first.
///
/// # Errors
/// - `FskaError::EmptyInput` if `x` or `y` has zero columns.
/// - `FskaError::ShapeMismatch` if `x` and `y` don't share a row count.
/// - `FskaError::WeightLengthMismatch` if `weights.len() != x.cols()`.
/// - Whatever `EngineConfig::validate` rejects.
pub fn fska<MX, MY>(
    mut x: MX,
    weights: Vec<f64>,
    mut y: MY,
    config: EngineConfig,
) -> FskaResult<Vec<f64>>
where
    MX: PointMatrix + 'static,
    MY: PointMatrix + 'static,
{
    config.validate()?;
    if x.cols() == 0 {
        return Err(FskaError::EmptyInput("X"));
    }
    if y.cols() == 0 {
        return Err(FskaError::EmptyInput("Y"));
    }
    if x.rows() != y.rows() {
        return Err(FskaError::ShapeMismatch {
            x_rows: x.rows(),
            y_rows: y.rows(),
        });
    }
    if weights.len() != x.cols() {
        return Err(FskaError::WeightLengthMismatch {
            n_x: x.cols(),
            n_ws: weights.len(),
        });
    }
    let dim = x.rows();
    info!(
        "fska: {} source points, {} query points, dim {}, n_threads {}",
        x.cols(),
        y.cols(),
        dim,
        config.n_threads
    );

    let pool = Arc::new(ThreadPool::new(config.n_threads));

    let n_min = config.n_min;
    let weights_for_build = weights.clone();
    let source_handle = pool.submit(move || -> FskaResult<(SourceTree, MX)> {
        let tree = SourceTree::build(&mut x, &weights_for_build, n_min)?;
        Ok((tree, x))
    })?;
    let query_handle = pool.submit(move || -> FskaResult<(QueryTree, MY)> {
        let tree = QueryTree::build(&mut y, n_min)?;
        Ok((tree, y))
    })?;

    // Await both handles unconditionally before propagating either error —
    // `query_handle` is already running on the pool and must not be
    // dropped just because `source_handle` failed first.
    let source_result = source_handle.get();
    let query_result = query_handle.get();
    let (source_tree, x) = source_result??;
    let (query_tree, y) = query_result??;

    let log_weights_x: Vec<f64> = source_tree
        .tree()
        .original_index()
        .iter()
        .map(|&orig| weights[orig].ln())
        .collect();

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
    Ok(ctx.results())
}
