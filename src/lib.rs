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

//! A dual-tree fast kernel summation engine.
//!
//! Given a weighted source point cloud `X` and a query point cloud `Y`,
//! `fska::fska` computes, for every `y_i` in `Y`:
//!
//! ```text
//! f(y_i) = log( Σ_j  w_j * k(‖x_j - y_i‖²) )
//! ```
//!
//! for the isotropic standard normal kernel `k`, by descending two k-d
//! trees (one over `X`, one over `Y`) together and pruning whole subtree
//! pairs whenever a centroid-based bound guarantees the approximation
//! error stays within the caller's `eps`.

#[cfg(test)]
#[macro_use]
extern crate assert_approx_eq;

mod config;
mod driver;
mod engine;
mod errors;
mod geometry;
mod kdtree;
mod kernel;
mod matrix;
mod pool;
mod query_tree;
mod source_tree;

#[cfg(feature = "test-utils")]
pub mod testing;

pub use config::{EngineConfig, DEFAULT_MAX_FUTURES, DEFAULT_MAX_FUTURES_CLEAR, DEFAULT_STOP_N_ELEM};
pub use driver::fska;
pub use errors::{FskaError, FskaResult};
pub use kernel::{k, log_k};
pub use matrix::{squared_distance, DenseMatrix, PointMatrix};
pub use pool::ThreadPool;
