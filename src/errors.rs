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

//! The errors that can occur while building trees or running the dual-tree
//! descent. Most of these are validation errors surfaced before any work
//! starts; `TaskPanicked` and `PoolShutDown` are the two that can only come
//! back from a `ThreadPool` future.

use std::error::Error;
use std::fmt;

/// Helper type for a call that could go wrong.
pub type FskaResult<T> = Result<T, FskaError>;

/// Error type for the dual-tree kernel summation engine.
#[derive(Debug)]
pub enum FskaError {
    /// X and Y have a different number of rows (dimensions).
    ShapeMismatch {
        /// Row count of X
        x_rows: usize,
        /// Row count of Y
        y_rows: usize,
    },
    /// The weight vector's length doesn't match the number of columns of X.
    WeightLengthMismatch {
        /// Number of columns in X
        n_x: usize,
        /// Number of weights supplied
        n_ws: usize,
    },
    /// A constructor parameter was out of range.
    InvalidParameter(&'static str),
    /// One of the two point clouds had zero columns.
    EmptyInput(&'static str),
    /// A worker thread panicked before it could deliver a result.
    TaskPanicked,
    /// `submit` was called on a pool that has already been shut down.
    PoolShutDown,
}

impl fmt::Display for FskaError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            FskaError::ShapeMismatch { x_rows, y_rows } => write!(
                f,
                "X has {} rows but Y has {} rows; both clouds must share a dimension",
                x_rows, y_rows
            ),
            FskaError::WeightLengthMismatch { n_x, n_ws } => write!(
                f,
                "X has {} columns but {} weights were supplied",
                n_x, n_ws
            ),
            FskaError::InvalidParameter(ref msg) => {
                write!(f, "invalid parameter: {}", msg)
            }
            FskaError::EmptyInput(ref which) => write!(f, "{} has no points", which),
            FskaError::TaskPanicked => {
                write!(f, "a worker thread panicked before delivering its result")
            }
            FskaError::PoolShutDown => write!(f, "submit called on a pool that was shut down"),
        }
    }
}

#[allow(deprecated)]
impl Error for FskaError {
    fn description(&self) -> &str {
        match *self {
            FskaError::ShapeMismatch { .. } => {
                "X and Y have a different number of rows"
            }
            FskaError::WeightLengthMismatch { .. } => {
                "the weight vector length does not match the number of columns of X"
            }
            FskaError::InvalidParameter(..) => "a constructor parameter was out of range",
            FskaError::EmptyInput(..) => "a point cloud had zero columns",
            FskaError::TaskPanicked => "a worker thread panicked",
            FskaError::PoolShutDown => "submit called on a shut-down pool",
        }
    }
}
