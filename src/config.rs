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

//! Tunables for a single `fska` call, bundled the way `goko`'s
//! `CoverTreeBuilder` bundles `scale_base`/`leaf_cutoff`/`min_res_index`.
//! Unlike that builder there is no on-disk format owned by this crate;
//! callers that want to load these from a file or environment bring their
//! own `serde` front end and hand us the resulting `EngineConfig`.

use crate::errors::{FskaError, FskaResult};
use serde::{Deserialize, Serialize};

/// Below this many outstanding descent tasks on a pair of subtrees, the
/// engine forks the rest of that pair off as a single sequential task
/// instead of keeping up the four-way recursive split.
pub const DEFAULT_STOP_N_ELEM: usize = 50;
/// Producer-side throttle: once this many futures are outstanding, the
/// driver stops submitting and drains ready ones.
pub const DEFAULT_MAX_FUTURES: usize = 30_000;
/// How many ready futures the throttle drains before resuming submission.
pub const DEFAULT_MAX_FUTURES_CLEAR: usize = 10_000;

/// Validated tunables for one `fska::fska(...)` call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum number of points a k-d tree leaf may hold.
    pub n_min: usize,
    /// Relative tolerance governing the far-field prune decision. `eps ==
    /// 0.0` is legal and disables pruning entirely (exact mode).
    pub eps: f64,
    /// Number of worker threads in the pool.
    pub n_threads: usize,
    /// See `DEFAULT_STOP_N_ELEM`.
    pub stop_n_elem: usize,
    /// See `DEFAULT_MAX_FUTURES`.
    pub max_futures: usize,
    /// See `DEFAULT_MAX_FUTURES_CLEAR`.
    pub max_futures_clear: usize,
}

impl Default for EngineConfig {
    fn default() -> EngineConfig {
        EngineConfig {
            n_min: 32,
            eps: 1e-2,
            n_threads: 1,
            stop_n_elem: DEFAULT_STOP_N_ELEM,
            max_futures: DEFAULT_MAX_FUTURES,
            max_futures_clear: DEFAULT_MAX_FUTURES_CLEAR,
        }
    }
}

impl EngineConfig {
    /// Builds a config from the three caller-facing knobs named in the
    /// `FSKA` entry point, validating them and filling in the rest from
    /// `Default`.
    pub fn new(n_min: usize, eps: f64, n_threads: usize) -> FskaResult<EngineConfig> {
        let mut cfg = EngineConfig {
            n_min,
            eps,
            n_threads,
            ..EngineConfig::default()
        };
        cfg.validate()?;
        // eps == 0.0 is legal (disables pruning); only negative / NaN is invalid.
        cfg.eps = eps;
        Ok(cfg)
    }

    /// Re-checks all fields; used by `new` and by anyone who deserialized
    /// a config from an external source and wants the same guarantees.
    pub fn validate(&self) -> FskaResult<()> {
        if self.n_min < 1 {
            return Err(FskaError::InvalidParameter("n_min must be >= 1"));
        }
        if !(self.eps >= 0.0) {
            return Err(FskaError::InvalidParameter("eps must be >= 0.0"));
        }
        if self.n_threads < 1 {
            return Err(FskaError::InvalidParameter("n_threads must be >= 1"));
        }
        if self.stop_n_elem < 1 {
            return Err(FskaError::InvalidParameter("stop_n_elem must be >= 1"));
        }
        if self.max_futures_clear > self.max_futures.max(1) {
            return Err(FskaError::InvalidParameter(
                "max_futures_clear must not exceed max_futures",
            ));
        }
        Ok(())
    }

    /// `true` when rule (A) (far-field pruning) can never fire: the exact
    /// mode referenced by property 8 in the testable-properties list.
    pub fn pruning_disabled(&self) -> bool {
        self.eps <= 0.0
    }
}
