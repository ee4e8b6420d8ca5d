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

//! The isotropic standard multivariate normal kernel and the log-sum-exp
//! arithmetic the rest of the engine accumulates in.

use std::f64::consts::PI;

/// `log k(r²)` for the isotropic standard multivariate normal of dimension
/// `dim` with bandwidth 1: `-0.5 r² - (dim/2) log(2π)`. Always finite for
/// finite `r_sq`.
#[inline]
pub fn log_k(r_sq: f64, dim: usize) -> f64 {
    -0.5 * r_sq - 0.5 * (dim as f64) * (2.0 * PI).ln()
}

/// `k(r²)`, the kernel in linear space. Used where the pruning predicate
/// needs a ratio rather than a difference of logs.
#[inline]
pub fn k(r_sq: f64, dim: usize) -> f64 {
    log_k(r_sq, dim).exp()
}

/// Numerically stable `log(Σ exp(terms[i]))` given the already-known max of
/// `terms`. `max == -inf` (all terms are `log(0)`) returns `-inf`.
pub fn log_sum_exp(terms: &[f64], max: f64) -> f64 {
    if max == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }
    let sum: f64 = terms.iter().map(|t| (t - max).exp()).sum();
    max + sum.ln()
}

/// Pairwise `log(exp(a) + exp(b))`, the merge operation the accumulator
/// performs on every update. `-inf` on either side returns the other
/// unchanged.
#[inline]
pub fn log_sum_exp_pair(a: f64, b: f64) -> f64 {
    if a == f64::NEG_INFINITY {
        return b;
    }
    if b == f64::NEG_INFINITY {
        return a;
    }
    let m = a.max(b);
    m + (-(a - b).abs()).exp().ln_1p()
}
