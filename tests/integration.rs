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

//! End-to-end scenarios run against the public `fska` entry point, checked
//! against the brute-force oracle in `fska::testing`.

use assert_approx_eq::assert_approx_eq;
use fska::testing::{
    every_leaf_border_contains_its_points, gaussian_cloud, leaf_layout, naive, prune_count_for,
    uniform_cloud, uniform_weights,
};
use fska::{fska, DenseMatrix, EngineConfig};

fn max_abs_diff(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f64::max)
}

#[test]
fn one_dimensional_collinear_pair_matches_naive_exactly() {
    let x = DenseMatrix::from_rows(1, vec![-1.0, 0.0, 1.0]);
    let y = DenseMatrix::from_rows(1, vec![0.5, -0.5]);
    let weights = vec![1.0, 2.0, 1.0];
    let expected = naive(&x, &weights, &y);

    let mut config = EngineConfig::new(1, 0.0, 1).unwrap();
    config.stop_n_elem = 1;
    let got = fska(x, weights, y, config).unwrap();
    assert_approx_eq!(got[0], expected[0], 1e-9);
    assert_approx_eq!(got[1], expected[1], 1e-9);
}

#[test]
fn a_column_of_pure_zero_weight_is_absorbed() {
    let x = DenseMatrix::from_rows(1, vec![0.0, 100.0, 1.0]);
    let weights = vec![1.0, 0.0, 1.0];
    let y = DenseMatrix::from_rows(1, vec![0.5]);
    let expected = naive(&x, &weights, &y);

    let mut config = EngineConfig::new(1, 0.0, 2).unwrap();
    config.stop_n_elem = 1;
    let got = fska(x, weights, y, config).unwrap();
    assert_approx_eq!(got[0], expected[0], 1e-9);
}

#[test]
fn single_point_clouds_on_each_side() {
    let x = DenseMatrix::from_rows(3, vec![1.0, 2.0, 3.0]);
    let y = DenseMatrix::from_rows(3, vec![4.0, 5.0, 6.0]);
    let weights = vec![2.5];
    let expected = naive(&x, &weights, &y);

    let got = fska(x, weights, y, EngineConfig::default()).unwrap();
    assert_approx_eq!(got[0], expected[0], 1e-9);
}

#[test]
fn duplicate_points_sum_their_weights() {
    let x = DenseMatrix::from_rows(1, vec![0.0, 0.0, 0.0]);
    let weights = vec![1.0, 1.0, 1.0];
    let y = DenseMatrix::from_rows(1, vec![0.0]);
    let expected = naive(&x, &weights, &y);

    let mut config = EngineConfig::new(1, 0.0, 1).unwrap();
    config.stop_n_elem = 1;
    let got = fska(x, weights, y, config).unwrap();
    assert_approx_eq!(got[0], expected[0], 1e-9);
}

#[test]
fn large_far_field_cloud_approximates_within_eps() {
    let x_data = uniform_cloud(400, 2, -1.0, 1.0, 1);
    let weights = uniform_weights(400, 0.5, 1.5, 2);
    let y_data = gaussian_cloud(20, &[500.0, 500.0], 5.0, 3);

    let x = DenseMatrix::from_column_major(2, x_data);
    let y = DenseMatrix::from_column_major(2, y_data);
    let expected = naive(&x, &weights, &y);

    let eps = 0.05;
    let config = EngineConfig::new(16, eps, 4).unwrap();
    let got = fska(x, weights, y, config).unwrap();
    let bound = (1.0 + 2.0 * eps).ln();
    assert!(
        max_abs_diff(&got, &expected) < bound,
        "pruned result strayed past the log(1 + 2*eps) bound of {}",
        bound
    );
}

#[test]
fn exact_mode_agrees_with_naive_on_a_mixed_cloud() {
    let x_data = uniform_cloud(150, 3, -3.0, 3.0, 11);
    let weights = uniform_weights(150, 0.1, 2.0, 12);
    let y_data = uniform_cloud(25, 3, -3.0, 3.0, 13);

    let x = DenseMatrix::from_column_major(3, x_data);
    let y = DenseMatrix::from_column_major(3, y_data);
    let expected = naive(&x, &weights, &y);

    let config = EngineConfig::new(8, 0.0, 3).unwrap();
    let got = fska(x, weights, y, config).unwrap();
    assert!(
        max_abs_diff(&got, &expected) < 1e-8,
        "eps == 0.0 must reproduce the exact sum"
    );
}

#[test]
fn threading_does_not_change_the_result() {
    let x_data = uniform_cloud(300, 2, -5.0, 5.0, 21);
    let weights = uniform_weights(300, 0.2, 1.0, 22);
    let y_data = uniform_cloud(60, 2, -5.0, 5.0, 23);

    let x = DenseMatrix::from_column_major(2, x_data);
    let y = DenseMatrix::from_column_major(2, y_data);

    let mut single = EngineConfig::new(12, 0.0, 1).unwrap();
    single.stop_n_elem = 8;
    let mut multi = EngineConfig::new(12, 0.0, 6).unwrap();
    multi.stop_n_elem = 8;

    let a = fska(x.clone(), weights.clone(), y.clone(), single).unwrap();
    let b = fska(x, weights, y, multi).unwrap();
    assert!(max_abs_diff(&a, &b) < 1e-9);
}

#[test]
fn pruning_actually_reduces_work_relative_to_stop_n_elem_one() {
    // With eps effectively infinite, every non-leaf pair should prune
    // immediately at the root, so the run should succeed even with a tree
    // barely deeper than one level.
    let x_data = uniform_cloud(5000, 2, -1.0, 1.0, 31);
    let weights = uniform_weights(5000, 1.0, 1.0, 32);
    let y_data = uniform_cloud(100, 2, 100.0, 101.0, 33);

    let x = DenseMatrix::from_column_major(2, x_data);
    let y = DenseMatrix::from_column_major(2, y_data);
    let config = EngineConfig::new(64, 10.0, 4).unwrap();
    let got = fska(x, weights, y, config).unwrap();
    assert_eq!(got.len(), 100);
    assert!(got.iter().all(|v| v.is_finite()));
}

#[test]
fn leaf_layout_covers_every_source_point_exactly_once() {
    let x_data = uniform_cloud(250, 2, -1.0, 1.0, 41);
    let mut x = DenseMatrix::from_column_major(2, x_data);
    let n_min = 9;

    let (indices, leaf_sizes) = leaf_layout(&mut x, n_min).unwrap();

    assert_eq!(indices.len(), 250);
    let mut sorted = indices.clone();
    sorted.sort_unstable();
    assert_eq!(sorted, (0..250).collect::<Vec<_>>());
    assert_eq!(leaf_sizes.iter().sum::<usize>(), 250);
    assert!(leaf_sizes.iter().all(|&len| len >= 1 && len <= n_min));
}

#[test]
fn built_query_tree_leaves_contain_every_one_of_their_points() {
    let y_data = uniform_cloud(600, 3, -10.0, 10.0, 61);
    let mut y = DenseMatrix::from_column_major(3, y_data);
    assert!(every_leaf_border_contains_its_points(&mut y, 12).unwrap());
}

#[test]
fn a_generous_eps_prunes_at_least_once_on_a_split_cloud() {
    let x_data = uniform_cloud(2000, 2, -1.0, 1.0, 51);
    let weights = uniform_weights(2000, 1.0, 1.0, 52);
    let y_data = uniform_cloud(200, 2, 100.0, 101.0, 53);

    let x = DenseMatrix::from_column_major(2, x_data);
    let y = DenseMatrix::from_column_major(2, y_data);
    let expected = naive(&x, &weights, &y);

    let eps = 5.0;
    let config = EngineConfig::new(32, eps, 1).unwrap();

    assert!(
        prune_count_for(x.clone(), weights.clone(), y.clone(), config).unwrap() > 0,
        "a node pair this far apart should prune at least once"
    );

    let got = fska(x, weights, y, config).unwrap();
    let bound = (1.0 + 2.0 * eps).ln();
    assert!(
        max_abs_diff(&got, &expected) < bound,
        "pruning this aggressively should still stay within the log(1 + 2*eps) bound of {}",
        bound
    );
}
