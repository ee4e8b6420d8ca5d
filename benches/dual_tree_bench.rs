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

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use fska::testing::{uniform_cloud, uniform_weights};
use fska::{fska, DenseMatrix, EngineConfig};

fn clouds(n_x: usize, n_y: usize, dim: usize) -> (DenseMatrix, Vec<f64>, DenseMatrix) {
    let x = DenseMatrix::from_column_major(dim, uniform_cloud(n_x, dim, -10.0, 10.0, 1));
    let weights = uniform_weights(n_x, 0.5, 1.5, 2);
    let y = DenseMatrix::from_column_major(dim, uniform_cloud(n_y, dim, -10.0, 10.0, 3));
    (x, weights, y)
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let (x, weights, y) = clouds(5_000, 500, 4);

    c.bench_function("fska pruned, single thread", |b| {
        b.iter(|| {
            let config = EngineConfig::new(32, 0.05, 1).unwrap();
            fska(
                black_box(x.clone()),
                black_box(weights.clone()),
                black_box(y.clone()),
                config,
            )
            .unwrap()
        })
    });

    c.bench_function("fska pruned, four threads", |b| {
        b.iter(|| {
            let config = EngineConfig::new(32, 0.05, 4).unwrap();
            fska(
                black_box(x.clone()),
                black_box(weights.clone()),
                black_box(y.clone()),
                config,
            )
            .unwrap()
        })
    });

    c.bench_function("fska exact mode, single thread", |b| {
        b.iter(|| {
            let config = EngineConfig::new(32, 0.0, 1).unwrap();
            fska(
                black_box(x.clone()),
                black_box(weights.clone()),
                black_box(y.clone()),
                config,
            )
            .unwrap()
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
