use criterion::{black_box, criterion_group, criterion_main, Criterion};

use chrono_ir::TempId;
use chrono_liveness::{Intervals, InterferenceGraph};
use chrono_regalloc::allocate;

/// Builds a synthetic interference graph over `n` nodes where node `i`
/// interferes with nodes `i+1 .. i+band` (a banded graph, roughly what a
/// straight-line run of temporaries with overlapping short live ranges
/// produces), and every node id is also mapped back to itself as a `TempId`.
fn banded_graph(n: usize, band: usize) -> InterferenceGraph {
    let mut adjacency = vec![Vec::new(); n];
    for i in 0..n {
        for j in (i + 1)..n.min(i + band + 1) {
            adjacency[i].push(j);
            adjacency[j].push(i);
        }
    }
    let node_of_temp = (0..n).map(|i| (TempId(i as u32), i)).collect();
    let intervals = (0..n).map(|_| Intervals::new()).collect();
    InterferenceGraph { node_of_temp, adjacency, intervals }
}

fn benchmark_small_function(c: &mut Criterion) {
    let graph = banded_graph(32, 4);
    c.bench_function("allocate_32_nodes_band_4", |b| {
        b.iter(|| allocate(black_box(&graph)));
    });
}

fn benchmark_large_function(c: &mut Criterion) {
    let graph = banded_graph(512, 8);
    c.bench_function("allocate_512_nodes_band_8", |b| {
        b.iter(|| allocate(black_box(&graph)));
    });
}

fn benchmark_dense_function(c: &mut Criterion) {
    let graph = banded_graph(128, 64);
    c.bench_function("allocate_128_nodes_band_64", |b| {
        b.iter(|| allocate(black_box(&graph)));
    });
}

criterion_group!(
    benches,
    benchmark_small_function,
    benchmark_large_function,
    benchmark_dense_function
);
criterion_main!(benches);
