//! Benchmarks for the packing search engine.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use hexpack::board::{signature, Board};
use hexpack::pieces::{catalog, TETRAHEXES, TRIHEXES};
use hexpack::placement::PlacementTable;
use hexpack::{solve, SolveOptions};

fn single_worker() -> SolveOptions {
    SolveOptions {
        workers: Some(1),
        ..SolveOptions::default()
    }
}

/// Benchmark compiling the placement tables for the tetrahex catalog.
fn bench_compile_placements(c: &mut Criterion) {
    let board = Board::rectangle(5, 6);
    let pieces = catalog(TETRAHEXES);

    c.bench_function("compile_placements", |b| {
        b.iter(|| PlacementTable::compile(black_box(&board), black_box(&pieces), true))
    });
}

/// Benchmark a complete single-worker trihex search.
fn bench_solve_trihexes(c: &mut Criterion) {
    let board = Board::rectangle(4, 3);
    let pieces = catalog(TRIHEXES);

    c.bench_function("solve_trihexes", |b| {
        b.iter(|| solve(black_box(&board), black_box(&pieces), single_worker()))
    });
}

/// Benchmark a tetrahex search on a tight board.
fn bench_solve_tetrahexes(c: &mut Criterion) {
    let board = Board::rectangle(4, 3);
    let pieces = catalog(TETRAHEXES);

    let mut group = c.benchmark_group("tetrahexes");
    group.sample_size(10);
    group.bench_function("solve_4x3", |b| {
        b.iter(|| solve(black_box(&board), black_box(&pieces), single_worker()))
    });
    group.finish();
}

/// Benchmark computing the canonical signature of a solution.
fn bench_signature(c: &mut Criterion) {
    let board = Board::rectangle(4, 3);
    let pieces = catalog(TRIHEXES);
    let summary = solve(&board, &pieces, single_worker());
    let solution = &summary.solutions[0];

    c.bench_function("canonical_signature", |b| {
        b.iter(|| signature(black_box(&board), black_box(&pieces), black_box(solution)))
    });
}

criterion_group!(
    benches,
    bench_compile_placements,
    bench_solve_trihexes,
    bench_solve_tetrahexes,
    bench_signature
);
criterion_main!(benches);
