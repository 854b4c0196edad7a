use std::hint::black_box;
use std::io::{self, Cursor};

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use fmerge::merge::{MergeOptions, OutputMode, merge_streams};

/// Sorted lines "key-000000" .. with every `step`-th key, starting at `offset`.
fn generate_sorted(lines: usize, step: usize, offset: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(lines * 12);
    for i in 0..lines {
        data.extend_from_slice(format!("key-{:06}\n", i * step + offset).as_bytes());
    }
    data
}

fn bench_merge_all(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge_all");
    for lines in [10_000, 100_000] {
        let a = generate_sorted(lines, 2, 0);
        let b = generate_sorted(lines, 2, 1);
        let opts = MergeOptions {
            mode: OutputMode::All,
            ..MergeOptions::default()
        };
        group.bench_with_input(
            BenchmarkId::new("interleaved", lines),
            &(a, b),
            |bench, (a, b)| {
                bench.iter(|| {
                    merge_streams(
                        Cursor::new(black_box(a.as_slice())),
                        Cursor::new(black_box(b.as_slice())),
                        io::sink(),
                        &opts,
                    )
                    .unwrap()
                })
            },
        );
    }
    group.finish();
}

fn bench_merge_unique(c: &mut Criterion) {
    let a = generate_sorted(100_000, 1, 0);
    let b = generate_sorted(100_000, 1, 0);
    let opts = MergeOptions {
        mode: OutputMode::Unique,
        case_insensitive: true,
        ..MergeOptions::default()
    };
    c.bench_function("merge_unique_identical", |bench| {
        bench.iter(|| {
            merge_streams(
                Cursor::new(black_box(a.as_slice())),
                Cursor::new(black_box(b.as_slice())),
                io::sink(),
                &opts,
            )
            .unwrap()
        })
    });
}

fn bench_window_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge_window");
    let a = generate_sorted(50_000, 2, 0);
    let b = generate_sorted(50_000, 2, 1);
    for window in [256usize, 8 * 1024, 256 * 1024] {
        let opts = MergeOptions {
            window_size: window,
            ..MergeOptions::default()
        };
        group.bench_with_input(BenchmarkId::from_parameter(window), &opts, |bench, opts| {
            bench.iter(|| {
                merge_streams(
                    Cursor::new(black_box(a.as_slice())),
                    Cursor::new(black_box(b.as_slice())),
                    io::sink(),
                    opts,
                )
                .unwrap()
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_merge_all, bench_merge_unique, bench_window_sizes);
criterion_main!(benches);
