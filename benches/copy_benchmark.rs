//! Strategy benchmarks for CopyBench
//!
//! Run with: cargo bench

use copybench::core::{Copier, CopyTask, Interrupt, Strategy, KIB};
use copybench::fs::AssetResolver;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::fs::File;
use std::io::{Cursor, Write};
use tempfile::TempDir;

/// Create a test file of the specified size
fn create_test_file(dir: &std::path::Path, name: &str, size: usize) -> std::path::PathBuf {
    let path = dir.join(name);
    let mut file = File::create(&path).unwrap();

    let chunk_size = 64 * 1024;
    // Printable ASCII so the character strategies see valid text
    let chunk: Vec<u8> = (0..chunk_size).map(|i| b' ' + (i % 95) as u8).collect();
    let mut remaining = size;

    while remaining > 0 {
        let to_write = remaining.min(chunk_size);
        file.write_all(&chunk[..to_write]).unwrap();
        remaining -= to_write;
    }

    path
}

fn label(strategy: &Strategy) -> String {
    match strategy.block_bytes() {
        Some(bytes) => format!(
            "{}/{}",
            strategy.name(),
            humansize::format_size(bytes as u64, humansize::BINARY)
        ),
        None => strategy.name().to_string(),
    }
}

fn bench_strategies_in_memory(c: &mut Criterion) {
    let mut group = c.benchmark_group("in_memory_copy");

    let size = 256 * KIB;
    let data: Vec<u8> = (0..size).map(|i| b' ' + (i % 95) as u8).collect();
    group.throughput(Throughput::Bytes(size as u64));

    for strategy in Strategy::standard_set() {
        let copier = Copier::new(strategy);
        group.bench_with_input(BenchmarkId::new("strategy", label(&strategy)), &data, |b, data| {
            b.iter(|| {
                let mut input = Cursor::new(data.as_slice());
                let mut output = Vec::with_capacity(data.len());
                black_box(copier.copy(&mut input, &mut output).unwrap());
            });
        });
    }

    group.finish();
}

fn bench_block_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("block_size");

    let size = 4 * 1024 * KIB;
    let src_dir = TempDir::new().unwrap();
    let dst_dir = TempDir::new().unwrap();
    let src_file = create_test_file(src_dir.path(), "large.bin", size);
    let dst_file = dst_dir.path().join("large.bin");
    let resolver = AssetResolver::paths_only();
    let interrupt = Interrupt::new();

    group.throughput(Throughput::Bytes(size as u64));

    for block_bytes in [KIB, 4 * KIB, 16 * KIB, 64 * KIB, 256 * KIB] {
        let task = CopyTask::builder()
            .strategy(Strategy::Block { block_bytes })
            .input(src_file.to_str().unwrap())
            .output(dst_file.to_str().unwrap())
            .build()
            .unwrap();

        group.bench_with_input(
            BenchmarkId::new("file", humansize::format_size(block_bytes as u64, humansize::BINARY)),
            &task,
            |b, task| {
                b.iter(|| black_box(task.execute(&resolver, &interrupt).unwrap()));
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_strategies_in_memory, bench_block_sizes);
criterion_main!(benches);
