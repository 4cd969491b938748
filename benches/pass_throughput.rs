// Throughput benchmarks for the pass executor
//
// Measures pattern generation and full write/verify passes against an
// in-memory device across chunk sizes.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use secure_erase::algorithms::{PassExecutor, Pattern, PatternGenerator};
use secure_erase::io::MemoryDevice;
use secure_erase::CancelToken;

const DEVICE_SIZE: usize = 16 * 1024 * 1024;

const CHUNK_SIZES: [(&str, usize); 4] = [
    ("64KB", 64 * 1024),
    ("256KB", 256 * 1024),
    ("1MB", 1024 * 1024),
    ("4MB", 4 * 1024 * 1024),
];

fn bench_pattern_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("pattern_generation");
    let size = 1024 * 1024;
    group.throughput(Throughput::Bytes(size as u64));

    for pattern in [Pattern::Zeros, Pattern::Ones, Pattern::Random] {
        group.bench_with_input(BenchmarkId::from_parameter(pattern), &pattern, |b, &pattern| {
            let mut generator = PatternGenerator::new(pattern, size);
            b.iter(|| {
                let buffer = generator.buffer(size).unwrap();
                black_box(buffer[0]);
            });
        });
    }

    group.finish();
}

fn bench_write_pass(c: &mut Criterion) {
    let mut group = c.benchmark_group("write_pass");
    group.throughput(Throughput::Bytes(DEVICE_SIZE as u64));
    group.sample_size(20);

    for (name, chunk_size) in CHUNK_SIZES {
        group.bench_with_input(BenchmarkId::new("zeros", name), &chunk_size, |b, &chunk_size| {
            let mut device = MemoryDevice::new("/dev/bench", DEVICE_SIZE, 0xAB);
            let executor = PassExecutor::new(chunk_size, CancelToken::new());
            b.iter(|| {
                for progress in executor.write_pass(&mut device, Pattern::Zeros) {
                    black_box(progress.unwrap());
                }
            });
        });
    }

    group.finish();
}

fn bench_verify_pass(c: &mut Criterion) {
    let mut group = c.benchmark_group("verify_pass");
    group.throughput(Throughput::Bytes(DEVICE_SIZE as u64));
    group.sample_size(20);

    let mut device = MemoryDevice::new("/dev/bench", DEVICE_SIZE, 0x00);
    let executor = PassExecutor::new(1024 * 1024, CancelToken::new());
    group.bench_function("zeros_1MB", |b| {
        b.iter(|| {
            for progress in executor.verify_pass(&mut device, Pattern::Zeros).unwrap() {
                black_box(progress.unwrap());
            }
        });
    });

    group.finish();
}

criterion_group!(benches, bench_pattern_generation, bench_write_pass, bench_verify_pass);
criterion_main!(benches);
