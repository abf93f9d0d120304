//! Benchmarks for BRAW Drill scan throughput
//!
//! Run: cargo bench
//! Run specific: cargo bench -- matcher
//! Compare: cargo bench -- --save-baseline v1 && cargo bench -- --baseline v1

use std::io::Cursor;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tempfile::tempdir;

use braw_drill::carve::signatures::{Matcher, Template};
use braw_drill::reader::ChunkedReader;
use braw_drill::{CarveOptions, Carver};

/// Pseudo-random bytes with no signature in them
fn noise(len: usize) -> Vec<u8> {
    let mut state = 0x2545_f491_u32;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state & 0xFF) as u8 | 0x01
        })
        .collect()
}

// ============================================================================
// Signature Matcher
// ============================================================================

fn benchmark_matcher(c: &mut Criterion) {
    let data = noise(1_000_000);
    let mut group = c.benchmark_group("matcher");
    group.throughput(Throughput::Bytes(data.len() as u64));

    group.bench_function("braw_start_1mb", |b| {
        b.iter(|| {
            let mut matcher = Matcher::new(Template::braw_start());
            for &byte in &data {
                black_box(matcher.advance(byte));
            }
        })
    });

    group.finish();
}

// ============================================================================
// Chunked Reader
// ============================================================================

fn benchmark_reader(c: &mut Criterion) {
    let data = noise(4_000_000);
    let mut group = c.benchmark_group("chunked_reader");
    group.throughput(Throughput::Bytes(data.len() as u64));

    for block in [4_096usize, 65_536, 5 * 1024 * 1024] {
        group.bench_with_input(BenchmarkId::from_parameter(block), &block, |b, &block| {
            b.iter(|| {
                let mut reader = ChunkedReader::new(Cursor::new(&data[..]), block);
                let mut sum = 0u64;
                while let Ok(Some(byte)) = reader.read_one() {
                    sum += byte as u64;
                }
                black_box(sum)
            })
        });
    }

    group.finish();
}

// ============================================================================
// Full Carve (throughput-oriented)
// ============================================================================

fn benchmark_carve(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let mut image = noise(2_000_000);

    let mut file = b"\x00\x00\x00\x08wide\x01\x02\x03\xf8mdat".to_vec();
    file.extend_from_slice(&[0x00, 0x80]);
    file.extend_from_slice(b"data");
    file.extend(std::iter::repeat(0x5A).take(0x80 + 3));
    image.splice(1_000_000..1_000_000, file);

    let mut group = c.benchmark_group("carve");
    group.throughput(Throughput::Bytes(image.len() as u64));
    group.sample_size(10);

    group.bench_function("image_2mb_one_file", |b| {
        b.iter(|| {
            let options = CarveOptions {
                output_dir: dir.path().join("out"),
                checkpoint_path: dir.path().join("position.json"),
                resume: false,
                ..Default::default()
            };
            let result = Carver::new(options)
                .carve_stream(Cursor::new(&image[..]), |_| {})
                .unwrap();
            black_box(result.files_carved)
        })
    });

    group.finish();
}

criterion_group!(benches, benchmark_matcher, benchmark_reader, benchmark_carve);
criterion_main!(benches);
