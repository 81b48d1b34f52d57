//! Benchmarks for frame comparison and persistence analysis.
//!
//! Run with: cargo bench
//! Run with parallel comparison: cargo bench --features rayon
//!
//! The decode benchmark requires fixture files from
//! `tests/fixtures/generate_fixtures.sh`.

use std::{hint::black_box, path::Path};

use criterion::{BenchmarkId, Criterion, Throughput};
use ffmpeg_next::util::log::Level as LogLevel;
use framepersist::{AnalysisOptions, Frame, FrameSequence, PixelComparator, Tolerance, VideoFile};

const HELD_FRAMES: &str = "tests/fixtures/held_frames.mkv";

fn benchmark_comparator(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("compare 1080p RGBA frames");

    let left = Frame::filled(1920, 1080, 4, 128);
    let mut right_samples = left.samples().to_vec();
    if let Some(last) = right_samples.last_mut() {
        *last = 129;
    }
    let right = Frame::new(1920, 1080, 4, right_samples).unwrap();
    group.throughput(Throughput::Bytes(left.samples().len() as u64));

    for tolerance in [0_u64, 16] {
        let comparator = PixelComparator::new(Tolerance::new(tolerance));
        group.bench_with_input(
            BenchmarkId::new("differs (worst case)", tolerance),
            &comparator,
            |bencher, comparator| {
                bencher.iter(|| comparator.differs(black_box(left.samples()), black_box(right.samples())));
            },
        );
        group.bench_with_input(
            BenchmarkId::new("count_differences", tolerance),
            &comparator,
            |bencher, comparator| {
                bencher.iter(|| {
                    comparator.count_differences(black_box(left.samples()), black_box(right.samples()))
                });
            },
        );
    }

    group.finish();
}

fn benchmark_analysis(criterion: &mut Criterion) {
    // 120 frames at 60 fps, each image held for 2 or 3 frames.
    let frames: Vec<Frame> = (0..120_u32)
        .map(|index| Frame::filled(320, 240, 4, ((index * 2 / 5) % 256) as u8))
        .collect();

    criterion.bench_function("analyze 120 in-memory frames", |bencher| {
        bencher.iter(|| {
            let mut source = FrameSequence::new(frames.clone(), 60.0);
            framepersist::analyze(&mut source, &AnalysisOptions::new()).unwrap()
        });
    });
}

fn benchmark_decode_and_analyze(criterion: &mut Criterion) {
    ffmpeg_next::util::log::set_level(LogLevel::Error);

    if !Path::new(HELD_FRAMES).exists() {
        eprintln!("Skipping benchmark: fixture not found");
        return;
    }

    criterion.bench_function("decode and analyze held_frames.mkv", |bencher| {
        bencher.iter(|| {
            let mut video = VideoFile::open(HELD_FRAMES).unwrap();
            framepersist::analyze(&mut video.frames().unwrap(), &AnalysisOptions::new()).unwrap()
        });
    });
}

criterion::criterion_group!(
    benches,
    benchmark_comparator,
    benchmark_analysis,
    benchmark_decode_and_analyze,
);

criterion::criterion_main!(benches);
