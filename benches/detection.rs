//! Benchmarks for the detection hot paths

use cascade_detect::{
    detect_multi_scale, equalize_histogram, group_rectangles, rgba_to_grayscale, CascadeBuilder,
    CascadeClassifier, Detector, DetectorConfig, FeatureSet, FrameBuffers, GrayImage, IntegralTables,
    Rect, RgbaFrame, ScanParams, Stage, Stump, WeightedRect,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

/// Three stages of two-rectangle features on a 24x24 window, one tilted.
fn synthetic_cascade() -> CascadeClassifier {
    let edge = |x: f32, thr: f32| {
        Stump::new(
            thr,
            -1.0,
            1.0,
            FeatureSet::Upright(vec![
                WeightedRect::new(x, 4.0, 6.0, 16.0, -1.0),
                WeightedRect::new(x + 6.0, 4.0, 6.0, 16.0, 1.0),
            ]),
        )
    };
    let tilted = Stump::new(
        0.05,
        -0.5,
        0.5,
        FeatureSet::Tilted(vec![WeightedRect::new(12.0, 2.0, 8.0, 6.0, 1.0)]),
    );

    CascadeBuilder::new()
        .window_size(24, 24)
        .add_stage(Stage::new(-0.5, vec![edge(0.0, 0.0), edge(6.0, 0.05)]))
        .add_stage(Stage::new(0.0, vec![edge(2.0, 0.1), tilted]))
        .add_stage(Stage::new(0.5, vec![edge(4.0, 0.2), edge(8.0, 0.1)]))
        .build()
        .expect("valid cascade")
}

fn synthetic_rgba(width: usize, height: usize) -> Vec<u8> {
    (0..width * height)
        .flat_map(|i| {
            let (x, y) = (i % width, i / width);
            let v = ((x * 7 + y * 3) % 256) as u8 ^ ((x / 16 + y / 16) % 2 * 0x80) as u8;
            [v, v / 2, 255 - v, 255]
        })
        .collect()
}

fn benchmark_preprocessing(c: &mut Criterion) {
    let mut group = c.benchmark_group("preprocessing");

    for &(w, h) in &[(320usize, 240usize), (640, 480)] {
        let rgba = synthetic_rgba(w, h);
        group.bench_with_input(BenchmarkId::new("grayscale", format!("{}x{}", w, h)), &rgba, |b, rgba| {
            b.iter(|| black_box(rgba_to_grayscale(black_box(rgba))));
        });

        let gray = rgba_to_grayscale(&rgba);
        group.bench_with_input(BenchmarkId::new("equalize", format!("{}x{}", w, h)), &gray, |b, gray| {
            b.iter(|| {
                let mut pixels = gray.clone();
                equalize_histogram(&mut pixels);
                black_box(pixels)
            });
        });
    }

    group.finish();
}

fn benchmark_tables(c: &mut Criterion) {
    let mut group = c.benchmark_group("integral_tables");

    let rgba = synthetic_rgba(320, 240);
    let gray = GrayImage::from_rgba(&rgba, 320, 240);
    let mut tables = IntegralTables::new();

    group.bench_function("upright", |b| b.iter(|| tables.update(black_box(&gray), false, false)));
    group.bench_function("upright_rotated", |b| b.iter(|| tables.update(black_box(&gray), true, false)));
    group.bench_function("with_edges", |b| b.iter(|| tables.update(black_box(&gray), false, true)));

    group.finish();
}

fn benchmark_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("scan");
    let cascade = synthetic_cascade();

    let rgba = synthetic_rgba(267, 200);
    let gray = GrayImage::from_rgba(&rgba, 267, 200);
    let mut tables = IntegralTables::new();
    tables.update(&gray, true, false);

    group.bench_function("multi_scale_267x200", |b| {
        b.iter(|| black_box(detect_multi_scale(&tables.view(), &cascade, &ScanParams::default())));
    });

    let rects: Vec<Rect> = (0..500)
        .map(|i| {
            let (x, y) = ((i * 37 % 200) as f32, (i * 53 % 150) as f32);
            Rect::new(x, y, 24.0 + (i % 5) as f32, 24.0 + (i % 5) as f32)
        })
        .collect();
    group.bench_function("group_500", |b| b.iter(|| black_box(group_rectangles(black_box(&rects), 1))));

    group.finish();
}

fn benchmark_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    group.sample_size(20);

    let detector = Detector::new(synthetic_cascade(), DetectorConfig::default()).expect("valid config");
    let rgba = synthetic_rgba(640, 480);
    let mut buffers = FrameBuffers::new();

    group.bench_function("detect_640x480", |b| {
        b.iter(|| {
            black_box(
                detector
                    .detect(&RgbaFrame::new(&rgba, 640, 480), &mut buffers)
                    .expect("frame size matches"),
            )
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_preprocessing,
    benchmark_tables,
    benchmark_scan,
    benchmark_pipeline
);
criterion_main!(benches);
