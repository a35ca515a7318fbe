//! ELA and preprocessing benchmarks.
//!
//! ```bash
//! cargo bench --package deepfake-ela-core
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use image::{Rgb, RgbImage};

use deepfake_ela_core::{ElaTransform, Preprocessor, ScratchMode};

fn photo_like(size: u32) -> RgbImage {
    RgbImage::from_fn(size, size, |x, y| {
        let t = ((x as f32 * 0.7).sin() * (y as f32 * 1.1).cos() * 20.0) as i32;
        Rgb([
            (100 + (x * 120 / size) as i32 + t).clamp(0, 255) as u8,
            (80 + (y * 100 / size) as i32 - t / 2).clamp(0, 255) as u8,
            (150 + t / 3).clamp(0, 255) as u8,
        ])
    })
}

fn bench_ela(c: &mut Criterion) {
    let mut group = c.benchmark_group("ela_transform");
    let memory = ElaTransform::new(95).expect("valid quality");
    let disk = ElaTransform::new(95)
        .expect("valid quality")
        .with_scratch(ScratchMode::Disk, None);

    for size in [256u32, 512, 1024] {
        let image = photo_like(size);
        group.bench_with_input(BenchmarkId::new("memory", size), &image, |b, img| {
            b.iter(|| memory.apply(black_box(img)).expect("ela"))
        });
        group.bench_with_input(BenchmarkId::new("disk", size), &image, |b, img| {
            b.iter(|| disk.apply(black_box(img)).expect("ela"))
        });
    }
    group.finish();
}

fn bench_preprocess(c: &mut Criterion) {
    let pre = Preprocessor::default();
    let image = photo_like(1024);
    c.bench_function("resize_normalize_1024", |b| {
        b.iter(|| {
            let resized = pre.resize(black_box(&image)).expect("resize");
            pre.normalize(&resized).expect("normalize")
        })
    });
}

criterion_group!(benches, bench_ela, bench_preprocess);
criterion_main!(benches);
