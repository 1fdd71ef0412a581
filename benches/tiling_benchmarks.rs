use bgremove_tiles::{
    config::TilingMode, merge_quadrants, params::parse_shifts, split_quadrants,
    IcholPreconditioner, Locale, MattingOptions, ModelId, SegmentationBackend, TiledPipeline,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use image::{DynamicImage, Rgba, RgbaImage};
use std::sync::Arc;

/// Backend that returns its input, so only orchestration is measured
struct PassthroughBackend;

impl SegmentationBackend for PassthroughBackend {
    type Session = ();

    fn load_session(&self, _model: ModelId) -> anyhow::Result<()> {
        Ok(())
    }

    fn remove(
        &self,
        image: &DynamicImage,
        _session: &(),
        _options: &MattingOptions,
        _preconditioner: &IcholPreconditioner,
    ) -> anyhow::Result<DynamicImage> {
        Ok(DynamicImage::ImageRgba8(image.to_rgba8()))
    }
}

fn test_image(size: u32) -> DynamicImage {
    let mut image = RgbaImage::new(size, size);
    for (x, y, pixel) in image.enumerate_pixels_mut() {
        *pixel = Rgba([(x % 256) as u8, (y % 256) as u8, 128, 255]);
    }
    DynamicImage::ImageRgba8(image)
}

fn bench_split_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("split_merge");
    for size in [256u32, 1024, 2048] {
        let image = test_image(size);
        group.bench_with_input(BenchmarkId::new("split", size), &image, |b, image| {
            b.iter(|| split_quadrants(black_box(image)).unwrap());
        });

        let tiles = split_quadrants(&image).unwrap().map(|tile| tile.image);
        for mode in [TilingMode::Legacy, TilingMode::Exact] {
            group.bench_with_input(
                BenchmarkId::new(format!("merge_{mode}"), size),
                &tiles,
                |b, tiles| b.iter(|| merge_quadrants(black_box(tiles), mode)),
            );
        }
    }
    group.finish();
}

fn bench_tiled_pipeline(c: &mut Criterion) {
    let pipeline = TiledPipeline::new(Arc::new(PassthroughBackend), Locale::En, TilingMode::Exact);
    let options = MattingOptions::default();
    let preconditioner = IcholPreconditioner::default();
    let image = test_image(1024);

    c.bench_function("tiled_pipeline_1024", |b| {
        b.iter(|| {
            pipeline
                .process_tiled(black_box(&image), ModelId::U2Net, &options, &preconditioner)
                .unwrap()
        });
    });
}

fn bench_parse_shifts(c: &mut Criterion) {
    let text = "0, 1e-6, 1e-5, 1e-4, 1e-3, 1e-2, 1e-1, 1, 1e1, 1e2, 1e3, 1e5";
    c.bench_function("parse_shifts", |b| {
        b.iter(|| parse_shifts(black_box(text), Locale::En).unwrap());
    });
}

criterion_group!(benches, bench_split_merge, bench_tiled_pipeline, bench_parse_shifts);
criterion_main!(benches);
