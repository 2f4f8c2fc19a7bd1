use criterion::{Criterion, black_box, criterion_group, criterion_main};

use mosaic_core::{CpuImage, PixelFormat, RectPacker};

// ---------------------------------------------------------------------------
// Rectangle packing
// ---------------------------------------------------------------------------

fn bench_pack_uniform_glyphs(c: &mut Criterion) {
    c.bench_function("pack_1024_glyphs_16x16_into_1024", |b| {
        b.iter(|| {
            let mut packer = RectPacker::new(1024, 1024);
            for _ in 0..1024 {
                black_box(packer.insert(black_box(16), black_box(16), 1));
            }
            black_box(&packer);
        });
    });
}

fn bench_pack_mixed_sizes(c: &mut Criterion) {
    c.bench_function("pack_512_mixed_into_2048", |b| {
        b.iter(|| {
            let mut packer = RectPacker::new(2048, 2048);
            for i in 0..512u32 {
                let w = 8 + (i * 37) % 90;
                let h = 8 + (i * 53) % 70;
                black_box(packer.insert(w, h, 2));
            }
            black_box(&packer);
        });
    });
}

fn bench_pack_until_full(c: &mut Criterion) {
    c.bench_function("pack_until_full_256", |b| {
        b.iter(|| {
            let mut packer = RectPacker::new(256, 256);
            while packer.insert(black_box(8), black_box(8), 0).is_some() {}
            black_box(packer.node_count());
        });
    });
}

// ---------------------------------------------------------------------------
// Pixel conversion
// ---------------------------------------------------------------------------

fn bench_rgb_to_rgba(c: &mut Criterion) {
    let image = CpuImage::new(256, 256, PixelFormat::Rgb8, vec![128; 256 * 256 * 3]).unwrap();
    c.bench_function("convert_rgb8_256x256_to_rgba8", |b| {
        b.iter(|| black_box(image.to_rgba8().len()));
    });
}

criterion_group!(
    benches,
    bench_pack_uniform_glyphs,
    bench_pack_mixed_sizes,
    bench_pack_until_full,
    bench_rgb_to_rgba,
);
criterion_main!(benches);
