//! Texture atlas integration tests.
//!
//! Placement tests run against every available backend; pixel checks need
//! the dummy backend's texture storage.

mod common;

use rstest::rstest;

use common::{Backend, TestContext, dummy_context, pixel_at};
use mosaic_core::{CpuImage, PixelFormat, Rect};
use mosaic_graphics::{ResourceKind, TextureAtlas};

// ============================================================================
// Placement
// ============================================================================

#[rstest]
#[case::dummy(Backend::Dummy)]
#[case::webgpu(Backend::WebGpu)]
fn test_atlas_places_images_in_order(#[case] backend: Backend) {
    let Some(ctx) = TestContext::new(backend) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };
    let mut atlas = TextureAtlas::new(&ctx.context, 100, 100).unwrap();
    let glyph = CpuImage::solid(40, 40, [255, 255, 255, 255]);

    assert_eq!(atlas.add(&glyph, 2).unwrap(), Some(Rect::new(2, 2, 40, 40)));
    assert_eq!(atlas.add(&glyph, 2).unwrap(), Some(Rect::new(2, 46, 40, 40)));
    assert_eq!(atlas.add(&glyph, 2).unwrap(), Some(Rect::new(46, 2, 40, 40)));
}

#[rstest]
#[case::dummy(Backend::Dummy)]
#[case::webgpu(Backend::WebGpu)]
fn test_atlas_rejects_oversized_image(#[case] backend: Backend) {
    let Some(ctx) = TestContext::new(backend) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };
    let mut atlas = TextureAtlas::new(&ctx.context, 50, 50).unwrap();
    let wide = CpuImage::solid(60, 10, [0, 0, 0, 255]);
    assert_eq!(atlas.add(&wide, 0).unwrap(), None);
}

#[test]
fn test_atlas_fills_up() {
    let (context, _probe) = dummy_context();
    let mut atlas = TextureAtlas::new(&context, 32, 32).unwrap();
    let tile = CpuImage::solid(16, 16, [9, 9, 9, 9]);

    let placed: Vec<Rect> = (0..4).map(|_| atlas.add(&tile, 0).unwrap().unwrap()).collect();
    assert_eq!(atlas.add(&tile, 0).unwrap(), None);

    for (i, a) in placed.iter().enumerate() {
        for b in &placed[i + 1..] {
            assert!(!a.intersects(b), "{a:?} overlaps {b:?}");
        }
    }
}

// ============================================================================
// Pixel Contents
// ============================================================================

#[test]
fn test_atlas_pixels_land_in_cell() {
    let (context, probe) = dummy_context();
    let mut atlas = TextureAtlas::new(&context, 8, 8).unwrap();
    let red = CpuImage::solid(2, 2, [255, 0, 0, 255]);

    let rect = atlas.add(&red, 1).unwrap().unwrap();
    assert_eq!(rect, Rect::new(1, 1, 2, 2));

    let id = atlas.texture().raw().and_then(|raw| raw.dummy_id()).unwrap();
    let pixels = probe.texture_pixels(id).unwrap();
    for y in 0..8 {
        for x in 0..8 {
            let inside = (1..3).contains(&x) && (1..3).contains(&y);
            let expected = if inside { [255, 0, 0, 255] } else { [0; 4] };
            assert_eq!(pixel_at(&pixels, 8, x, y), expected, "pixel ({x}, {y})");
        }
    }
}

#[test]
fn test_atlas_converts_source_format() {
    let (context, probe) = dummy_context();
    let mut atlas = TextureAtlas::new(&context, 4, 4).unwrap();
    let gray = CpuImage::new(1, 1, PixelFormat::La8, vec![50, 128]).unwrap();

    let rect = atlas.add(&gray, 0).unwrap().unwrap();
    let id = atlas.texture().raw().and_then(|raw| raw.dummy_id()).unwrap();
    let pixels = probe.texture_pixels(id).unwrap();
    assert_eq!(pixel_at(&pixels, 4, rect.x, rect.y), [50, 50, 50, 128]);
}

// ============================================================================
// Staging Buffers
// ============================================================================

#[rstest]
#[case::dummy(Backend::Dummy)]
#[case::webgpu(Backend::WebGpu)]
fn test_atlas_staging_buffers_released_on_flush(#[case] backend: Backend) {
    let Some(ctx) = TestContext::new(backend) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };
    let mut atlas = TextureAtlas::new(&ctx.context, 64, 64).unwrap();
    let icon = CpuImage::solid(8, 8, [1, 2, 3, 4]);
    for _ in 0..3 {
        assert!(atlas.add(&icon, 1).unwrap().is_some());
    }

    // One clear upload plus one per image.
    assert_eq!(ctx.context.pending_releases(), 4);
    assert_eq!(ctx.context.flush().unwrap(), 4);
    assert_eq!(ctx.context.pending_releases(), 0);

    if let Some(probe) = &ctx.probe {
        assert_eq!(probe.released_count(ResourceKind::TransferBuffer), 4);
        assert_eq!(probe.released_count(ResourceKind::Texture), 0);
    }
}

#[test]
fn test_atlas_texture_released_after_drop_and_flush() {
    let (context, probe) = dummy_context();
    let atlas = TextureAtlas::new(&context, 16, 16).unwrap();
    context.flush().unwrap();

    drop(atlas);
    assert_eq!(probe.released_count(ResourceKind::Texture), 0);
    assert_eq!(context.flush().unwrap(), 1);
    assert_eq!(probe.released_count(ResourceKind::Texture), 1);
}
