//! Uploading CPU pixels into textures through transient transfer buffers.

use std::borrow::Cow;
use std::sync::Arc;

use mosaic_core::{CpuImage, Rect};

use crate::device::DeviceContext;
use crate::error::GraphicsError;
use crate::resources::Texture;
use crate::types::{
    TextureDescriptor, TextureFormat, TextureTransferInfo, TextureUsage, TransferBufferDescriptor,
};

const RGBA8_BYTES: u32 = 4;

/// Round `value` up to a multiple of `alignment`.
pub(crate) fn align_up(value: u32, alignment: u32) -> u32 {
    value.div_ceil(alignment.max(1)) * alignment.max(1)
}

/// Copy tightly packed RGBA8 rows into `region` of `texture`.
///
/// The pixels go through a transfer buffer that is queued for deferred
/// release as soon as the copy has been submitted.
pub(crate) fn upload_region(
    context: &Arc<DeviceContext>,
    texture: &Texture,
    region: Rect,
    rgba: &[u8],
) -> Result<(), GraphicsError> {
    let row_bytes = region.width * RGBA8_BYTES;
    let expected = row_bytes as usize * region.height as usize;
    if rgba.len() != expected {
        return Err(GraphicsError::InvalidParameter(format!(
            "{} bytes of pixels for a {}x{} region, expected {expected}",
            rgba.len(),
            region.width,
            region.height
        )));
    }
    if region.is_empty() {
        return Ok(());
    }
    let texture_raw = texture.raw().ok_or_else(|| {
        GraphicsError::InvalidParameter("upload target texture handle is empty".into())
    })?;

    let stride = align_up(row_bytes, context.backend().copy_row_alignment());
    let staged: Cow<'_, [u8]> = if stride == row_bytes {
        Cow::Borrowed(rgba)
    } else {
        let mut padded = vec![0u8; stride as usize * region.height as usize];
        for (dst, src) in padded
            .chunks_exact_mut(stride as usize)
            .zip(rgba.chunks_exact(row_bytes as usize))
        {
            dst[..src.len()].copy_from_slice(src);
        }
        Cow::Owned(padded)
    };

    let transfer = context.create_transfer_buffer(
        &TransferBufferDescriptor::upload(staged.len() as u64).with_label("texture upload"),
    )?;
    let transfer_raw = transfer
        .raw()
        .ok_or_else(|| GraphicsError::Internal("transfer buffer handle is empty".into()))?;

    let backend = context.backend();
    backend.write_transfer_buffer(transfer_raw, 0, &staged)?;
    backend.upload_to_texture(
        transfer_raw,
        TextureTransferInfo {
            offset: 0,
            bytes_per_row: stride,
        },
        texture_raw,
        region,
    )?;
    log::trace!("Uploaded {region:?} with stride {stride}");
    Ok(())
}

/// Create a sampled RGBA8 texture holding `image`.
///
/// The image is converted to RGBA8 first. The texture gets
/// [`TextureUsage::SAMPLER`] and [`TextureUsage::COPY_DST`].
pub fn upload_texture(
    context: &Arc<DeviceContext>,
    image: &CpuImage,
    label: Option<&str>,
) -> Result<Texture, GraphicsError> {
    let mut descriptor = TextureDescriptor::new_2d(
        image.width(),
        image.height(),
        TextureFormat::Rgba8Unorm,
        TextureUsage::SAMPLER | TextureUsage::COPY_DST,
    );
    descriptor.label = label.map(str::to_owned);
    let texture = context.create_texture(&descriptor)?;
    let pixels = image.to_rgba8();
    upload_region(
        context,
        &texture,
        Rect::from_size(image.width(), image.height()),
        &pixels,
    )?;
    Ok(texture)
}
