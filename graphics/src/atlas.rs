//! Texture atlas: many small images packed into one GPU texture.

use std::sync::Arc;

use mosaic_core::{CpuImage, Rect, RectPacker};

use crate::device::DeviceContext;
use crate::error::GraphicsError;
use crate::resources::Texture;
use crate::types::{TextureDescriptor, TextureFormat, TextureUsage};
use crate::upload;

/// Side length of an atlas created with [`TextureAtlas::with_default_size`].
pub const DEFAULT_ATLAS_SIZE: u32 = 2048;

/// A sampled RGBA8 texture that images are packed into.
///
/// Placement uses a [`RectPacker`]; each added image is copied into its
/// cell through a transient transfer buffer. Cells are never freed.
///
/// # Example
///
/// ```
/// use mosaic_core::{CpuImage, Rect};
/// use mosaic_graphics::{BackendType, ContextParameters, DeviceContext, TextureAtlas};
///
/// let context = DeviceContext::with_parameters(
///     ContextParameters::new().with_backend(BackendType::Dummy),
/// )
/// .unwrap();
/// let mut atlas = TextureAtlas::new(&context, 100, 100).unwrap();
///
/// let glyph = CpuImage::solid(40, 40, [255, 255, 255, 255]);
/// assert_eq!(atlas.add(&glyph, 2).unwrap(), Some(Rect::new(2, 2, 40, 40)));
/// assert_eq!(atlas.add(&glyph, 2).unwrap(), Some(Rect::new(2, 46, 40, 40)));
/// ```
#[derive(Debug)]
pub struct TextureAtlas {
    packer: RectPacker,
    texture: Texture,
}

impl TextureAtlas {
    /// Create an empty atlas of the given size, cleared to transparent black.
    pub fn new(
        context: &Arc<DeviceContext>,
        width: u32,
        height: u32,
    ) -> Result<Self, GraphicsError> {
        let descriptor = TextureDescriptor::new_2d(
            width,
            height,
            TextureFormat::Rgba8Unorm,
            TextureUsage::SAMPLER | TextureUsage::COPY_DST,
        )
        .with_label("texture atlas");
        let texture = context.create_texture(&descriptor)?;

        let clear = vec![0u8; width as usize * height as usize * 4];
        upload::upload_region(context, &texture, Rect::from_size(width, height), &clear)?;

        log::debug!("Created {width}x{height} texture atlas");
        Ok(Self {
            packer: RectPacker::new(width, height),
            texture,
        })
    }

    /// Create a [`DEFAULT_ATLAS_SIZE`] square atlas.
    pub fn with_default_size(context: &Arc<DeviceContext>) -> Result<Self, GraphicsError> {
        Self::new(context, DEFAULT_ATLAS_SIZE, DEFAULT_ATLAS_SIZE)
    }

    /// Atlas width in pixels.
    pub fn width(&self) -> u32 {
        self.packer.width()
    }

    /// Atlas height in pixels.
    pub fn height(&self) -> u32 {
        self.packer.height()
    }

    /// The texture holding the packed images.
    pub fn texture(&self) -> &Texture {
        &self.texture
    }

    /// The packer tracking occupied space.
    pub fn packer(&self) -> &RectPacker {
        &self.packer
    }

    /// Pack `image` with `border` pixels of padding on every side and upload it.
    ///
    /// Returns where the image landed, or `None` if it doesn't fit. Running
    /// out of space is not an error.
    pub fn add(&mut self, image: &CpuImage, border: u32) -> Result<Option<Rect>, GraphicsError> {
        let pixels = image.to_rgba8();
        self.add_rgba8(image.width(), image.height(), &pixels, border)
    }

    /// Like [`add`](Self::add), for tightly packed RGBA8 pixels.
    ///
    /// # Errors
    ///
    /// An image larger than the atlas is `Ok(None)` before anything else is
    /// checked. Otherwise returns [`GraphicsError::InvalidParameter`] if
    /// `pixels` is not `width * height * 4` bytes, and [`GraphicsError::DeviceLost`] if the
    /// atlas texture's context is gone. A failed upload leaves its cell
    /// occupied.
    pub fn add_rgba8(
        &mut self,
        width: u32,
        height: u32,
        pixels: &[u8],
        border: u32,
    ) -> Result<Option<Rect>, GraphicsError> {
        if width > self.width() || height > self.height() {
            log::debug!(
                "{width}x{height} image is larger than the {}x{} atlas",
                self.width(),
                self.height()
            );
            return Ok(None);
        }
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(GraphicsError::InvalidParameter(format!(
                "{} bytes of pixels for a {width}x{height} image, expected {expected}",
                pixels.len()
            )));
        }
        let context = self.texture.context().ok_or(GraphicsError::DeviceLost)?;

        let Some(rect) = self.packer.insert(width, height, border) else {
            log::debug!(
                "No room for {width}x{height} (border {border}) in {}x{} atlas",
                self.width(),
                self.height()
            );
            return Ok(None);
        };
        upload::upload_region(&context, &self.texture, rect, pixels)?;
        Ok(Some(rect))
    }
}
