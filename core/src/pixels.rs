//! CPU-side image data.
//!
//! [`CpuImage`] holds decoded pixels handed over by whatever loaded them.
//! Uploads always go through [`CpuImage::to_rgba8`], which expands every
//! supported layout to four bytes per pixel.

use std::borrow::Cow;
use std::fmt;

/// Pixel layout of a [`CpuImage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PixelFormat {
    /// 8-bit luminance.
    L8,
    /// 8-bit luminance with 8-bit alpha.
    La8,
    /// 8-bit RGB.
    Rgb8,
    /// 8-bit RGBA.
    #[default]
    Rgba8,
    /// 8-bit BGRA.
    Bgra8,
}

impl PixelFormat {
    /// Bytes per pixel.
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            Self::L8 => 1,
            Self::La8 => 2,
            Self::Rgb8 => 3,
            Self::Rgba8 | Self::Bgra8 => 4,
        }
    }
}

/// Errors produced when constructing or decoding a [`CpuImage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageDataError {
    /// The pixel buffer length does not match `width * height * bpp`.
    SizeMismatch {
        /// Expected byte count.
        expected: usize,
        /// Actual byte count.
        actual: usize,
    },
    /// The encoded image could not be decoded.
    Decode(String),
}

impl fmt::Display for ImageDataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SizeMismatch { expected, actual } => {
                write!(f, "pixel data is {actual} bytes, expected {expected}")
            }
            Self::Decode(msg) => write!(f, "image decode failed: {msg}"),
        }
    }
}

impl std::error::Error for ImageDataError {}

/// Decoded pixels in one of the supported [`PixelFormat`]s.
#[derive(Clone, PartialEq, Eq)]
pub struct CpuImage {
    width: u32,
    height: u32,
    format: PixelFormat,
    data: Vec<u8>,
}

impl CpuImage {
    /// Wrap tightly packed pixel data.
    ///
    /// # Errors
    ///
    /// Returns [`ImageDataError::SizeMismatch`] if `data` is not exactly
    /// `width * height * format.bytes_per_pixel()` bytes.
    pub fn new(
        width: u32,
        height: u32,
        format: PixelFormat,
        data: Vec<u8>,
    ) -> Result<Self, ImageDataError> {
        let expected = width as usize * height as usize * format.bytes_per_pixel();
        if data.len() != expected {
            return Err(ImageDataError::SizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            format,
            data,
        })
    }

    /// An RGBA8 image filled with one color.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = vec![rgba; width as usize * height as usize];
        Self {
            width,
            height,
            format: PixelFormat::Rgba8,
            data: bytemuck::cast_slice(pixels.as_slice()).to_vec(),
        }
    }

    /// Take ownership of an image decoded by the `image` crate.
    ///
    /// Layouts without a direct [`PixelFormat`] counterpart are converted to RGBA8.
    pub fn from_dynamic(image: image::DynamicImage) -> Self {
        let (width, height) = (image.width(), image.height());
        let (format, data) = match image {
            image::DynamicImage::ImageLuma8(buf) => (PixelFormat::L8, buf.into_raw()),
            image::DynamicImage::ImageLumaA8(buf) => (PixelFormat::La8, buf.into_raw()),
            image::DynamicImage::ImageRgb8(buf) => (PixelFormat::Rgb8, buf.into_raw()),
            image::DynamicImage::ImageRgba8(buf) => (PixelFormat::Rgba8, buf.into_raw()),
            other => (PixelFormat::Rgba8, other.to_rgba8().into_raw()),
        };
        Self {
            width,
            height,
            format,
            data,
        }
    }

    /// Decode an encoded image (PNG, ...) from memory.
    ///
    /// # Errors
    ///
    /// Returns [`ImageDataError::Decode`] if the bytes are not a supported image.
    pub fn decode(bytes: &[u8]) -> Result<Self, ImageDataError> {
        let image =
            image::load_from_memory(bytes).map_err(|e| ImageDataError::Decode(e.to_string()))?;
        Ok(Self::from_dynamic(image))
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel layout.
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Raw pixel bytes in [`Self::format`].
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Pixels as RGBA8, borrowing when no conversion is needed.
    pub fn to_rgba8(&self) -> Cow<'_, [u8]> {
        match self.format {
            PixelFormat::Rgba8 => Cow::Borrowed(&self.data),
            PixelFormat::L8 => Cow::Owned(self.data.iter().flat_map(|&l| [l, l, l, 255]).collect()),
            PixelFormat::La8 => Cow::Owned(
                self.data
                    .chunks_exact(2)
                    .flat_map(|p| [p[0], p[0], p[0], p[1]])
                    .collect(),
            ),
            PixelFormat::Rgb8 => Cow::Owned(
                self.data
                    .chunks_exact(3)
                    .flat_map(|p| [p[0], p[1], p[2], 255])
                    .collect(),
            ),
            PixelFormat::Bgra8 => {
                let pixels: &[[u8; 4]] = bytemuck::cast_slice(self.data.as_slice());
                Cow::Owned(pixels.iter().flat_map(|&[b, g, r, a]| [r, g, b, a]).collect())
            }
        }
    }
}

impl fmt::Debug for CpuImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CpuImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("bytes", &self.data.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_wrong_length() {
        let err = CpuImage::new(2, 2, PixelFormat::Rgb8, vec![0; 11]).unwrap_err();
        assert_eq!(
            err,
            ImageDataError::SizeMismatch {
                expected: 12,
                actual: 11
            }
        );
        assert_eq!(err.to_string(), "pixel data is 11 bytes, expected 12");
    }

    #[test]
    fn test_rgba8_is_borrowed() {
        let image = CpuImage::solid(3, 2, [1, 2, 3, 4]);
        assert!(matches!(image.to_rgba8(), Cow::Borrowed(_)));
        assert_eq!(image.to_rgba8().len(), 24);
    }

    #[test]
    fn test_conversions() {
        let l8 = CpuImage::new(1, 1, PixelFormat::L8, vec![7]).unwrap();
        assert_eq!(&*l8.to_rgba8(), &[7, 7, 7, 255]);

        let la8 = CpuImage::new(1, 1, PixelFormat::La8, vec![7, 9]).unwrap();
        assert_eq!(&*la8.to_rgba8(), &[7, 7, 7, 9]);

        let rgb = CpuImage::new(2, 1, PixelFormat::Rgb8, vec![1, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(&*rgb.to_rgba8(), &[1, 2, 3, 255, 4, 5, 6, 255]);

        let bgra = CpuImage::new(1, 1, PixelFormat::Bgra8, vec![1, 2, 3, 4]).unwrap();
        assert_eq!(&*bgra.to_rgba8(), &[3, 2, 1, 4]);
    }

    #[test]
    fn test_from_dynamic_keeps_layout() {
        let gray = image::GrayImage::from_pixel(4, 3, image::Luma([42]));
        let image = CpuImage::from_dynamic(image::DynamicImage::ImageLuma8(gray));
        assert_eq!(image.format(), PixelFormat::L8);
        assert_eq!((image.width(), image.height()), (4, 3));
        assert_eq!(image.data().len(), 12);
    }

    #[test]
    fn test_decode_png() {
        let source = image::RgbaImage::from_pixel(2, 2, image::Rgba([10, 20, 30, 40]));
        let mut encoded = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(source)
            .write_to(&mut encoded, image::ImageFormat::Png)
            .unwrap();

        let decoded = CpuImage::decode(encoded.get_ref()).unwrap();
        assert_eq!(decoded.format(), PixelFormat::Rgba8);
        assert_eq!(&decoded.data()[..4], &[10, 20, 30, 40]);
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(matches!(
            CpuImage::decode(b"not an image"),
            Err(ImageDataError::Decode(_))
        ));
    }
}
