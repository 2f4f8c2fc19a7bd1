//! # Mosaic Core
//!
//! CPU-side building blocks for Mosaic:
//! - [`Rect`] - integer axis-aligned rectangles
//! - [`RectPacker`] - binary space-partition packer for texture atlases
//! - [`CpuImage`] - decoded pixel data and RGBA8 conversion

pub mod packer;
pub mod pixels;
pub mod rect;

pub use packer::{NodeId, PackerNode, RectPacker};
pub use pixels::{CpuImage, ImageDataError, PixelFormat};
pub use rect::Rect;

/// Core library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log the core library version.
pub fn init() {
    log::info!("Mosaic Core v{} initialized", VERSION);
}
