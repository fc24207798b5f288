//! Decoded texture images.
//!
//! Textures are decoded on the loading side into plain RGBA8 pixels so that
//! any renderer can upload them. [`TextureData::mean_colour`] gives renderers
//! without texture sampling a sensible tint.

use anyhow::*;
use image::{GenericImageView, ImageFormat, load_from_memory_with_format};

/// An RGBA8 image in row-major order.
#[derive(Clone, Debug, PartialEq)]
pub struct TextureData {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl TextureData {
    /// Decode raw image file data (PNG, JPEG).
    ///
    /// # Arguments
    ///
    /// * `bytes` represent raw image file data
    /// * `name` is the resource name the texture is registered under
    /// * `format` is an optional file extension hint (e.g., "png"). If None, auto-detect.
    pub fn from_bytes(bytes: &[u8], name: &str, format: Option<&str>) -> Result<Self> {
        let img = match format.and_then(ImageFormat::from_extension) {
            None => image::load_from_memory(bytes)?,
            Some(fmt) => load_from_memory_with_format(bytes, fmt)?,
        };
        let (width, height) = img.dimensions();
        if width == 0 || height == 0 {
            bail!("texture {} has no pixels", name);
        }
        Ok(Self {
            name: name.to_string(),
            width,
            height,
            pixels: img.to_rgba8().into_raw(),
        })
    }

    /// Average colour over all pixels, in `0.0..=1.0` per channel.
    pub fn mean_colour(&self) -> [f32; 3] {
        let mut sum = [0u64; 3];
        let mut count = 0u64;
        for px in self.pixels.chunks_exact(4) {
            sum[0] += u64::from(px[0]);
            sum[1] += u64::from(px[1]);
            sum[2] += u64::from(px[2]);
            count += 1;
        }
        if count == 0 {
            return [1.0, 1.0, 1.0];
        }
        sum.map(|channel| channel as f32 / count as f32 / 255.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_colour_of_two_pixels() {
        let texture = TextureData {
            name: "checker".into(),
            width: 2,
            height: 1,
            pixels: vec![255, 0, 0, 255, 0, 0, 255, 255],
        };
        assert_eq!(texture.mean_colour(), [0.5, 0.0, 0.5]);
    }

    #[test]
    fn garbage_bytes_do_not_decode() {
        assert!(TextureData::from_bytes(b"not an image", "broken.png", Some("png")).is_err());
    }
}
