//! Frame containers.
//!
//! - `Frame`: RGB24 color form, used for annotation and display.
//! - `GrayFrame`: single-channel working form, used for differencing and
//!   face detection.
//!
//! Frames are produced once per tick by a `FrameSource` and dropped at the
//! end of the tick. Only the smoothed grayscale derivative survives, as the
//! motion detector's reference.

use anyhow::{anyhow, Context, Result};

use crate::ingest::normalize::{normalize_to_rgb, PixelFormat};

/// RGB24 frame. Pixels are stored row-major, three bytes per pixel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Frame {
    /// Wrap an RGB24 buffer. The buffer length must match the dimensions.
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        let expected = pixel_count(width, height)?
            .checked_mul(3)
            .ok_or_else(|| anyhow!("RGB frame dimensions overflow"))?;
        if data.len() != expected {
            return Err(anyhow!(
                "RGB frame length mismatch: expected {}, got {}",
                expected,
                data.len()
            ));
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Build a frame from a device buffer in any supported pixel format.
    pub fn from_raw(pixels: &[u8], width: u32, height: u32, format: PixelFormat) -> Result<Self> {
        let rgb = normalize_to_rgb(pixels, width, height, format)?;
        Self::new(rgb, width, height)
    }

    /// Uniformly colored frame.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let count = width as usize * height as usize;
        let mut data = Vec::with_capacity(count * 3);
        for _ in 0..count {
            data.extend_from_slice(&rgb);
        }
        Self {
            data,
            width,
            height,
        }
    }

    pub fn from_image(image: image::RgbImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            data: image.into_raw(),
            width,
            height,
        }
    }

    pub fn to_image(&self) -> Result<image::RgbImage> {
        image::RgbImage::from_raw(self.width, self.height, self.data.clone())
            .context("frame buffer does not match its dimensions")
    }

    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 3;
        Some([
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
        ])
    }

    /// Set one pixel. Out-of-bounds writes are ignored so drawing code can
    /// clip against the frame edge for free.
    pub fn put_pixel(&mut self, x: i64, y: i64, rgb: [u8; 3]) {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 3;
        self.data[offset..offset + 3].copy_from_slice(&rgb);
    }

    /// Luma conversion with BT.601 weights.
    pub fn to_gray(&self) -> GrayFrame {
        let data = self
            .data
            .chunks_exact(3)
            .map(|px| {
                let luma = 0.299 * px[0] as f32 + 0.587 * px[1] as f32 + 0.114 * px[2] as f32;
                luma.round().clamp(0.0, 255.0) as u8
            })
            .collect();
        GrayFrame {
            data,
            width: self.width,
            height: self.height,
        }
    }
}

/// Single-channel 8-bit frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrayFrame {
    data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl GrayFrame {
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        let expected = pixel_count(width, height)?;
        if data.len() != expected {
            return Err(anyhow!(
                "gray frame length mismatch: expected {}, got {}",
                expected,
                data.len()
            ));
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    pub fn filled(width: u32, height: u32, value: u8) -> Self {
        Self {
            data: vec![value; width as usize * height as usize],
            width,
            height,
        }
    }

    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.data[y as usize * self.width as usize + x as usize]
    }

    pub fn same_dimensions(&self, other: &GrayFrame) -> bool {
        self.width == other.width && self.height == other.height
    }

    /// Number of pixels with nonzero intensity. Zero means the frame
    /// carries no information (black screen).
    pub fn count_nonzero(&self) -> usize {
        self.data.iter().filter(|&&p| p != 0).count()
    }
}

fn pixel_count(width: u32, height: u32) -> Result<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .ok_or_else(|| anyhow!("frame dimensions overflow"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_mismatched_buffer() {
        assert!(Frame::new(vec![0u8; 10], 2, 2).is_err());
        assert!(GrayFrame::new(vec![0u8; 3], 2, 2).is_err());
    }

    #[test]
    fn gray_conversion_uses_luma_weights() -> Result<()> {
        let frame = Frame::new(vec![255, 0, 0, 0, 255, 0, 0, 0, 255, 255, 255, 255], 2, 2)?;
        let gray = frame.to_gray();
        assert_eq!(gray.pixels(), &[76, 150, 29, 255]);
        Ok(())
    }

    #[test]
    fn black_frame_has_no_nonzero_pixels() {
        let frame = Frame::filled(8, 8, [0, 0, 0]);
        assert_eq!(frame.to_gray().count_nonzero(), 0);

        let mut lit = frame.clone();
        lit.put_pixel(3, 3, [10, 10, 10]);
        assert_eq!(lit.to_gray().count_nonzero(), 1);
    }

    #[test]
    fn put_pixel_clips_out_of_bounds() {
        let mut frame = Frame::filled(4, 4, [0, 0, 0]);
        frame.put_pixel(-1, 2, [255, 255, 255]);
        frame.put_pixel(4, 0, [255, 255, 255]);
        assert_eq!(frame, Frame::filled(4, 4, [0, 0, 0]));
    }

    #[test]
    fn image_round_trip_preserves_pixels() -> Result<()> {
        let mut frame = Frame::filled(3, 2, [1, 2, 3]);
        frame.put_pixel(2, 1, [200, 100, 50]);
        let back = Frame::from_image(frame.to_image()?);
        assert_eq!(back, frame);
        Ok(())
    }
}
