use anyhow::{anyhow, Result};

/// Pixel layouts a frame source may hand over.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    Rgb24,
    /// Full-resolution Y plane followed by interleaved half-resolution UV.
    Nv12,
    Gray8,
}

impl PixelFormat {
    /// Buffer length a `width` x `height` image needs in this layout.
    pub fn buffer_len(&self, width: u32, height: u32) -> Option<usize> {
        let pixels = (width as usize).checked_mul(height as usize)?;
        match self {
            PixelFormat::Rgb24 => pixels.checked_mul(3),
            PixelFormat::Nv12 => pixels.checked_add(pixels / 2),
            PixelFormat::Gray8 => Some(pixels),
        }
    }
}

/// Convert a captured buffer to packed RGB24.
pub(crate) fn normalize_to_rgb(
    pixels: &[u8],
    width: u32,
    height: u32,
    format: PixelFormat,
) -> Result<Vec<u8>> {
    let expected = format
        .buffer_len(width, height)
        .ok_or_else(|| anyhow!("{:?} frame {}x{} is too large", format, width, height))?;
    if pixels.len() != expected {
        return Err(anyhow!(
            "{:?} frame length mismatch: expected {}, got {}",
            format,
            expected,
            pixels.len()
        ));
    }

    Ok(match format {
        PixelFormat::Rgb24 => pixels.to_vec(),
        PixelFormat::Gray8 => pixels.iter().flat_map(|&p| [p, p, p]).collect(),
        PixelFormat::Nv12 => nv12_to_rgb(pixels, width as usize, height as usize),
    })
}

fn nv12_to_rgb(pixels: &[u8], width: usize, height: usize) -> Vec<u8> {
    let (luma, chroma) = pixels.split_at(width * height);
    let mut rgb = Vec::with_capacity(width * height * 3);
    for row in 0..height {
        let uv_row = &chroma[(row / 2) * width..];
        for col in 0..width {
            let pair = (col / 2) * 2;
            rgb.extend_from_slice(&yuv_to_rgb(
                luma[row * width + col],
                uv_row[pair],
                uv_row[pair + 1],
            ));
        }
    }
    rgb
}

/// Full-range BT.601.
fn yuv_to_rgb(y: u8, u: u8, v: u8) -> [u8; 3] {
    let y = y as f32;
    let u = u as f32 - 128.0;
    let v = v as f32 - 128.0;
    [
        to_channel(y + 1.402 * v),
        to_channel(y - 0.344_136 * u - 0.714_136 * v),
        to_channel(y + 1.772 * u),
    ]
}

fn to_channel(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}
