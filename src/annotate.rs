//! Drawing detection results onto the display frame.

use crate::detect::{FaceRegion, MotionRegion, Rect};
use crate::frame::Frame;

pub const MOTION_COLOR: [u8; 3] = [0, 255, 0];
pub const FACE_COLOR: [u8; 3] = [0, 0, 255];
pub const MARKER_COLOR: [u8; 3] = [255, 0, 0];
pub const MOTION_MARKER: &str = "MOTION DETECTED";

const BOX_THICKNESS: u32 = 2;
/// Marker anchor: left edge and text baseline.
const MARKER_ORIGIN: (i64, i64) = (10, 30);
const GLYPH_SCALE: i64 = 2;
const GLYPH_WIDTH: i64 = 5;
const GLYPH_HEIGHT: i64 = 7;

/// Outline motion blobs and faces, and stamp the motion marker when any
/// motion was found.
pub fn annotate(frame: &mut Frame, motion: &[MotionRegion], faces: &[FaceRegion]) {
    for region in motion {
        draw_rect(frame, region.rect, MOTION_COLOR, BOX_THICKNESS);
    }
    for face in faces {
        draw_rect(frame, face.rect, FACE_COLOR, BOX_THICKNESS);
    }
    if !motion.is_empty() {
        draw_text(frame, MOTION_MARKER, MARKER_ORIGIN, MARKER_COLOR);
    }
}

/// Rectangle outline drawn inward from the rect's edges.
pub fn draw_rect(frame: &mut Frame, rect: Rect, color: [u8; 3], thickness: u32) {
    let (x0, y0) = (rect.x as i64, rect.y as i64);
    let (x1, y1) = (rect.right() as i64 - 1, rect.bottom() as i64 - 1);
    for t in 0..thickness as i64 {
        for x in x0..=x1 {
            frame.put_pixel(x, y0 + t, color);
            frame.put_pixel(x, y1 - t, color);
        }
        for y in y0..=y1 {
            frame.put_pixel(x0 + t, y, color);
            frame.put_pixel(x1 - t, y, color);
        }
    }
}

/// Text in a 5x7 bitmap font, scaled 2x. `origin` is the left end of the
/// baseline. Characters without a glyph render as a hollow box.
pub fn draw_text(frame: &mut Frame, text: &str, origin: (i64, i64), color: [u8; 3]) {
    let top = origin.1 - GLYPH_HEIGHT * GLYPH_SCALE;
    let advance = (GLYPH_WIDTH + 1) * GLYPH_SCALE;
    for (i, ch) in text.chars().enumerate() {
        let left = origin.0 + i as i64 * advance;
        let rows = glyph(ch);
        for (row, bits) in rows.iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if bits & (1 << (GLYPH_WIDTH - 1 - col)) == 0 {
                    continue;
                }
                for sy in 0..GLYPH_SCALE {
                    for sx in 0..GLYPH_SCALE {
                        frame.put_pixel(
                            left + col * GLYPH_SCALE + sx,
                            top + row as i64 * GLYPH_SCALE + sy,
                            color,
                        );
                    }
                }
            }
        }
    }
}

fn glyph(ch: char) -> [u8; 7] {
    match ch.to_ascii_uppercase() {
        ' ' => [0; 7],
        'C' => [0x0E, 0x11, 0x10, 0x10, 0x10, 0x11, 0x0E],
        'D' => [0x1E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x1E],
        'E' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x1F],
        'F' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x10],
        'A' => [0x0E, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'I' => [0x0E, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E],
        'M' => [0x11, 0x1B, 0x15, 0x15, 0x11, 0x11, 0x11],
        'N' => [0x11, 0x19, 0x15, 0x13, 0x11, 0x11, 0x11],
        'O' => [0x0E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'T' => [0x1F, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04],
        _ => [0x1F, 0x11, 0x11, 0x11, 0x11, 0x11, 0x1F],
    }
}
