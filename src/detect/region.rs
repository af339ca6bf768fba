use std::fmt;

/// Axis-aligned rectangle in pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Area of the rectangle, not of whatever it bounds.
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn iou(&self, other: &Rect) -> f32 {
        let ix1 = self.x.max(other.x);
        let iy1 = self.y.max(other.y);
        let ix2 = self.right().min(other.right());
        let iy2 = self.bottom().min(other.bottom());
        if ix2 <= ix1 || iy2 <= iy1 {
            return 0.0;
        }
        let inter = (ix2 - ix1) as f32 * (iy2 - iy1) as f32;
        inter / (self.area() as f32 + other.area() as f32 - inter)
    }
}

/// Rendered as `[x y w h]`, the form the plain-text log records.
impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} {} {} {}]", self.x, self.y, self.width, self.height)
    }
}

/// A connected blob of changed pixels that survived area filtering.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MotionRegion {
    pub rect: Rect,
    /// Number of changed pixels in the blob.
    pub area: u32,
}

/// A rectangle the face capability believes contains a face.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FaceRegion {
    pub rect: Rect,
    pub confidence: f32,
}

impl FaceRegion {
    pub fn new(rect: Rect) -> Self {
        Self {
            rect,
            confidence: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_log_form() {
        assert_eq!(Rect::new(12, 40, 88, 90).to_string(), "[12 40 88 90]");
    }

    #[test]
    fn iou_of_disjoint_and_identical() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(20, 20, 10, 10);
        assert_eq!(a.iou(&b), 0.0);
        assert_eq!(a.iou(&a), 1.0);
    }

    #[test]
    fn iou_partial_overlap() {
        let a = Rect::new(0, 0, 100, 100);
        let b = Rect::new(50, 0, 100, 100);
        let expected = 5000.0 / 15000.0;
        assert!((a.iou(&b) - expected).abs() < 1e-6);
    }
}
