//! Connected-component extraction over a binary mask.

use crate::detect::region::Rect;
use crate::frame::GrayFrame;

/// One outer contour of the mask: an 8-connected blob together with any
/// holes it encloses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Component {
    pub bounds: Rect,
    /// Area enclosed by the contour through the centres of the blob's
    /// boundary pixels, rounded down. A filled `w` x `h` rectangle
    /// measures `(w - 1) * (h - 1)`.
    pub area: u32,
}

/// Finds the outer contours of the nonzero pixels, in raster order of each
/// contour's first pixel. Blobs lying inside another blob's hole belong to
/// that blob and are not reported on their own.
pub fn external_components(mask: &GrayFrame) -> Vec<Component> {
    let width = mask.width as usize;
    let height = mask.height as usize;
    if width == 0 || height == 0 {
        return Vec::new();
    }
    let filled = fill_holes(mask.pixels(), width, height);
    let mut visited = vec![false; width * height];
    let mut stack = Vec::new();
    let mut components = Vec::new();

    for start in 0..filled.len() {
        if !filled[start] || visited[start] {
            continue;
        }
        visited[start] = true;
        stack.push(start);

        let (mut min_x, mut min_y) = (usize::MAX, usize::MAX);
        let (mut max_x, mut max_y) = (0usize, 0usize);
        let mut pixels = 0u64;
        let mut boundary = 0u64;

        while let Some(idx) = stack.pop() {
            let x = idx % width;
            let y = idx / width;
            pixels += 1;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
            if touches_outside(&filled, width, height, x, y) {
                boundary += 1;
            }

            for ny in y.saturating_sub(1)..=(y + 1).min(height - 1) {
                for nx in x.saturating_sub(1)..=(x + 1).min(width - 1) {
                    let n = ny * width + nx;
                    if filled[n] && !visited[n] {
                        visited[n] = true;
                        stack.push(n);
                    }
                }
            }
        }

        components.push(Component {
            bounds: Rect::new(
                min_x as u32,
                min_y as u32,
                (max_x - min_x + 1) as u32,
                (max_y - min_y + 1) as u32,
            ),
            area: enclosed_area(pixels, boundary),
        });
    }

    components
}

/// Marks every nonzero pixel and every zero pixel the frame border cannot
/// reach. Background is 4-connected, the dual of 8-connected blobs.
fn fill_holes(pixels: &[u8], width: usize, height: usize) -> Vec<bool> {
    let mut outside = vec![false; width * height];
    let mut stack = Vec::new();
    let border = (0..width)
        .flat_map(|x| [x, (height - 1) * width + x])
        .chain((0..height).flat_map(|y| [y * width, y * width + width - 1]));
    for idx in border {
        if pixels[idx] == 0 && !outside[idx] {
            outside[idx] = true;
            stack.push(idx);
        }
    }

    while let Some(idx) = stack.pop() {
        let x = idx % width;
        let y = idx / width;
        let mut visit = |n: usize| {
            if pixels[n] == 0 && !outside[n] {
                outside[n] = true;
                stack.push(n);
            }
        };
        if x > 0 {
            visit(idx - 1);
        }
        if x + 1 < width {
            visit(idx + 1);
        }
        if y > 0 {
            visit(idx - width);
        }
        if y + 1 < height {
            visit(idx + width);
        }
    }

    outside.into_iter().map(|o| !o).collect()
}

/// A filled pixel lies on the contour when a 4-neighbour is background or
/// off the frame.
fn touches_outside(filled: &[bool], width: usize, height: usize, x: usize, y: usize) -> bool {
    x == 0
        || y == 0
        || x + 1 == width
        || y + 1 == height
        || !filled[y * width + x - 1]
        || !filled[y * width + x + 1]
        || !filled[(y - 1) * width + x]
        || !filled[(y + 1) * width + x]
}

/// Pick's theorem over the lattice of pixel centres: interior points plus
/// half the boundary points minus one, i.e. `filled - boundary / 2 - 1`.
fn enclosed_area(filled: u64, boundary: u64) -> u32 {
    let twice = (2 * filled).saturating_sub(boundary + 2);
    u32::try_from(twice / 2).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_with(width: u32, height: u32, on: &[(u32, u32)]) -> GrayFrame {
        let mut data = vec![0u8; (width * height) as usize];
        for &(x, y) in on {
            data[(y * width + x) as usize] = 255;
        }
        GrayFrame::new(data, width, height).unwrap()
    }

    #[test]
    fn empty_mask_has_no_components() {
        assert!(external_components(&GrayFrame::filled(10, 10, 0)).is_empty());
    }

    #[test]
    fn separate_blobs_get_separate_bounds() {
        let mask = mask_with(10, 10, &[(1, 1), (2, 1), (1, 2), (7, 7), (8, 8)]);
        let comps = external_components(&mask);
        assert_eq!(comps.len(), 2);
        assert_eq!(comps[0].bounds, Rect::new(1, 1, 2, 2));
        assert_eq!(comps[1].bounds, Rect::new(7, 7, 2, 2));
        assert_eq!(comps[1].area, 0);
    }

    #[test]
    fn diagonal_neighbours_connect() {
        let mask = mask_with(5, 5, &[(0, 0), (1, 1), (2, 2), (3, 3)]);
        let comps = external_components(&mask);
        assert_eq!(comps.len(), 1);
        assert_eq!(comps[0].bounds, Rect::new(0, 0, 4, 4));
    }

    #[test]
    fn full_mask_is_one_component() {
        let comps = external_components(&GrayFrame::filled(6, 4, 255));
        assert_eq!(
            comps,
            vec![Component {
                bounds: Rect::new(0, 0, 6, 4),
                area: 15
            }]
        );
    }

    fn ring(size: u32, origin: u32, extra: &[(u32, u32)]) -> GrayFrame {
        let last = origin + size - 1;
        let mut on: Vec<(u32, u32)> = Vec::new();
        for i in origin..=last {
            on.extend([(i, origin), (i, last), (origin, i), (last, i)]);
        }
        on.extend_from_slice(extra);
        mask_with(origin + size + 1, origin + size + 1, &on)
    }

    #[test]
    fn blob_inside_a_hole_is_not_reported() {
        let comps = external_components(&ring(9, 1, &[(5, 5)]));
        assert_eq!(comps.len(), 1);
        assert_eq!(comps[0].bounds, Rect::new(1, 1, 9, 9));
    }

    #[test]
    fn hollow_ring_measures_its_enclosed_area() {
        let hollow = external_components(&ring(9, 1, &[]));
        let solid = external_components(&mask_with(
            11,
            11,
            &(1..10)
                .flat_map(|y| (1..10).map(move |x| (x, y)))
                .collect::<Vec<_>>(),
        ));
        assert_eq!(hollow[0].area, 64);
        assert_eq!(solid[0].area, 64);
    }

    #[test]
    fn gap_in_the_ring_lets_background_in() {
        let mut mask = ring(9, 1, &[(5, 5)]);
        mask.pixels_mut()[11 + 5] = 0;
        let comps = external_components(&mask);
        assert_eq!(comps.len(), 2);
        assert_eq!(comps[1].bounds, Rect::new(5, 5, 1, 1));
    }
}
