//! Connected-region analysis of binary instance masks.

use ndarray::{ArrayView2, Zip};

use crate::config::RegionPolicy;
use crate::types::PixelBox;

/// A connected foreground region of a mask
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    /// Number of foreground pixels in the region
    pub area: usize,
    pub bbox: PixelBox,
}

// 8-connectivity, matching how external contours are traced
const NEIGHBOURS: [(isize, isize); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// Find all 8-connected foreground regions of `mask`, in raster order of
/// their first pixel.
pub fn connected_regions(mask: ArrayView2<'_, bool>) -> Vec<Region> {
    let (rows, cols) = mask.dim();
    let mut visited = vec![false; rows * cols];
    let mut regions = Vec::new();
    let mut stack = Vec::new();

    for ((y, x), &foreground) in mask.indexed_iter() {
        if !foreground || visited[y * cols + x] {
            continue;
        }

        visited[y * cols + x] = true;
        stack.push((y, x));
        let mut region = Region {
            area: 0,
            bbox: PixelBox::from_pixel(x, y),
        };

        while let Some((cy, cx)) = stack.pop() {
            region.area += 1;
            region.bbox.include(cx, cy);

            for (dy, dx) in NEIGHBOURS {
                let (Some(ny), Some(nx)) = (cy.checked_add_signed(dy), cx.checked_add_signed(dx))
                else {
                    continue;
                };
                if ny >= rows || nx >= cols {
                    continue;
                }
                let idx = ny * cols + nx;
                if mask[[ny, nx]] && !visited[idx] {
                    visited[idx] = true;
                    stack.push((ny, nx));
                }
            }
        }

        regions.push(region);
    }

    regions
}

/// Bounding box of the instance described by `mask`, or `None` when the mask
/// has no foreground pixel.
///
/// With [`RegionPolicy::Largest`] only the region with the greatest area is
/// boxed; on equal areas the first region in raster order wins.
pub fn extract_bbox(mask: ArrayView2<'_, bool>, policy: RegionPolicy) -> Option<PixelBox> {
    let regions = connected_regions(mask);

    match policy {
        RegionPolicy::Largest => regions
            .iter()
            .fold(None::<&Region>, |best, region| match best {
                Some(b) if b.area >= region.area => Some(b),
                _ => Some(region),
            })
            .map(|region| region.bbox),
        RegionPolicy::Union => regions
            .iter()
            .map(|region| region.bbox)
            .reduce(|acc, bbox| acc.union(&bbox)),
    }
}

/// Median category value over the pixels selected by `mask`.
///
/// Even-sized samples average the two middle values, truncated toward zero.
/// The sum is taken in `i128` so extreme ids cannot overflow.
pub fn median_category(
    categories: ArrayView2<'_, i64>,
    mask: ArrayView2<'_, bool>,
) -> Option<i64> {
    let mut values = Vec::new();
    Zip::from(&categories).and(&mask).for_each(|&category, &selected| {
        if selected {
            values.push(category);
        }
    });

    if values.is_empty() {
        return None;
    }

    values.sort_unstable();
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        Some(values[mid])
    } else {
        Some(((values[mid - 1] as i128 + values[mid] as i128) / 2) as i64)
    }
}
