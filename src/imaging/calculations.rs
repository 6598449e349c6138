//! Pure calculation functions for image geometry.
//!
//! All functions here are pure and testable without any I/O or pixel data
//! (auto-crop statistics take small gray buffers but never allocate images).
//!
//! Rounding follows round-half-to-even throughout, so `round_px(2.5) == 2`.

use image::GrayImage;

/// Round a pixel coordinate to the nearest integer, ties to even.
pub fn round_px(value: f64) -> i64 {
    value.round_ties_even() as i64
}

/// Largest edge length, in pixels, a resize may produce.
pub const MAX_EDGE: u32 = 32_768;

/// A pixel rectangle `[top:bottom, left:right]` (end-exclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub left: i64,
    pub top: i64,
    pub right: i64,
    pub bottom: i64,
}

impl CropRect {
    pub fn width(&self) -> i64 {
        self.right - self.left
    }

    pub fn height(&self) -> i64 {
        self.bottom - self.top
    }

    /// Zero or negative area.
    pub fn is_empty(&self) -> bool {
        self.right <= self.left || self.bottom <= self.top
    }
}

/// Calculate resize output dimensions.
///
/// `target_width` / `target_height` are already resolved to pixels; `None`
/// means "not requested".
///
/// - neither requested → unchanged
/// - one requested → the other follows the current aspect ratio
/// - both requested → both taken literally
///
/// Each side is clamped to `1..=MAX_EDGE`.
///
/// # Examples
/// ```
/// # use retouch::imaging::calculations::resize_dimensions;
/// // 200x100 asked for 50px height → 100x50
/// assert_eq!(resize_dimensions((200, 100), None, Some(50)), (100, 50));
/// ```
pub fn resize_dimensions(
    current: (u32, u32),
    target_width: Option<u32>,
    target_height: Option<u32>,
) -> (u32, u32) {
    let (w, h) = current;
    if w == 0 || h == 0 {
        return current;
    }
    let (to_w, to_h) = match (target_width, target_height) {
        (None, None) => return current,
        (Some(tw), None) => {
            let th = round_px(tw as f64 / w as f64 * h as f64);
            (tw as i64, th)
        }
        (None, Some(th)) => {
            let tw = round_px(th as f64 / h as f64 * w as f64);
            (tw, th as i64)
        }
        (Some(tw), Some(th)) => (tw as i64, th as i64),
    };
    let clamp = |side: i64| side.clamp(1, MAX_EDGE as i64) as u32;
    (clamp(to_w), clamp(to_h))
}

/// Calculate the manual crop rectangle from rate parameters.
///
/// `left = round(x*W)`, `top = round(y*H)`, and the bottom-right corner is
/// `left + W*w` / `top + H*h`, clamped to the last column / row.
///
/// # Examples
/// ```
/// # use retouch::imaging::calculations::{manual_crop_rect, CropRect};
/// let rect = manual_crop_rect((100, 100), (0.5, 0.5), (0.6, 0.6));
/// assert_eq!(rect, CropRect { left: 50, top: 50, right: 99, bottom: 99 });
/// ```
pub fn manual_crop_rect(
    dimensions: (u32, u32),
    lt_position_rate: (f64, f64),
    crop_size_rate: (f64, f64),
) -> CropRect {
    let (w, h) = (dimensions.0 as f64, dimensions.1 as f64);
    let left = round_px(lt_position_rate.0 * w);
    let top = round_px(lt_position_rate.1 * h);
    let right = round_px(left as f64 + w * crop_size_rate.0).min(dimensions.0 as i64 - 1);
    let bottom = round_px(top as f64 + h * crop_size_rate.1).min(dimensions.1 as i64 - 1);
    CropRect {
        left,
        top,
        right,
        bottom,
    }
}

/// Rotation pivot in pixel coordinates from a `[0, 1]` rate pair.
pub fn rotation_pivot(dimensions: (u32, u32), center_rate: (f64, f64)) -> (f32, f32) {
    let x = round_px(dimensions.0 as f64 * center_rate.0);
    let y = round_px(dimensions.1 as f64 * center_rate.1);
    (x as f32, y as f32)
}

/// Mean and population standard deviation of a sample.
///
/// Returns `None` for an empty sample.
pub fn mean_std(values: impl Iterator<Item = f64> + Clone) -> Option<(f64, f64)> {
    let (count, sum) = values.clone().fold((0usize, 0.0), |(n, s), v| (n + 1, s + v));
    if count == 0 {
        return None;
    }
    let mean = sum / count as f64;
    let variance = values.map(|v| (v - mean) * (v - mean)).sum::<f64>() / count as f64;
    Some((mean, variance.sqrt()))
}

/// Canny `(low, high)` thresholds derived from gray intensity `mean ∓ std`,
/// clamped to `[0, 255]`.
pub fn canny_thresholds(gray: &GrayImage) -> (f32, f32) {
    let Some((mean, std)) = mean_std(gray.as_raw().iter().map(|&v| v as f64)) else {
        return (0.0, 0.0);
    };
    let high = round_px(mean + std).min(255);
    let low = round_px(mean - std).max(0);
    (low as f32, high as f32)
}

/// Auto-crop bounds from an edge map: `mean ± 2σ` of the edge pixel
/// coordinates on each axis, clamped to the image extents.
///
/// Returns `None` when the edge map holds no edge pixels.
pub fn edge_bounds(edges: &GrayImage) -> Option<CropRect> {
    let points: Vec<(u32, u32)> = edges
        .enumerate_pixels()
        .filter(|(_, _, px)| px.0[0] != 0)
        .map(|(x, y, _)| (x, y))
        .collect();

    let (x_mean, x_std) = mean_std(points.iter().map(|p| p.0 as f64))?;
    let (y_mean, y_std) = mean_std(points.iter().map(|p| p.1 as f64))?;

    let (w, h) = (edges.width() as i64, edges.height() as i64);
    Some(CropRect {
        left: round_px(x_mean - 2.0 * x_std).max(0),
        right: round_px(x_mean + 2.0 * x_std).min(w),
        top: round_px(y_mean - 2.0 * y_std).max(0),
        bottom: round_px(y_mean + 2.0 * y_std).min(h),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use proptest::prelude::*;

    // =========================================================================
    // Rounding
    // =========================================================================

    #[test]
    fn round_px_ties_to_even() {
        assert_eq!(round_px(2.5), 2);
        assert_eq!(round_px(3.5), 4);
        assert_eq!(round_px(-0.5), 0);
        assert_eq!(round_px(7.49), 7);
    }

    // =========================================================================
    // Resize dimensions
    // =========================================================================

    #[test]
    fn resize_no_targets_is_unchanged() {
        assert_eq!(resize_dimensions((640, 480), None, None), (640, 480));
    }

    #[test]
    fn resize_height_derives_width() {
        assert_eq!(resize_dimensions((200, 100), None, Some(50)), (100, 50));
    }

    #[test]
    fn resize_width_derives_height() {
        assert_eq!(resize_dimensions((200, 100), Some(50), None), (50, 25));
    }

    #[test]
    fn resize_both_targets_are_literal() {
        assert_eq!(resize_dimensions((200, 100), Some(30), Some(70)), (30, 70));
    }

    #[test]
    fn resize_never_collapses_below_one_pixel() {
        assert_eq!(resize_dimensions((1000, 10), Some(10), None), (10, 1));
    }

    #[test]
    fn resize_derived_side_saturates() {
        assert_eq!(
            resize_dimensions((100_000, 1), None, Some(100_000)),
            (MAX_EDGE, MAX_EDGE)
        );
        assert_eq!(resize_dimensions((1, 10), Some(MAX_EDGE), None), (MAX_EDGE, MAX_EDGE));
    }

    #[test]
    fn resize_zero_area_source_is_unchanged() {
        assert_eq!(resize_dimensions((0, 10), Some(5), None), (0, 10));
    }

    // =========================================================================
    // Manual crop
    // =========================================================================

    #[test]
    fn manual_crop_clamps_to_last_pixel() {
        let rect = manual_crop_rect((100, 100), (0.5, 0.5), (0.6, 0.6));
        assert_eq!(
            rect,
            CropRect {
                left: 50,
                top: 50,
                right: 99,
                bottom: 99
            }
        );
        assert_eq!((rect.width(), rect.height()), (49, 49));
    }

    #[test]
    fn manual_crop_inner_region() {
        let rect = manual_crop_rect((200, 100), (0.25, 0.1), (0.5, 0.5));
        assert_eq!(
            rect,
            CropRect {
                left: 50,
                top: 10,
                right: 150,
                bottom: 60
            }
        );
    }

    #[test]
    fn manual_crop_at_far_corner_is_empty() {
        let rect = manual_crop_rect((100, 100), (1.0, 1.0), (0.5, 0.5));
        assert!(rect.is_empty());
    }

    #[test]
    fn manual_crop_zero_size_is_empty() {
        let rect = manual_crop_rect((100, 100), (0.2, 0.2), (0.0, 0.3));
        assert!(rect.is_empty());
    }

    proptest! {
        #[test]
        fn manual_crop_bounds_stay_inside_image(
            w in 1u32..400,
            h in 1u32..400,
            x in 0.0f64..=1.0,
            y in 0.0f64..=1.0,
            cw in 0.0f64..=1.0,
            ch in 0.0f64..=1.0,
        ) {
            let rect = manual_crop_rect((w, h), (x, y), (cw, ch));
            if !rect.is_empty() {
                prop_assert!(0 <= rect.left && rect.left < rect.right && rect.right <= w as i64);
                prop_assert!(0 <= rect.top && rect.top < rect.bottom && rect.bottom <= h as i64);
            }
        }
    }

    // =========================================================================
    // Rotation pivot
    // =========================================================================

    #[test]
    fn rotation_pivot_center() {
        assert_eq!(rotation_pivot((200, 100), (0.5, 0.5)), (100.0, 50.0));
    }

    #[test]
    fn rotation_pivot_rounds_half_to_even() {
        assert_eq!(rotation_pivot((5, 5), (0.5, 0.5)), (2.0, 2.0));
    }

    // =========================================================================
    // Statistics
    // =========================================================================

    #[test]
    fn mean_std_of_empty_is_none() {
        assert_eq!(mean_std(std::iter::empty::<f64>()), None);
    }

    #[test]
    fn mean_std_population() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let (mean, std) = mean_std(values.iter().copied()).unwrap();
        assert_eq!(mean, 5.0);
        assert_eq!(std, 2.0);
    }

    #[test]
    fn canny_thresholds_uniform_image() {
        let gray = GrayImage::from_pixel(10, 10, Luma([120]));
        assert_eq!(canny_thresholds(&gray), (120.0, 120.0));
    }

    #[test]
    fn canny_thresholds_clamp_to_byte_range() {
        // Half black, half white: mean 127.5, std 127.5
        let gray = GrayImage::from_fn(10, 10, |x, _| if x < 5 { Luma([0]) } else { Luma([255]) });
        assert_eq!(canny_thresholds(&gray), (0.0, 255.0));
    }

    #[test]
    fn edge_bounds_none_without_edges() {
        let edges = GrayImage::new(20, 20);
        assert_eq!(edge_bounds(&edges), None);
    }

    #[test]
    fn edge_bounds_single_point_collapses() {
        let mut edges = GrayImage::new(20, 20);
        edges.put_pixel(5, 7, Luma([255]));
        let rect = edge_bounds(&edges).unwrap();
        assert_eq!(
            rect,
            CropRect {
                left: 5,
                top: 7,
                right: 5,
                bottom: 7
            }
        );
        assert!(rect.is_empty());
    }

    #[test]
    fn edge_bounds_spread_points() {
        let mut edges = GrayImage::new(100, 100);
        for x in [40, 60] {
            for y in [30, 70] {
                edges.put_pixel(x, y, Luma([255]));
            }
        }
        // x: mean 50, std 10 → [30, 70]; y: mean 50, std 20 → [10, 90]
        let rect = edge_bounds(&edges).unwrap();
        assert_eq!(
            rect,
            CropRect {
                left: 30,
                top: 10,
                right: 70,
                bottom: 90
            }
        );
    }

    #[test]
    fn edge_bounds_clamp_to_extent() {
        let mut edges = GrayImage::new(10, 10);
        edges.put_pixel(0, 0, Luma([255]));
        edges.put_pixel(9, 9, Luma([255]));
        // mean 4.5, std 4.5 → [-4.5, 13.5] clamped to [0, 10]
        let rect = edge_bounds(&edges).unwrap();
        assert_eq!(
            rect,
            CropRect {
                left: 0,
                top: 0,
                right: 10,
                bottom: 10
            }
        );
    }
}
