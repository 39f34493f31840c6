//! Intensity gradient estimation.
//!
//! Correlates the smoothed image with the horizontal and vertical Sobel
//! kernels and derives per-pixel magnitude and a direction folded onto a
//! half circle, scaled to `[0, 8)` so each unit is a `π/8` bin.

use std::f32::consts::PI;

use log::debug;

use crate::convolve::correlate;
use crate::kernel::{sobel_horizontal, sobel_vertical};
use crate::parallel::{ExecutionStrategy, for_each_row};
use crate::types::{FloatImage, GradientField, GrayImage, MIN_SIDE, PipelineError, check_dimensions};

/// Number of direction bins spanning the half circle.
pub const DIRECTION_BINS: f32 = 8.0;

/// Compute gradient magnitude and direction of `image`.
///
/// The first and last rows and columns are left at zero.
///
/// This is step 2 in the pipeline, after smoothing.
///
/// # Errors
///
/// Returns [`PipelineError::Dimension`] if either side of `image` is
/// shorter than 3.
pub fn intensity_gradients(
    image: &GrayImage,
    strategy: ExecutionStrategy,
) -> Result<GradientField, PipelineError> {
    let (width, height) = image.dimensions();
    check_dimensions(width, height, MIN_SIDE)?;

    let horizontal = correlate(image, &sobel_horizontal(), strategy)?;
    let vertical = correlate(image, &sobel_vertical(), strategy)?;
    let gx: &[f32] = &horizontal;
    let gy: &[f32] = &vertical;

    let (w, h) = (width as usize, height as usize);
    let mut magnitude = FloatImage::new(width, height);
    let mut direction = FloatImage::new(width, height);

    for_each_row(strategy, &mut *magnitude, w, |y, row| {
        if y == 0 || y == h - 1 {
            return;
        }
        for x in 1..w - 1 {
            let i = y * w + x;
            row[x] = gx[i].hypot(gy[i]);
        }
    })?;
    for_each_row(strategy, &mut *direction, w, |y, row| {
        if y == 0 || y == h - 1 {
            return;
        }
        for x in 1..w - 1 {
            let i = y * w + x;
            row[x] = direction_bin(gx[i], gy[i]);
        }
    })?;

    debug!("computed {width}x{height} gradient field");
    Ok(GradientField {
        magnitude,
        direction,
    })
}

/// Fold the gradient angle onto `[0, π)` and scale it to `[0, 8)`.
///
/// Opposite gradients describe the same edge orientation, so they share
/// a bin.
#[must_use]
pub fn direction_bin(gx: f32, gy: f32) -> f32 {
    let folded = (gy.atan2(gx) + PI) % PI;
    // Rounding can land exactly on the upper bound.
    let bin = folded / PI * DIRECTION_BINS;
    if bin >= DIRECTION_BINS { 0.0 } else { bin }
}
