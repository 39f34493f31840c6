//! Non-maximum suppression.
//!
//! Thins ridges of gradient magnitude to one pixel by keeping only the
//! pixels that are strict local maxima along their own gradient axis.

use log::debug;

use crate::parallel::{ExecutionStrategy, for_each_row};
use crate::types::{
    FloatImage, GradientField, MIN_SIDE, PipelineError, check_dimensions, neighbor_index,
};

/// One of the four comparison axes through a pixel.
///
/// Each axis covers two of the eight direction bins, since opposite
/// directions along an axis describe the same edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// West and east neighbors. Bins `(7, 8)` and `[0, 1]`.
    Horizontal,
    /// Northwest and southeast neighbors. Bins `(1, 3]`.
    Diagonal,
    /// North and south neighbors. Bins `(3, 5]`.
    Vertical,
    /// Northeast and southwest neighbors. Bins `(5, 7]`.
    AntiDiagonal,
}

impl Axis {
    /// Axis for a direction in `[0, 8)`.
    #[must_use]
    pub fn from_direction(bin: f32) -> Self {
        if bin <= 1.0 || bin > 7.0 {
            Self::Horizontal
        } else if bin <= 3.0 {
            Self::Diagonal
        } else if bin <= 5.0 {
            Self::Vertical
        } else {
            Self::AntiDiagonal
        }
    }

    /// `(dx, dy)` of one neighbor on this axis, with y growing downward.
    /// The other neighbor is at the negated offset.
    #[must_use]
    pub const fn offset(self) -> (isize, isize) {
        match self {
            Self::Horizontal => (1, 0),
            Self::Diagonal => (1, 1),
            Self::Vertical => (0, 1),
            Self::AntiDiagonal => (1, -1),
        }
    }
}

/// Suppress every pixel that is not a strict maximum along its axis.
///
/// Survivors keep their magnitude, everything else becomes 0. The first
/// and last rows and columns have no complete neighborhood and are
/// always 0.
///
/// This is step 3 in the pipeline, between gradient estimation and
/// hysteresis.
///
/// # Errors
///
/// Returns [`PipelineError::ShapeMismatch`] if magnitude and direction
/// differ in shape, and [`PipelineError::Dimension`] if either side is
/// shorter than 3.
pub fn non_maximum_suppression(
    field: &GradientField,
    strategy: ExecutionStrategy,
) -> Result<FloatImage, PipelineError> {
    let (width, height) = field.magnitude.dimensions();
    if field.direction.dimensions() != (width, height) {
        return Err(PipelineError::ShapeMismatch);
    }
    check_dimensions(width, height, MIN_SIDE)?;

    let (w, h) = (width as usize, height as usize);
    let magnitude: &[f32] = &field.magnitude;
    let direction: &[f32] = &field.direction;
    let along = |x: usize, y: usize, dx: isize, dy: isize| {
        neighbor_index(x, y, dx, dy, w, h).map_or(0.0, |i| magnitude[i])
    };

    let mut out = FloatImage::new(width, height);
    for_each_row(strategy, &mut *out, w, |y, row| {
        if y == 0 || y == h - 1 {
            return;
        }
        for x in 1..w - 1 {
            let g = magnitude[y * w + x];
            let (dx, dy) = Axis::from_direction(direction[y * w + x]).offset();
            if g > along(x, y, dx, dy) && g > along(x, y, -dx, -dy) {
                row[x] = g;
            }
        }
    })?;

    debug!("suppressed {width}x{height} magnitude field");
    Ok(out)
}
