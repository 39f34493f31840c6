//! Square-kernel correlation over a grayscale image.
//!
//! The kernel is applied without flipping: the weight at column `kx`,
//! row `ky` multiplies the pixel at `(x + kx - half, y + ky - half)`.
//! Pixels within `half` of any edge have no full neighborhood and are
//! left at zero in every output.

use std::cmp::Ordering;

use log::{debug, warn};

use crate::kernel::Kernel;
use crate::parallel::{ExecutionStrategy, for_each_row, reduce_rows};
use crate::types::{FloatImage, GrayImage, MAX_BRIGHTNESS, PipelineError, check_dimensions};

/// Correlate `input` with `kernel`, keeping the raw `f32` sums.
///
/// This is the accumulator used by gradient estimation, where sign and
/// unscaled magnitude must survive.
///
/// # Errors
///
/// Returns [`PipelineError::Dimension`] if either side of `input` is
/// smaller than the kernel.
pub fn correlate(
    input: &GrayImage,
    kernel: &Kernel,
    strategy: ExecutionStrategy,
) -> Result<FloatImage, PipelineError> {
    let (width, height) = input.dimensions();
    check_dimensions(width, height, kernel.size())?;
    debug!(
        "correlating {width}x{height} image with {0}x{0} kernel",
        kernel.size()
    );

    let (w, h) = (width as usize, height as usize);
    let half = kernel.half();
    let src: &[u8] = input.as_raw();

    let mut out = FloatImage::new(width, height);
    for_each_row(strategy, &mut *out, w, |y, row| {
        if y < half || y >= h - half {
            return;
        }
        for (x, dst) in row.iter_mut().enumerate().take(w - half).skip(half) {
            *dst = weighted_sum(src, w, x, y, kernel);
        }
    })?;
    Ok(out)
}

/// Correlate and write the result as 8-bit samples.
///
/// With `normalize` the interior sums are rescaled linearly so the
/// smallest maps to 0 and the largest to [`MAX_BRIGHTNESS`]; a flat
/// interior (all sums equal) produces all zeros. Without it each sum is
/// cast directly, saturating at 0 and 255.
///
/// # Errors
///
/// Returns [`PipelineError::Dimension`] if either side of `input` is
/// smaller than the kernel.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn convolve(
    input: &GrayImage,
    kernel: &Kernel,
    normalize: bool,
    strategy: ExecutionStrategy,
) -> Result<GrayImage, PipelineError> {
    let raw = correlate(input, kernel, strategy)?;
    let half = kernel.half();

    if !normalize {
        return write_bytes(&raw, half, strategy, |value| value as u8);
    }

    let w = raw.width() as usize;
    let h = raw.height() as usize;
    let (min, max) = reduce_rows(
        strategy,
        &raw,
        w,
        (f32::INFINITY, f32::NEG_INFINITY),
        |y, row| {
            if y < half || y >= h - half {
                return (f32::INFINITY, f32::NEG_INFINITY);
            }
            row[half..w - half]
                .iter()
                .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                    (lo.min(v), hi.max(v))
                })
        },
        |a, b| (a.0.min(b.0), a.1.max(b.1)),
    )?;

    // NaN bounds fall through here too.
    if max.partial_cmp(&min) != Some(Ordering::Greater) {
        warn!("flat input to normalized convolution (min={min}, max={max}), output is zero");
        return Ok(GrayImage::new(raw.width(), raw.height()));
    }
    debug!("normalizing convolution output from [{min}, {max}]");

    let range = max - min;
    let scale = f32::from(MAX_BRIGHTNESS);
    write_bytes(&raw, half, strategy, |value| {
        ((value - min) / range * scale) as u8
    })
}

/// Weighted sum of the kernel-sized neighborhood centered on `(x, y)`.
///
/// The accumulator is local to the pixel, so rows can be computed in any
/// order.
fn weighted_sum(src: &[u8], width: usize, x: usize, y: usize, kernel: &Kernel) -> f32 {
    let size = kernel.size();
    let half = kernel.half();
    let mut acc = 0.0f32;
    for (ky, weights) in kernel.weights().chunks_exact(size).enumerate() {
        let start = (y + ky - half) * width + (x - half);
        for (&weight, &pixel) in weights.iter().zip(&src[start..start + size]) {
            acc += weight * f32::from(pixel);
        }
    }
    acc
}

/// Map the interior of `raw` through `to_byte`, leaving the border at 0.
fn write_bytes<F>(
    raw: &FloatImage,
    half: usize,
    strategy: ExecutionStrategy,
    to_byte: F,
) -> Result<GrayImage, PipelineError>
where
    F: Fn(f32) -> u8 + Send + Sync,
{
    let (w, h) = (raw.width() as usize, raw.height() as usize);
    let src: &[f32] = raw;
    let mut out = GrayImage::new(raw.width(), raw.height());
    for_each_row(strategy, &mut *out, w, |y, row| {
        if y < half || y >= h - half {
            return;
        }
        let src_row = &src[y * w..(y + 1) * w];
        for x in half..w - half {
            row[x] = to_byte(src_row[x]);
        }
    })?;
    Ok(out)
}
