//! Gaussian smoothing for noise reduction before edge detection.
//!
//! Builds a Gaussian [`Kernel`] for the requested sigma and runs it
//! through the normalized [`convolve`] pass, so the smoothed image always
//! spans the full `[0, 255]` range (or is all zero for a flat input).

use log::debug;

use crate::convolve::convolve;
use crate::kernel::Kernel;
use crate::parallel::ExecutionStrategy;
use crate::types::{GrayImage, PipelineError};

/// Smooth a grayscale image with a Gaussian of the given sigma.
///
/// The kernel lives only for the duration of this call. Pixels within
/// the kernel half-width of any edge are zero in the output.
///
/// This is step 1 in the pipeline, before gradient estimation.
///
/// # Errors
///
/// Returns [`PipelineError::Configuration`] for a non-positive or
/// non-finite sigma and [`PipelineError::Dimension`] if the image is
/// smaller than the kernel.
pub fn gaussian_smooth(
    image: &GrayImage,
    sigma: f32,
    strategy: ExecutionStrategy,
) -> Result<GrayImage, PipelineError> {
    let kernel = Kernel::gaussian(sigma)?;
    debug!("gaussian smoothing, sigma={sigma}, kernel={}", kernel.size());
    convolve(image, &kernel, true, strategy)
}
