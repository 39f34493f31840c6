//! ced-pipeline: Canny edge detection core (sans-IO).
//!
//! Turns a grayscale raster into a binary edge mask of the same shape
//! through:
//! Gaussian smoothing -> gradient estimation -> non-maximum suppression ->
//! hysteresis linking.
//!
//! This crate has **no I/O dependencies**. It operates on in-memory
//! [`GrayImage`] buffers; decoding and encoding belong to the caller.
//!
//! The data-parallel stages run on rayon according to
//! [`ExecutionStrategy`]; every strategy produces identical output.

pub mod blur;
pub mod convolve;
pub mod diagnostics;
pub mod gradient;
pub mod hysteresis;
pub mod kernel;
pub mod parallel;
pub mod suppress;
pub mod types;

use log::debug;

pub use diagnostics::{Clock, PipelineDiagnostics, SystemClock};
pub use kernel::Kernel;
pub use parallel::ExecutionStrategy;
pub use types::{
    CannyConfig, CannyStages, FloatImage, GradientField, GrayImage, MAX_BRIGHTNESS, PipelineError,
};

use diagnostics::{PipelineSummary, StageDiagnostics, StageMetrics};

/// Detect edges in a grayscale image.
///
/// Returns a mask of the same shape where edge pixels are
/// [`MAX_BRIGHTNESS`] and everything else is 0.
///
/// # Pipeline steps
///
/// 1. Gaussian smoothing with `config.sigma`, rescaled to `[0, 255]`
/// 2. Sobel gradient magnitude and direction
/// 3. Non-maximum suppression along the gradient axis
/// 4. Hysteresis with `config.high_threshold` / `config.low_threshold`
///
/// # Errors
///
/// Returns [`PipelineError::Configuration`] for an invalid `config`,
/// [`PipelineError::Dimension`] if the image is smaller than the Gaussian
/// kernel selected by `config.sigma`, and [`PipelineError::ThreadPool`] if
/// a dedicated pool cannot be built.
pub fn detect_edges(image: &GrayImage, config: &CannyConfig) -> Result<GrayImage, PipelineError> {
    detect_edges_staged(image, config).map(|stages| stages.edges)
}

/// Like [`detect_edges`], but returns every intermediate product.
///
/// # Errors
///
/// Same as [`detect_edges`].
pub fn detect_edges_staged(
    image: &GrayImage,
    config: &CannyConfig,
) -> Result<CannyStages, PipelineError> {
    config.validate()?;
    debug!(
        "detect_edges: {}x{}, sigma={}, thresholds={}/{}",
        image.width(),
        image.height(),
        config.sigma,
        config.high_threshold,
        config.low_threshold,
    );

    let strategy = config.execution.within_pool();
    config.execution.install(|| -> Result<CannyStages, PipelineError> {
        let smoothed = blur::gaussian_smooth(image, config.sigma, strategy)?;
        let gradient = gradient::intensity_gradients(&smoothed, strategy)?;
        let suppressed = suppress::non_maximum_suppression(&gradient, strategy)?;
        let edges = hysteresis::link_edges(
            &suppressed,
            config.high_threshold,
            config.low_threshold,
            strategy,
        )?;
        Ok(CannyStages {
            smoothed,
            gradient,
            suppressed,
            edges,
        })
    })?
}

/// Like [`detect_edges_staged`], but also times each stage with `clock`
/// and collects per-stage metrics.
///
/// # Errors
///
/// Same as [`detect_edges`].
pub fn detect_edges_with_diagnostics<C: Clock + Sync>(
    image: &GrayImage,
    config: &CannyConfig,
    clock: &C,
) -> Result<(CannyStages, PipelineDiagnostics), PipelineError> {
    config.validate()?;

    let strategy = config.execution.within_pool();
    config.execution.install(|| -> Result<_, PipelineError> {
        let total_start = clock.now();

        let start = clock.now();
        let smoothed = blur::gaussian_smooth(image, config.sigma, strategy)?;
        let smoothing = StageDiagnostics {
            duration: clock.elapsed(&start),
            metrics: StageMetrics::Smoothing {
                sigma: config.sigma,
                kernel_size: kernel::kernel_size_for_sigma(config.sigma),
            },
        };

        let start = clock.now();
        let gradient = gradient::intensity_gradients(&smoothed, strategy)?;
        let gradient_diag = StageDiagnostics {
            duration: clock.elapsed(&start),
            metrics: StageMetrics::Gradient {
                max_magnitude: diagnostics::max_value(&gradient.magnitude),
            },
        };

        let start = clock.now();
        let suppressed = suppress::non_maximum_suppression(&gradient, strategy)?;
        let suppression = StageDiagnostics {
            duration: clock.elapsed(&start),
            metrics: StageMetrics::Suppression {
                survivor_count: diagnostics::count_positive(&suppressed),
            },
        };

        let start = clock.now();
        let edges = hysteresis::link_edges(
            &suppressed,
            config.high_threshold,
            config.low_threshold,
            strategy,
        )?;
        let hysteresis_duration = clock.elapsed(&start);

        let total_duration = clock.elapsed(&total_start);

        let (width, height) = image.dimensions();
        let pixel_count = u64::from(width) * u64::from(height);
        let edge_pixel_count = diagnostics::count_edge_pixels(&edges);

        let diag = PipelineDiagnostics {
            smoothing,
            gradient: gradient_diag,
            suppression,
            hysteresis: StageDiagnostics {
                duration: hysteresis_duration,
                metrics: StageMetrics::Hysteresis {
                    high_threshold: config.high_threshold,
                    low_threshold: config.low_threshold,
                    edge_pixel_count,
                    total_pixel_count: pixel_count,
                },
            },
            total_duration,
            summary: PipelineSummary {
                image_width: width,
                image_height: height,
                pixel_count,
                edge_pixel_count,
            },
        };

        Ok((
            CannyStages {
                smoothed,
                gradient,
                suppressed,
                edges,
            },
            diag,
        ))
    })?
}
