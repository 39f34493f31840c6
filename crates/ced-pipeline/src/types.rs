//! Shared types for the ced edge detection pipeline.

use image::Luma;
use serde::{Deserialize, Serialize};

use crate::parallel::ExecutionStrategy;

/// Re-export `GrayImage` so downstream crates can hand pixel buffers to
/// the pipeline without depending on `image` directly.
pub use image::GrayImage;

/// Single-channel `f32` plane with the same shape as the input image.
///
/// Used for raw correlation output, gradient magnitude and direction,
/// and the suppressed magnitude consumed by hysteresis.
pub type FloatImage = imageproc::definitions::Image<Luma<f32>>;

/// Value of a fully-on pixel in the edge mask.
pub const MAX_BRIGHTNESS: u8 = 255;

/// Smallest image side the 3x3 stages (gradient, suppression, hysteresis)
/// can operate on.
pub const MIN_SIDE: usize = 3;

/// Configuration for a Canny edge detection run.
///
/// # Invariants
///
/// `sigma` must be finite and strictly positive, and `low_threshold`
/// must be strictly less than `high_threshold`. [`CannyConfig::validate`]
/// checks both; [`crate::detect_edges`] calls it before touching any
/// pixel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CannyConfig {
    /// Gaussian smoothing sigma. Also selects the kernel size.
    pub sigma: f32,

    /// Hysteresis high threshold. Suppressed magnitudes at or above this
    /// value seed an edge.
    pub high_threshold: u16,

    /// Hysteresis low threshold. Suppressed magnitudes at or above this
    /// value join an edge when connected to a seed.
    pub low_threshold: u16,

    /// How the data-parallel stages are scheduled.
    #[serde(default)]
    pub execution: ExecutionStrategy,
}

impl CannyConfig {
    /// Default smoothing sigma.
    pub const DEFAULT_SIGMA: f32 = 0.99;
    /// Default hysteresis high threshold.
    pub const DEFAULT_HIGH_THRESHOLD: u16 = 105;
    /// Default hysteresis low threshold.
    pub const DEFAULT_LOW_THRESHOLD: u16 = 45;

    /// Check the configuration invariants.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Configuration`] if `sigma` is not a
    /// positive finite number or if `low_threshold >= high_threshold`.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !self.sigma.is_finite() || self.sigma <= 0.0 {
            return Err(PipelineError::Configuration(format!(
                "sigma must be positive and finite, got {}",
                self.sigma
            )));
        }
        if self.low_threshold >= self.high_threshold {
            return Err(PipelineError::Configuration(format!(
                "low threshold ({}) must be less than high threshold ({})",
                self.low_threshold, self.high_threshold
            )));
        }
        if let ExecutionStrategy::Fixed(0) = self.execution {
            return Err(PipelineError::Configuration(
                "fixed thread pool needs at least one thread".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for CannyConfig {
    fn default() -> Self {
        Self {
            sigma: Self::DEFAULT_SIGMA,
            high_threshold: Self::DEFAULT_HIGH_THRESHOLD,
            low_threshold: Self::DEFAULT_LOW_THRESHOLD,
            execution: ExecutionStrategy::default(),
        }
    }
}

/// Per-pixel gradient magnitude and quantized direction.
///
/// Border pixels (first/last row and column) are left at zero and carry
/// no meaning.
#[derive(Debug, Clone)]
pub struct GradientField {
    /// Euclidean norm of the horizontal and vertical derivative responses.
    pub magnitude: FloatImage,
    /// Gradient orientation folded into a half circle and scaled to `[0, 8)`.
    pub direction: FloatImage,
}

/// Every intermediate product of one pipeline run.
///
/// Note: does not derive `PartialEq` because the `f32` planes make
/// equality ill-defined in the presence of NaN.
#[derive(Debug, Clone)]
pub struct CannyStages {
    /// Gaussian-smoothed image, rescaled into `[0, MAX_BRIGHTNESS]`.
    pub smoothed: GrayImage,
    /// Gradient magnitude and direction of the smoothed image.
    pub gradient: GradientField,
    /// Magnitude after non-maximum suppression.
    pub suppressed: FloatImage,
    /// Final binary edge mask (0 or [`MAX_BRIGHTNESS`]).
    pub edges: GrayImage,
}

/// Errors that can occur during edge detection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PipelineError {
    /// The image is too small for the requested operation.
    #[error("image of {width}x{height} is too small, each side must be at least {required}")]
    Dimension {
        /// Image width in pixels.
        width: u32,
        /// Image height in pixels.
        height: u32,
        /// Minimum side length required.
        required: usize,
    },

    /// Invalid thresholds, sigma, or execution settings.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Kernel weights do not form an odd-sized square.
    #[error("kernel must be an odd-sized square, got {0} weights")]
    KernelSize(usize),

    /// Two planes passed to the same stage have different shapes.
    #[error("input planes have mismatched dimensions")]
    ShapeMismatch,

    /// A dedicated thread pool could not be created.
    #[error("failed to build thread pool: {0}")]
    ThreadPool(String),
}

/// Fail with [`PipelineError::Dimension`] unless both sides are at least
/// `required` pixels.
pub(crate) fn check_dimensions(
    width: u32,
    height: u32,
    required: usize,
) -> Result<(), PipelineError> {
    if (width as usize) < required || (height as usize) < required {
        return Err(PipelineError::Dimension {
            width,
            height,
            required,
        });
    }
    Ok(())
}

/// Row-major index of the pixel `(dx, dy)` away from `(x, y)`, or `None`
/// when that pixel falls outside a `width` x `height` plane.
pub(crate) fn neighbor_index(
    x: usize,
    y: usize,
    dx: isize,
    dy: isize,
    width: usize,
    height: usize,
) -> Option<usize> {
    let nx = x.checked_add_signed(dx).filter(|&nx| nx < width)?;
    let ny = y.checked_add_signed(dy).filter(|&ny| ny < height)?;
    Some(ny * width + nx)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = CannyConfig::default();
        assert!((config.sigma - 0.99).abs() < f32::EPSILON);
        assert_eq!(config.high_threshold, 105);
        assert_eq!(config.low_threshold, 45);
        assert_eq!(config.execution, ExecutionStrategy::Parallel);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn low_equal_to_high_is_rejected() {
        let config = CannyConfig {
            low_threshold: 80,
            high_threshold: 80,
            ..CannyConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(PipelineError::Configuration(_))
        ));
    }

    #[test]
    fn low_above_high_is_rejected() {
        let config = CannyConfig {
            low_threshold: 200,
            high_threshold: 100,
            ..CannyConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid configuration: low threshold (200) must be less than high threshold (100)",
        );
    }

    #[test]
    fn non_positive_sigma_is_rejected() {
        for sigma in [0.0, -1.0, f32::NAN, f32::INFINITY] {
            let config = CannyConfig {
                sigma,
                ..CannyConfig::default()
            };
            assert!(
                matches!(config.validate(), Err(PipelineError::Configuration(_))),
                "sigma {sigma} should be rejected",
            );
        }
    }

    #[test]
    fn zero_thread_pool_is_rejected() {
        let config = CannyConfig {
            execution: ExecutionStrategy::Fixed(0),
            ..CannyConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn config_serde_round_trip() {
        let config = CannyConfig {
            sigma: 1.4,
            high_threshold: 150,
            low_threshold: 50,
            execution: ExecutionStrategy::Fixed(2),
        };
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: CannyConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn missing_execution_defaults_to_parallel() {
        let json = r#"{"sigma":0.99,"high_threshold":105,"low_threshold":45}"#;
        let config: CannyConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.execution, ExecutionStrategy::Parallel);
    }

    #[test]
    fn dimension_error_display() {
        let err = check_dimensions(2, 10, 5).unwrap_err();
        assert_eq!(
            err.to_string(),
            "image of 2x10 is too small, each side must be at least 5",
        );
    }

    #[test]
    fn neighbor_index_is_bounds_checked() {
        assert_eq!(neighbor_index(1, 1, -1, -1, 4, 3), Some(0));
        assert_eq!(neighbor_index(3, 2, 0, 0, 4, 3), Some(11));
        assert_eq!(neighbor_index(0, 1, -1, 0, 4, 3), None);
        assert_eq!(neighbor_index(1, 0, 0, -1, 4, 3), None);
        assert_eq!(neighbor_index(3, 1, 1, 0, 4, 3), None);
        assert_eq!(neighbor_index(1, 2, 1, 1, 4, 3), None);
    }

    #[test]
    fn check_dimensions_accepts_exact_size() {
        assert!(check_dimensions(5, 5, 5).is_ok());
        assert!(check_dimensions(5, 4, 5).is_err());
    }
}
