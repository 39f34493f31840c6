//! Square correlation kernels.
//!
//! [`Kernel::gaussian`] builds the smoothing kernel from sigma;
//! [`sobel_horizontal`] and [`sobel_vertical`] are the fixed derivative
//! kernels used by gradient estimation.

use crate::types::PipelineError;

/// An owned, immutable, odd-sized square kernel with row-major weights.
///
/// Index `(half, half)` is the origin, where `half = (size - 1) / 2`.
#[derive(Debug, Clone, PartialEq)]
pub struct Kernel {
    size: usize,
    weights: Vec<f32>,
}

impl Kernel {
    /// Build a kernel from row-major weights.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::KernelSize`] unless `weights.len()` is the
    /// square of an odd number.
    pub fn from_weights(weights: Vec<f32>) -> Result<Self, PipelineError> {
        let size = weights.len().isqrt();
        if size * size != weights.len() || size % 2 == 0 {
            return Err(PipelineError::KernelSize(weights.len()));
        }
        Ok(Self { size, weights })
    }

    /// A kernel with all weight at the origin.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::KernelSize`] if `size` is even.
    pub fn identity(size: usize) -> Result<Self, PipelineError> {
        if size % 2 == 0 {
            return Err(PipelineError::KernelSize(size * size));
        }
        let mut weights = vec![0.0; size * size];
        let half = (size - 1) / 2;
        weights[half * size + half] = 1.0;
        Ok(Self { size, weights })
    }

    /// Build a 2D Gaussian kernel for `sigma`.
    ///
    /// The size follows [`kernel_size_for_sigma`]. Each weight is the
    /// Gaussian density `exp(-(dx² + dy²) / 2σ²) / 2πσ²` at its offset
    /// from the origin. Weights are not normalized to sum to one; the
    /// normalized convolution rescales its output instead.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Configuration`] if `sigma` is not a
    /// positive finite number.
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_wrap)]
    pub fn gaussian(sigma: f32) -> Result<Self, PipelineError> {
        if !sigma.is_finite() || sigma <= 0.0 {
            return Err(PipelineError::Configuration(format!(
                "sigma must be positive and finite, got {sigma}"
            )));
        }

        let size = kernel_size_for_sigma(sigma);
        let half = ((size - 1) / 2) as isize;
        let two_sigma_sq = 2.0 * sigma * sigma;
        let two_pi_sigma_sq = std::f32::consts::TAU * sigma * sigma;

        let mut weights = Vec::with_capacity(size * size);
        for ky in 0..size as isize {
            for kx in 0..size as isize {
                let dx = (kx - half) as f32;
                let dy = (ky - half) as f32;
                weights.push((-dx.mul_add(dx, dy * dy) / two_sigma_sq).exp() / two_pi_sigma_sq);
            }
        }

        Ok(Self { size, weights })
    }

    /// Side length of the kernel (always odd).
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Distance from the origin to the kernel edge, `(size - 1) / 2`.
    #[must_use]
    pub const fn half(&self) -> usize {
        (self.size - 1) / 2
    }

    /// Row-major weights.
    #[must_use]
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    /// Weight at column `kx`, row `ky`.
    ///
    /// # Panics
    ///
    /// If `kx` or `ky` is outside the kernel.
    #[must_use]
    pub fn weight(&self, kx: usize, ky: usize) -> f32 {
        assert!(kx < self.size && ky < self.size, "kernel index out of range");
        self.weights[ky * self.size + kx]
    }
}

/// Kernel side length for a Gaussian of the given sigma.
///
/// Support beyond roughly three sigma contributes negligibly, so the size
/// grows in bands of half a sigma and stops at 13.
#[must_use]
pub fn kernel_size_for_sigma(sigma: f32) -> usize {
    if sigma < 0.5 {
        3
    } else if sigma < 1.0 {
        5
    } else if sigma < 1.5 {
        7
    } else if sigma < 2.0 {
        9
    } else if sigma < 2.5 {
        11
    } else {
        13
    }
}

const SOBEL_HORIZONTAL: [f32; 9] = [-1.0, 0.0, 1.0, -2.0, 0.0, 2.0, -1.0, 0.0, 1.0];
const SOBEL_VERTICAL: [f32; 9] = [-1.0, -2.0, -1.0, 0.0, 0.0, 0.0, 1.0, 2.0, 1.0];

/// Horizontal derivative kernel `[[-1, 0, 1], [-2, 0, 2], [-1, 0, 1]]`.
#[must_use]
pub fn sobel_horizontal() -> Kernel {
    Kernel {
        size: 3,
        weights: SOBEL_HORIZONTAL.to_vec(),
    }
}

/// Vertical derivative kernel `[[-1, -2, -1], [0, 0, 0], [1, 2, 1]]`.
#[must_use]
pub fn sobel_vertical() -> Kernel {
    Kernel {
        size: 3,
        weights: SOBEL_VERTICAL.to_vec(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn size_bands_match_boundaries() {
        let cases = [
            (0.1, 3),
            (0.49, 3),
            (0.5, 5),
            (0.99, 5),
            (1.0, 7),
            (1.49, 7),
            (1.5, 9),
            (1.99, 9),
            (2.0, 11),
            (2.49, 11),
            (2.5, 13),
            (10.0, 13),
        ];
        for (sigma, expected) in cases {
            assert_eq!(
                kernel_size_for_sigma(sigma),
                expected,
                "sigma={sigma} should give size {expected}",
            );
        }
    }

    #[test]
    fn gaussian_sizes_are_odd() {
        for step in 1..60 {
            let sigma = step as f32 * 0.05;
            let kernel = Kernel::gaussian(sigma).unwrap();
            assert_eq!(kernel.size() % 2, 1, "sigma={sigma}");
            assert_eq!(kernel.weights().len(), kernel.size() * kernel.size());
        }
    }

    #[test]
    fn gaussian_center_is_density_peak() {
        let sigma = 0.99f32;
        let kernel = Kernel::gaussian(sigma).unwrap();
        let half = kernel.half();
        let expected = 1.0 / (std::f32::consts::TAU * sigma * sigma);
        assert!((kernel.weight(half, half) - expected).abs() < 1e-6);
        for &w in kernel.weights() {
            assert!(w > 0.0 && w <= kernel.weight(half, half));
        }
    }

    #[test]
    fn gaussian_is_symmetric() {
        let kernel = Kernel::gaussian(1.7).unwrap();
        let n = kernel.size();
        for ky in 0..n {
            for kx in 0..n {
                let w = kernel.weight(kx, ky);
                assert!((w - kernel.weight(n - 1 - kx, ky)).abs() < 1e-9);
                assert!((w - kernel.weight(kx, n - 1 - ky)).abs() < 1e-9);
                assert!((w - kernel.weight(ky, kx)).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn gaussian_rejects_bad_sigma() {
        assert!(matches!(
            Kernel::gaussian(0.0),
            Err(PipelineError::Configuration(_))
        ));
        assert!(Kernel::gaussian(f32::NAN).is_err());
    }

    #[test]
    fn from_weights_requires_odd_square() {
        assert!(Kernel::from_weights(vec![1.0; 9]).is_ok());
        assert_eq!(
            Kernel::from_weights(vec![1.0; 4]),
            Err(PipelineError::KernelSize(4))
        );
        assert_eq!(
            Kernel::from_weights(vec![1.0; 8]),
            Err(PipelineError::KernelSize(8))
        );
        assert_eq!(
            Kernel::from_weights(Vec::new()),
            Err(PipelineError::KernelSize(0))
        );
    }

    #[test]
    fn identity_has_single_unit_weight() {
        let kernel = Kernel::identity(5).unwrap();
        assert!((kernel.weight(2, 2) - 1.0).abs() < f32::EPSILON);
        let total: f32 = kernel.weights().iter().sum();
        assert!((total - 1.0).abs() < f32::EPSILON);
        assert!(Kernel::identity(4).is_err());
    }

    #[test]
    fn sobel_kernels_are_distinct_and_transposed() {
        let h = sobel_horizontal();
        let v = sobel_vertical();
        assert_eq!(
            h.weights(),
            &[-1.0, 0.0, 1.0, -2.0, 0.0, 2.0, -1.0, 0.0, 1.0]
        );
        assert_eq!(
            v.weights(),
            &[-1.0, -2.0, -1.0, 0.0, 0.0, 0.0, 1.0, 2.0, 1.0]
        );
        for ky in 0..3 {
            for kx in 0..3 {
                assert!((h.weight(kx, ky) - v.weight(ky, kx)).abs() < f32::EPSILON);
            }
        }
    }
}
