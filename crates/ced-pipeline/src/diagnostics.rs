//! Pipeline diagnostics: timing and counts for each stage.
//!
//! Collected by [`detect_edges_with_diagnostics`](crate::detect_edges_with_diagnostics)
//! around the stage functions, which never time themselves.
//!
//! Time is read through the [`Clock`] trait. [`SystemClock`] is backed by
//! the `web-time` crate, which uses `performance.now()` on WASM and
//! `std::time::Instant` on native.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::{FloatImage, GrayImage, MAX_BRIGHTNESS};

/// Source of monotonic timestamps.
pub trait Clock {
    /// Opaque point in time.
    type Instant;

    /// The current instant.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// [`Clock`] implementation backed by [`web_time::Instant`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    type Instant = web_time::Instant;

    fn now(&self) -> Self::Instant {
        web_time::Instant::now()
    }

    fn elapsed(&self, since: &Self::Instant) -> Duration {
        since.elapsed()
    }
}

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected from a single edge detection run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    /// Stage 1: Gaussian smoothing.
    pub smoothing: StageDiagnostics,
    /// Stage 2: gradient estimation.
    pub gradient: StageDiagnostics,
    /// Stage 3: non-maximum suppression.
    pub suppression: StageDiagnostics,
    /// Stage 4: hysteresis linking.
    pub hysteresis: StageDiagnostics,
    /// Total wall-clock duration of the run (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary counts across all stages.
    pub summary: PipelineSummary,
}

/// Diagnostics for a single stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Gaussian smoothing metrics.
    Smoothing {
        /// Sigma of the Gaussian.
        sigma: f32,
        /// Side length of the kernel selected for `sigma`.
        kernel_size: usize,
    },
    /// Gradient estimation metrics.
    Gradient {
        /// Largest gradient magnitude in the image.
        max_magnitude: f32,
    },
    /// Non-maximum suppression metrics.
    Suppression {
        /// Pixels that kept a non-zero magnitude.
        survivor_count: u64,
    },
    /// Hysteresis metrics.
    Hysteresis {
        /// High threshold.
        high_threshold: u16,
        /// Low threshold.
        low_threshold: u16,
        /// Number of edge pixels in the mask.
        edge_pixel_count: u64,
        /// Total pixel count for computing edge density.
        total_pixel_count: u64,
    },
}

/// High-level summary counts for the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Image width in pixels.
    pub image_width: u32,
    /// Image height in pixels.
    pub image_height: u32,
    /// Total pixel count.
    pub pixel_count: u64,
    /// Number of edge pixels in the final mask.
    pub edge_pixel_count: u64,
}

impl PipelineDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Edge Detection Diagnostics\n{}", "=".repeat(60)));
        lines.push(format!(
            "Image: {}x{} ({} pixels)",
            self.summary.image_width, self.summary.image_height, self.summary.pixel_count,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<24} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        let stages = [
            ("Smoothing", &self.smoothing),
            ("Gradient", &self.gradient),
            ("Suppression", &self.suppression),
            ("Hysteresis", &self.hysteresis),
        ];
        for (name, diag) in stages {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<24} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        lines.push(format!("Edge pixels: {}", self.summary.edge_pixel_count));

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Smoothing { sigma, kernel_size } => {
            format!("sigma={sigma:.2} kernel={kernel_size}x{kernel_size}")
        }
        StageMetrics::Gradient { max_magnitude } => format!("max={max_magnitude:.1}"),
        StageMetrics::Suppression { survivor_count } => format!("survivors={survivor_count}"),
        StageMetrics::Hysteresis {
            high_threshold,
            low_threshold,
            edge_pixel_count,
            total_pixel_count,
        } => {
            #[allow(clippy::cast_precision_loss)]
            let density = if *total_pixel_count > 0 {
                *edge_pixel_count as f64 / *total_pixel_count as f64 * 100.0
            } else {
                0.0
            };
            format!(
                "low={low_threshold} high={high_threshold} edges={edge_pixel_count} ({density:.1}%)",
            )
        }
    }
}

/// Count edge pixels (value == [`MAX_BRIGHTNESS`]) in a mask.
pub(crate) fn count_edge_pixels(image: &GrayImage) -> u64 {
    image
        .pixels()
        .map(|p| u64::from(u8::from(p.0[0] == MAX_BRIGHTNESS)))
        .sum()
}

/// Count pixels with a strictly positive value.
pub(crate) fn count_positive(plane: &FloatImage) -> u64 {
    plane.pixels().map(|p| u64::from(p.0[0] > 0.0)).sum()
}

/// Largest value in a plane, or 0 for an empty one.
pub(crate) fn max_value(plane: &FloatImage) -> f32 {
    plane.pixels().map(|p| p.0[0]).fold(0.0, f32::max)
}
