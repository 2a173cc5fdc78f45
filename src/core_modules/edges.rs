// THEORY:
// The `edges` module is the Edge Estimator. Edge density is a strong proxy for how
// "busy" an image looks: foliage, text and crowds produce many edge pixels, skies and
// studio backdrops produce almost none.
//
// Key architectural principles:
// 1.  **Adaptive thresholds**: A single fixed Canny threshold pair works on one kind of
//     exposure and fails on the rest. Thresholds are derived from the image's own
//     median intensity instead: `low = (1 - σ)·median`, `high = (1 + σ)·median`.
// 2.  **Policy separate from primitive**: `ThresholdPolicy::derive` is a small pure
//     function over the grayscale statistics. It can be tested and swapped without
//     touching the detector.
// 3.  **Canny primitive**: Detection itself is `imageproc::edges::canny` (Gaussian
//     smoothing, Sobel gradients, non-maximum suppression and hysteresis). The only
//     thing this module keeps from the edge map is the count of marked pixels.
// 4.  **No flat-region edges**: The primitive admits gradient magnitudes that are
//     *equal* to a threshold, so a zero threshold would mark every flat pixel. Both
//     thresholds are floored at one gradient unit.

use crate::core_modules::histogram::DistributionStats;
use crate::error::ShapeError;
use image::GrayImage;
use imageproc::edges::canny;

pub const DEFAULT_SIGMA: f64 = 0.33;
const MAX_INTENSITY: f64 = 255.0;
const MIN_THRESHOLD: f32 = 1.0;
/// Non-maximum suppression only visits interior pixels, so anything thinner than
/// this has no edge candidates.
const MIN_EDGE_EXTENT: u32 = 3;
const EDGE_MARK: u8 = 255;

/// Low/high hysteresis thresholds handed to the Canny primitive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeThresholds {
    pub low: f32,
    pub high: f32,
}

/// Derives Canny thresholds from the median intensity of the grayscale image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdPolicy {
    /// Relative spread around the median. 0.33 keeps roughly a third on each side.
    pub sigma: f64,
}

impl Default for ThresholdPolicy {
    fn default() -> Self {
        Self { sigma: DEFAULT_SIGMA }
    }
}

impl ThresholdPolicy {
    pub fn new(sigma: f64) -> Self {
        Self { sigma }
    }

    /// Thresholds for an image with the given median intensity.
    pub fn from_median(&self, median: f64) -> EdgeThresholds {
        let mut low = ((1.0 - self.sigma) * median).max(0.0).floor();
        let high = ((1.0 + self.sigma) * median).min(MAX_INTENSITY).floor();
        if low >= high {
            low = (high - 1.0).max(0.0);
        }

        let low = (low as f32).max(MIN_THRESHOLD);
        let high = (high as f32).max(low);
        EdgeThresholds { low, high }
    }

    pub fn derive(&self, gray_stats: &DistributionStats) -> EdgeThresholds {
        self.from_median(gray_stats.median())
    }
}

/// Edge pixels found in one grayscale image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeStats {
    pub edge_count: u64,
    /// `edge_count / (width * height)`, in [0, 1].
    pub edge_density: f64,
}

/// Runs Canny with the given thresholds and counts the marked pixels.
pub fn estimate_edges(
    gray: &GrayImage,
    thresholds: EdgeThresholds,
) -> Result<EdgeStats, ShapeError> {
    let (width, height) = gray.dimensions();
    let pixel_count = width as u64 * height as u64;
    if pixel_count == 0 {
        return Err(ShapeError::Empty { width, height });
    }

    let edge_count = if width < MIN_EDGE_EXTENT || height < MIN_EDGE_EXTENT {
        0
    } else {
        let edge_map = canny(gray, thresholds.low, thresholds.high);
        edge_map.as_raw().iter().filter(|&&v| v == EDGE_MARK).count() as u64
    };

    Ok(EdgeStats {
        edge_count,
        edge_density: edge_count as f64 / pixel_count as f64,
    })
}
