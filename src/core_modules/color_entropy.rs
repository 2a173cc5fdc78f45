// THEORY:
// The `color_entropy` module is the Color Entropy Aggregator. Grayscale entropy misses
// information that lives only in color: two regions of equal brightness but different
// hue look identical after projection. Measuring each channel's entropy separately
// and averaging recovers part of that signal.
//
// For a single-channel image there is nothing extra to measure, so the aggregator
// hands back the grayscale entropy it was given. This makes
// `color_entropy == entropy` an exact identity for grayscale inputs.

use crate::core_modules::histogram::DistributionStats;
use crate::core_modules::raster::{RasterView, RGB_CHANNELS};

/// Mean per-channel entropy in bits, in [0, 8].
pub fn color_entropy(image: &RasterView<'_>, grayscale_entropy: f64) -> f64 {
    if image.is_grayscale() {
        return grayscale_entropy;
    }

    let channels = RGB_CHANNELS as usize;
    let total: f64 = (0..channels)
        .map(|index| DistributionStats::from_samples(image.channel(index)).entropy)
        .sum();
    total / channels as f64
}
