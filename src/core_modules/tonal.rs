// THEORY:
// The `tonal` module is the Tonal Variance Estimator: how spread out the brightness
// values of the grayscale projection are. A flat, evenly lit picture scores near zero;
// a picture split between deep shadows and bright highlights approaches the 8-bit
// ceiling of 255²/4 (half the pixels at 0, half at 255).
//
// The variance is read from the grayscale histogram that Distribution Statistics has
// already built, so no extra pass over the pixels is needed.

use crate::core_modules::histogram::DistributionStats;

/// Largest population variance an 8-bit channel can reach.
pub const MAX_TONAL_VARIANCE: f64 = (255.0 * 255.0) / 4.0;

/// Population variance of the grayscale intensities.
pub fn tonal_variance(gray_stats: &DistributionStats) -> f64 {
    gray_stats.variance()
}
