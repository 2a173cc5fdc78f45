// THEORY:
// The `normalization` module is the Normalization Layer. Raw metrics live on very
// different scales (bits, pixel ratios, squared intensities), which makes them hard
// to compare or feed into a downstream ranking. Each metric with a known theoretical
// maximum is divided by it to land in [0, 1].
//
// Key architectural principles:
// 1.  **Injected, immutable table**: The ceilings live in a `NormalizationSpec` value
//     handed to the analyzer through its config. `EIGHT_BIT` is a `const`; nothing
//     mutates the table at runtime and tests can build their own.
// 2.  **No ceiling, no variant**: Metrics marked `Unbounded` (histogram dispersion,
//     raw edge count) produce no normalized value at all rather than a made-up one.
// 3.  **Overflow is reported**: A raw value above its ceiling means the 8-bit input
//     assumption broke. The value is clamped to 1.0 and flagged as `clipped` so the
//     caller can log it.

use crate::core_modules::tonal::MAX_TONAL_VARIANCE;

/// Maximum Shannon entropy of an 8-bit channel, in bits.
pub const MAX_ENTROPY: f64 = 8.0;
/// Edge density is already a fraction of the pixel count.
pub const MAX_EDGE_DENSITY: f64 = 1.0;

/// Every metric the engine emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Entropy,
    ColorEntropy,
    EdgeCount,
    EdgeDensity,
    ColorVariance,
    HistogramStd,
}

impl Metric {
    /// Field name used in the persisted record.
    pub fn name(self) -> &'static str {
        match self {
            Metric::Entropy => "entropy",
            Metric::ColorEntropy => "color_entropy",
            Metric::EdgeCount => "edge_count",
            Metric::EdgeDensity => "edge_density",
            Metric::ColorVariance => "color_variance",
            Metric::HistogramStd => "histogram_std",
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Upper bound used to normalize a metric.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Ceiling {
    TheoreticalMax(f64),
    /// No general maximum exists; the metric is reported raw only.
    Unbounded,
}

/// A normalized metric value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalized {
    /// `raw / ceiling`, clamped to 1.0.
    pub value: f64,
    /// The raw value exceeded its ceiling and was clamped.
    pub clipped: bool,
}

/// Metric name -> theoretical maximum table.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizationSpec {
    pub entropy: Ceiling,
    pub color_entropy: Ceiling,
    pub edge_count: Ceiling,
    pub edge_density: Ceiling,
    pub color_variance: Ceiling,
    pub histogram_std: Ceiling,
}

impl NormalizationSpec {
    /// Ceilings for 8-bit rasters.
    pub const EIGHT_BIT: NormalizationSpec = NormalizationSpec {
        entropy: Ceiling::TheoreticalMax(MAX_ENTROPY),
        color_entropy: Ceiling::TheoreticalMax(MAX_ENTROPY),
        edge_count: Ceiling::Unbounded,
        edge_density: Ceiling::TheoreticalMax(MAX_EDGE_DENSITY),
        color_variance: Ceiling::TheoreticalMax(MAX_TONAL_VARIANCE),
        histogram_std: Ceiling::Unbounded,
    };

    pub fn ceiling(&self, metric: Metric) -> Ceiling {
        match metric {
            Metric::Entropy => self.entropy,
            Metric::ColorEntropy => self.color_entropy,
            Metric::EdgeCount => self.edge_count,
            Metric::EdgeDensity => self.edge_density,
            Metric::ColorVariance => self.color_variance,
            Metric::HistogramStd => self.histogram_std,
        }
    }

    /// Returns a copy of the table with one entry replaced.
    pub fn with(mut self, metric: Metric, ceiling: Ceiling) -> Self {
        let slot = match metric {
            Metric::Entropy => &mut self.entropy,
            Metric::ColorEntropy => &mut self.color_entropy,
            Metric::EdgeCount => &mut self.edge_count,
            Metric::EdgeDensity => &mut self.edge_density,
            Metric::ColorVariance => &mut self.color_variance,
            Metric::HistogramStd => &mut self.histogram_std,
        };
        *slot = ceiling;
        self
    }

    /// Maps a raw value onto [0, 1]. `None` when the metric has no usable ceiling
    /// (unbounded, or a non-positive maximum).
    pub fn normalize(&self, metric: Metric, raw: f64) -> Option<Normalized> {
        match self.ceiling(metric) {
            Ceiling::TheoreticalMax(max) if max.is_finite() && max > 0.0 => {
                let ratio = raw / max;
                if ratio > 1.0 {
                    Some(Normalized { value: 1.0, clipped: true })
                } else {
                    Some(Normalized { value: ratio, clipped: false })
                }
            }
            _ => None,
        }
    }
}

impl Default for NormalizationSpec {
    fn default() -> Self {
        Self::EIGHT_BIT
    }
}
