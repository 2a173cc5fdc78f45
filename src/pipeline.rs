// THEORY:
// The `pipeline` module is the top-level API of the metric engine, the Metrics Record
// Assembler. It wires the individual estimators into a single call,
// `analyze(image, filename)`, that turns one decoded raster into one `MetricsRecord`.
//
// Key architectural principles:
// 1.  **Project once**: The grayscale projection is computed a single time and shared
//     by Distribution Statistics, the Tonal Variance Estimator and the Edge Estimator.
//     Color entropy is the only stage that looks at the original channels.
// 2.  **Pure and stateless**: A `ComplexityAnalyzer` holds nothing but its read-only
//     config. Analyzing the same image twice yields identical records, and one
//     analyzer can be shared freely across threads.
// 3.  **Errors carry the filename**: Any shape violation is tagged with the label the
//     caller passed in, so a batch driver can report it and move on.

use crate::core_modules::color_entropy::color_entropy;
use crate::core_modules::edges::{ThresholdPolicy, estimate_edges};
use crate::core_modules::grayscale;
use crate::core_modules::histogram::DistributionStats;
use crate::core_modules::normalization::{Metric, NormalizationSpec};
use crate::core_modules::raster::RasterView;
use crate::core_modules::tonal::tonal_variance;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Configuration for the ComplexityAnalyzer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalyzerConfig {
    /// Theoretical maximum per metric.
    pub normalization: NormalizationSpec,
    /// How Canny thresholds are derived from the grayscale median.
    pub thresholds: ThresholdPolicy,
}

/// The metrics extracted from one image. Field order is the persisted order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsRecord {
    pub filename: String,
    /// `(width, height)`, serialized as `[width, height]`.
    pub image_size: (u32, u32),
    pub entropy: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entropy_normalized: Option<f64>,
    pub color_entropy: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_entropy_normalized: Option<f64>,
    pub edge_count: u64,
    pub edge_density: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge_density_normalized: Option<f64>,
    pub color_variance: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_variance_normalized: Option<f64>,
    pub histogram_std: f64,
}

impl MetricsRecord {
    /// Normalized value of a metric, if the record carries one.
    pub fn normalized(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Entropy => self.entropy_normalized,
            Metric::ColorEntropy => self.color_entropy_normalized,
            Metric::EdgeDensity => self.edge_density_normalized,
            Metric::ColorVariance => self.color_variance_normalized,
            Metric::EdgeCount | Metric::HistogramStd => None,
        }
    }
}

/// The main, top-level struct for the metric engine.
#[derive(Debug, Clone, Default)]
pub struct ComplexityAnalyzer {
    config: AnalyzerConfig,
}

impl ComplexityAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn analyze(&self, image: &RasterView<'_>, filename: &str) -> Result<MetricsRecord> {
        // Stage 1: Grayscale projection, shared by every luminance metric
        let gray =
            grayscale::project(image).map_err(|source| Error::shape(filename, source))?;

        // Stage 2: Distribution statistics of the projection
        let gray_stats = DistributionStats::from_samples(gray.as_raw().iter().copied());
        let entropy = gray_stats.entropy;

        // Stage 3: Per-channel entropy on the original raster
        let color_entropy = color_entropy(image, entropy);

        // Stage 4: Adaptive-threshold edges
        let thresholds = self.config.thresholds.derive(&gray_stats);
        let edges =
            estimate_edges(&gray, thresholds).map_err(|source| Error::shape(filename, source))?;

        // Stage 5: Tonal variance
        let color_variance = tonal_variance(&gray_stats);

        // Stage 6: Normalization and assembly
        let record = MetricsRecord {
            filename: filename.to_string(),
            image_size: (image.width(), image.height()),
            entropy,
            entropy_normalized: self.normalize(filename, Metric::Entropy, entropy),
            color_entropy,
            color_entropy_normalized: self.normalize(
                filename,
                Metric::ColorEntropy,
                color_entropy,
            ),
            edge_count: edges.edge_count,
            edge_density: edges.edge_density,
            edge_density_normalized: self.normalize(
                filename,
                Metric::EdgeDensity,
                edges.edge_density,
            ),
            color_variance,
            color_variance_normalized: self.normalize(
                filename,
                Metric::ColorVariance,
                color_variance,
            ),
            histogram_std: gray_stats.histogram_std,
        };

        tracing::debug!(
            filename,
            width = image.width(),
            height = image.height(),
            entropy = record.entropy,
            edge_density = record.edge_density,
            low_threshold = thresholds.low,
            high_threshold = thresholds.high,
            "analyzed image"
        );

        Ok(record)
    }

    /// Validates a raw interleaved buffer and analyzes it.
    pub fn analyze_raw(
        &self,
        width: u32,
        height: u32,
        channels: u8,
        samples: &[u8],
        filename: &str,
    ) -> Result<MetricsRecord> {
        let view = RasterView::new(width, height, channels, samples)
            .map_err(|source| Error::shape(filename, source))?;
        self.analyze(&view, filename)
    }

    fn normalize(&self, filename: &str, metric: Metric, raw: f64) -> Option<f64> {
        let normalized = self.config.normalization.normalize(metric, raw)?;
        if normalized.clipped {
            tracing::warn!(
                filename,
                metric = metric.name(),
                raw,
                ceiling = ?self.config.normalization.ceiling(metric),
                "metric exceeds its theoretical maximum; clamped to 1.0"
            );
        }
        Some(normalized.value)
    }
}

/// Analyzes one image with the default 8-bit configuration.
pub fn analyze(image: &RasterView<'_>, filename: &str) -> Result<MetricsRecord> {
    ComplexityAnalyzer::default().analyze(image, filename)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::normalization::Ceiling;
    use crate::error::ShapeError;
    use std::sync::{Arc, Mutex};

    /// Collects formatted log output in memory.
    #[derive(Clone, Default)]
    struct CapturedLog(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLog {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    fn analyze_gray(width: u32, height: u32, samples: &[u8]) -> MetricsRecord {
        ComplexityAnalyzer::default()
            .analyze_raw(width, height, 1, samples, "test.png")
            .unwrap()
    }

    /// Deterministic pseudo-random texture.
    fn noise(len: usize, seed: u32) -> Vec<u8> {
        let mut state = seed;
        (0..len)
            .map(|_| {
                state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                (state >> 24) as u8
            })
            .collect()
    }

    #[test]
    fn two_by_two_black_and_white() {
        let record = analyze_gray(2, 2, &[0, 0, 255, 255]);
        assert_eq!(record.filename, "test.png");
        assert_eq!(record.image_size, (2, 2));
        assert_eq!(record.entropy, 1.0);
        assert_eq!(record.entropy_normalized, Some(0.125));
        assert_eq!(record.color_entropy, 1.0);
        assert_eq!(record.color_variance, 16256.25);
        assert_eq!(record.color_variance_normalized, Some(1.0));
        assert_eq!(record.edge_count, 0);
        assert_eq!(record.edge_density, 0.0);
    }

    #[test]
    fn uniform_images_are_flat_everywhere() {
        for (width, height, value) in [(1u32, 1u32, 0u8), (8, 5, 128), (40, 30, 255)] {
            let samples = vec![value; (width * height) as usize];
            let record = analyze_gray(width, height, &samples);
            assert_eq!(record.entropy, 0.0);
            assert_eq!(record.color_variance, 0.0);
            assert_eq!(record.edge_count, 0);
            assert_eq!(record.edge_density, 0.0);
        }
    }

    #[test]
    fn single_pixel_yields_a_defined_record() {
        let record = analyze_gray(1, 1, &[77]);
        assert_eq!(record.image_size, (1, 1));
        assert_eq!(record.entropy, 0.0);
        assert_eq!(record.color_entropy, 0.0);
        assert_eq!(record.color_variance, 0.0);
        assert_eq!(record.edge_count, 0);
        assert!(record.histogram_std.is_finite());
    }

    #[test]
    fn grayscale_color_entropy_is_the_grayscale_entropy() {
        let samples = noise(64 * 48, 7);
        let record = analyze_gray(64, 48, &samples);
        assert_eq!(record.color_entropy, record.entropy);
        assert_eq!(record.color_entropy_normalized, record.entropy_normalized);
    }

    #[test]
    fn normalized_metrics_follow_their_ceilings() {
        let samples = noise(3 * 50 * 40, 11);
        let record = ComplexityAnalyzer::default()
            .analyze_raw(50, 40, 3, &samples, "noise.png")
            .unwrap();

        assert!((0.0..=8.0).contains(&record.entropy));
        assert!((0.0..=8.0).contains(&record.color_entropy));
        assert_eq!(record.entropy_normalized, Some(record.entropy / 8.0));
        assert_eq!(record.color_entropy_normalized, Some(record.color_entropy / 8.0));
        assert_eq!(
            record.color_variance_normalized,
            Some(record.color_variance / (255.0 * 255.0 / 4.0))
        );
        assert_eq!(record.edge_density_normalized, Some(record.edge_density));
        let bounded = [
            Metric::Entropy,
            Metric::ColorEntropy,
            Metric::EdgeDensity,
            Metric::ColorVariance,
        ];
        for metric in bounded {
            let value = record.normalized(metric).unwrap();
            assert!((0.0..=1.0).contains(&value), "{metric} = {value}");
        }
        assert_eq!(record.normalized(Metric::HistogramStd), None);
    }

    #[test]
    fn edge_density_is_count_over_area() {
        let (width, height) = (48u32, 36u32);
        let samples: Vec<u8> = (0..width * height)
            .map(|i| if (i % width / 6 + i / width / 6) % 2 == 0 { 20 } else { 230 })
            .collect();
        let record = analyze_gray(width, height, &samples);
        assert!(record.edge_count > 0);
        assert_eq!(record.edge_density, record.edge_count as f64 / (width * height) as f64);
    }

    #[test]
    fn analysis_is_idempotent() {
        let samples = noise(3 * 33 * 21, 3);
        let analyzer = ComplexityAnalyzer::default();
        let first = analyzer.analyze_raw(33, 21, 3, &samples, "a.jpg").unwrap();
        let second = analyzer.analyze_raw(33, 21, 3, &samples, "a.jpg").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn image_size_is_width_then_height() {
        let record = analyze_gray(7, 3, &[9u8; 21]);
        assert_eq!(record.image_size, (7, 3));
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["image_size"], serde_json::json!([7, 3]));
    }

    #[test]
    fn shape_errors_carry_the_filename() {
        let analyzer = ComplexityAnalyzer::default();
        let err = analyzer.analyze_raw(2, 2, 4, &[0u8; 16], "alpha.png").unwrap_err();
        match err {
            Error::InvalidImageShape { filename, source } => {
                assert_eq!(filename, "alpha.png");
                assert_eq!(source, ShapeError::UnsupportedChannels(4));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let err = analyzer.analyze_raw(0, 0, 1, &[], "empty.png").unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidImageShape { source: ShapeError::Empty { .. }, .. }
        ));
    }

    #[test]
    fn unbounded_metrics_are_omitted_from_json() {
        let config = AnalyzerConfig {
            normalization: NormalizationSpec::EIGHT_BIT
                .with(Metric::EdgeDensity, Ceiling::Unbounded),
            ..AnalyzerConfig::default()
        };
        let record = ComplexityAnalyzer::new(config)
            .analyze_raw(2, 2, 1, &[0, 0, 255, 255], "x.png")
            .unwrap();
        assert_eq!(record.edge_density_normalized, None);

        let json = serde_json::to_value(&record).unwrap();
        let fields: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
        assert!(!fields.contains(&"edge_density_normalized"));
        assert!(!fields.contains(&"histogram_std_normalized"));
        assert!(fields.contains(&"histogram_std"));
    }

    #[test]
    fn clipped_values_are_clamped_and_reported() {
        let config = AnalyzerConfig {
            normalization: NormalizationSpec::EIGHT_BIT
                .with(Metric::Entropy, Ceiling::TheoreticalMax(0.5)),
            ..AnalyzerConfig::default()
        };
        let analyzer = ComplexityAnalyzer::new(config.clone());

        let log = CapturedLog::default();
        let writer = log.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        let record = tracing::subscriber::with_default(subscriber, || {
            analyzer.analyze_raw(2, 2, 1, &[0, 0, 255, 255], "x.png").unwrap()
        });

        assert_eq!(record.entropy, 1.0);
        assert_eq!(record.entropy_normalized, Some(1.0));
        let normalized = config.normalization.normalize(Metric::Entropy, record.entropy);
        assert_eq!(normalized.map(|n| n.clipped), Some(true));

        let output = log.text();
        assert!(output.contains("WARN"), "{output}");
        assert!(output.contains("clamped to 1.0"), "{output}");
        assert!(output.contains("metric=\"entropy\""), "{output}");
        assert!(output.contains("filename=\"x.png\""), "{output}");
        // Only the overflowing metric is reported.
        assert!(!output.contains("color_entropy"), "{output}");
    }

    #[test]
    fn free_function_uses_default_config() {
        let samples = vec![0u8, 0, 255, 255];
        let view = RasterView::new(2, 2, 1, &samples).unwrap();
        let record = analyze(&view, "free.png").unwrap();
        let explicit = ComplexityAnalyzer::new(AnalyzerConfig::default())
            .analyze_raw(2, 2, 1, &samples, "free.png")
            .unwrap();
        assert_eq!(record, explicit);
    }
}
