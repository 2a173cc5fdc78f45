// THEORY:
// This file is the main entry point for the `visual_complexity` library crate.
// It defines the public API exposed to batch drivers and downstream consumers.
//
// The primary export is `analyze` / `ComplexityAnalyzer` together with the
// `MetricsRecord` it produces. The numeric estimators live in `core_modules` and
// can be used on their own; `parallel_pipeline` is the batch driver that feeds
// image files through the engine and writes one JSON record per image.

pub mod core_modules;
pub mod error;
pub mod parallel_pipeline;
pub mod pipeline;

pub use core_modules::edges::{EdgeThresholds, ThresholdPolicy};
pub use core_modules::normalization::{Ceiling, Metric, NormalizationSpec};
pub use core_modules::raster::{OwnedRaster, RasterView};
pub use error::{Error, Result, ShapeError};
pub use pipeline::{analyze, AnalyzerConfig, ComplexityAnalyzer, MetricsRecord};
