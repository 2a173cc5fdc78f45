pub mod color_entropy;
pub mod edges;
pub mod grayscale;
pub mod histogram;
pub mod normalization;
pub mod raster;
pub mod tonal;
pub mod utils;
