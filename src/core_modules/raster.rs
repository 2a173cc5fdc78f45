// THEORY:
// The `raster` module holds the most fundamental unit of the engine: a borrowed,
// read-only view of one decoded image. Like the old `Pixel`, it is a "dumb" data
// container. It knows its own shape and how to hand out its samples, nothing more.
//
// Key architectural principles:
// 1.  **Validated on construction**: A `RasterView` can only be built from a buffer
//     whose length matches `width * height * channels`, with a non-zero area and a
//     channel count of 1 (grayscale) or 3 (RGB). Every later stage can therefore
//     assume a well-formed, non-empty image and never has to guard a division.
// 2.  **Caller owns the pixels**: The view borrows the caller's buffer for the length
//     of one analysis. Nothing in the engine writes through it; derived arrays
//     (grayscale, edge map) are fresh allocations.
// 3.  **Interleaved layout**: Samples are row-major and interleaved (`RGBRGB...`),
//     which is exactly what the `image` crate hands back from `as_raw()`.

use crate::error::ShapeError;

pub const GRAYSCALE_CHANNELS: u8 = 1;
pub const RGB_CHANNELS: u8 = 3;

/// A borrowed, validated 8-bit raster.
#[derive(Debug, Clone, Copy)]
pub struct RasterView<'a> {
    width: u32,
    height: u32,
    channels: u8,
    samples: &'a [u8],
}

impl<'a> RasterView<'a> {
    pub fn new(
        width: u32,
        height: u32,
        channels: u8,
        samples: &'a [u8],
    ) -> Result<Self, ShapeError> {
        if width == 0 || height == 0 {
            return Err(ShapeError::Empty { width, height });
        }
        if channels != GRAYSCALE_CHANNELS && channels != RGB_CHANNELS {
            return Err(ShapeError::UnsupportedChannels(channels));
        }
        let expected = width as usize * height as usize * channels as usize;
        if samples.len() != expected {
            return Err(ShapeError::BufferLength {
                expected,
                actual: samples.len(),
            });
        }
        Ok(Self {
            width,
            height,
            channels,
            samples,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn samples(&self) -> &'a [u8] {
        self.samples
    }

    /// Number of pixels (not samples). Always positive.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn is_grayscale(&self) -> bool {
        self.channels == GRAYSCALE_CHANNELS
    }

    /// Iterates over the samples of a single channel, de-interleaved.
    pub fn channel(&self, index: usize) -> impl Iterator<Item = u8> + 'a {
        let stride = self.channels as usize;
        self.samples.iter().skip(index).step_by(stride).copied()
    }
}

/// An owned raster, as produced by the image loader. Lends a `RasterView`.
#[derive(Debug, Clone, PartialEq)]
pub struct OwnedRaster {
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub samples: Vec<u8>,
}

impl OwnedRaster {
    pub fn view(&self) -> Result<RasterView<'_>, ShapeError> {
        RasterView::new(self.width, self.height, self.channels, &self.samples)
    }
}
