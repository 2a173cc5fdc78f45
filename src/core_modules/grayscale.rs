// THEORY:
// The `grayscale` module is the Grayscale Projector. Several metrics (entropy, tonal
// variance, edges) only care about brightness, so the engine collapses the color
// image into a single luminance channel exactly once per analysis and shares it.
//
// Key architectural principles:
// 1.  **Rec. 601 luma**: The same weighted sum the old `Pixel::luminance` heuristic
//     used (0.299 R + 0.587 G + 0.114 B). It tracks perceived brightness and matches
//     the conversion most imaging toolkits apply to 8-bit RGB.
// 2.  **Fresh allocation**: The projection is a new `GrayImage`; the caller's raster
//     is only read. A grayscale input is copied unchanged.
// 3.  **Deterministic rounding**: Luma is rounded to the nearest integer and clamped,
//     so the same input always yields bit-identical output.

use crate::core_modules::raster::{RasterView, GRAYSCALE_CHANNELS, RGB_CHANNELS};
use crate::error::ShapeError;
use image::GrayImage;

pub type Luminance = f64;

const RED_WEIGHT: Luminance = 0.299;
const GREEN_WEIGHT: Luminance = 0.587;
const BLUE_WEIGHT: Luminance = 0.114;

/// Luminance estimate (Rec. 601 luma) for one RGB sample triple.
#[inline]
pub fn luminance(red: u8, green: u8, blue: u8) -> Luminance {
    RED_WEIGHT * red as Luminance
        + GREEN_WEIGHT * green as Luminance
        + BLUE_WEIGHT * blue as Luminance
}

#[inline]
fn luma_byte(red: u8, green: u8, blue: u8) -> u8 {
    luminance(red, green, blue).round().clamp(0.0, 255.0) as u8
}

/// Projects a raster onto a single luminance channel.
pub fn project(image: &RasterView<'_>) -> Result<GrayImage, ShapeError> {
    let samples = image.samples();
    let luma: Vec<u8> = match image.channels() {
        GRAYSCALE_CHANNELS => samples.to_vec(),
        RGB_CHANNELS => samples
            .chunks_exact(RGB_CHANNELS as usize)
            .map(|rgb| luma_byte(rgb[0], rgb[1], rgb[2]))
            .collect(),
        other => return Err(ShapeError::UnsupportedChannels(other)),
    };

    let expected = image.pixel_count();
    let actual = luma.len();
    GrayImage::from_raw(image.width(), image.height(), luma)
        .ok_or(ShapeError::BufferLength { expected, actual })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grayscale_input_is_copied_unchanged() {
        let samples = vec![0u8, 17, 128, 255];
        let view = RasterView::new(2, 2, 1, &samples).unwrap();
        let gray = project(&view).unwrap();
        assert_eq!(gray.as_raw(), &samples);
        assert_eq!(gray.dimensions(), (2, 2));
    }

    #[test]
    fn rgb_uses_rec601_weights() {
        let samples = vec![255u8, 0, 0, 0, 255, 0, 0, 0, 255, 255, 255, 255];
        let view = RasterView::new(4, 1, 3, &samples).unwrap();
        let gray = project(&view).unwrap();
        // 0.299*255 = 76.245, 0.587*255 = 149.685, 0.114*255 = 29.07
        assert_eq!(gray.as_raw(), &vec![76u8, 150, 29, 255]);
    }

    #[test]
    fn neutral_grey_stays_neutral() {
        let samples = vec![100u8; 3 * 6];
        let view = RasterView::new(3, 2, 3, &samples).unwrap();
        let gray = project(&view).unwrap();
        assert!(gray.pixels().all(|p| p.0[0] == 100));
    }

    #[test]
    fn projection_keeps_dimensions() {
        let samples = vec![10u8; 3 * 5 * 7];
        let view = RasterView::new(5, 7, 3, &samples).unwrap();
        let gray = project(&view).unwrap();
        assert_eq!(gray.width(), 5);
        assert_eq!(gray.height(), 7);
    }
}
