//! Captcha image preprocessing.
//!
//! The portal's captchas are low-contrast glyphs over speckle noise.
//! The pipeline is grayscale -> autocontrast -> light gaussian blur ->
//! hard binarization, which leaves tesseract clean black-on-white
//! glyphs to work with.

use image::{GrayImage, ImageFormat};
use thiserror::Error;

/// Histogram cutoff for autocontrast, in percent of pixels clipped at
/// each end before stretching.
const AUTOCONTRAST_CUTOFF_PERCENT: u32 = 2;

/// Blur radius applied before binarization.
const BLUR_SIGMA: f32 = 0.5;

/// Luminance threshold separating glyph from background.
const BINARIZE_THRESHOLD: u8 = 140;

#[derive(Debug, Error)]
pub enum CaptchaImageError {
    #[error("captcha image decode failed: {0}")]
    Decode(#[from] image::ImageError),
}

/// Run the full preprocessing pipeline over raw downloaded bytes.
pub fn preprocess(raw: &[u8]) -> Result<GrayImage, CaptchaImageError> {
    let gray = image::load_from_memory(raw)?.to_luma8();
    let stretched = autocontrast(&gray, AUTOCONTRAST_CUTOFF_PERCENT);
    let blurred = image::imageops::blur(&stretched, BLUR_SIGMA);
    Ok(binarize(&blurred, BINARIZE_THRESHOLD))
}

/// Encode a preprocessed image as PNG bytes for the debug dump.
pub fn encode_png(image: &GrayImage) -> Result<Vec<u8>, CaptchaImageError> {
    let mut out = std::io::Cursor::new(Vec::new());
    image.write_to(&mut out, ImageFormat::Png)?;
    Ok(out.into_inner())
}

/// Remap luminance so the darkest and brightest `cutoff` percent of
/// pixels clip to 0 and 255 and the rest stretch linearly between.
fn autocontrast(image: &GrayImage, cutoff: u32) -> GrayImage {
    let mut histogram = [0u32; 256];
    for pixel in image.pixels() {
        histogram[pixel.0[0] as usize] += 1;
    }

    let total: u32 = image.width() * image.height();
    let clip = total * cutoff / 100;

    let mut lo = 0usize;
    let mut seen = 0u32;
    while lo < 255 {
        seen += histogram[lo];
        if seen > clip {
            break;
        }
        lo += 1;
    }

    let mut hi = 255usize;
    seen = 0;
    while hi > 0 {
        seen += histogram[hi];
        if seen > clip {
            break;
        }
        hi -= 1;
    }

    if hi <= lo {
        return image.clone();
    }

    let scale = 255.0 / (hi - lo) as f32;
    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        let v = pixel.0[0] as f32;
        pixel.0[0] = ((v - lo as f32) * scale).clamp(0.0, 255.0) as u8;
    }
    out
}

/// Collapse to a two-level image: above the threshold is background
/// white, everything else glyph black.
fn binarize(image: &GrayImage, threshold: u8) -> GrayImage {
    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        pixel.0[0] = if pixel.0[0] > threshold { 255 } else { 0 };
    }
    out
}
