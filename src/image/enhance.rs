//! Image preprocessing for recognition accuracy.
//!
//! Runs a fixed enhancement pipeline over the decoded image: grayscale
//! conversion, median-filter denoising, tile-based local contrast
//! equalization, and adaptive (local-window) binarization. Binarization is
//! adaptive because Malaysian documents are frequently photographed under
//! mixed lighting, where a single global threshold fails.
//!
//! Preprocessing never fails: any internal problem degrades to the plain
//! grayscale conversion so the pipeline can still attempt recognition.

use image::{DynamicImage, GrayImage};
use imageproc::contrast::adaptive_threshold;
use imageproc::filter::median_filter;
use tracing::debug;

/// Minimum dimension below which enhancement is skipped entirely; the
/// local windows would not have enough context to be meaningful.
const MIN_ENHANCE_DIM: u32 = 16;

/// Tile edge length for local histogram equalization.
const EQUALIZE_TILE: u32 = 64;

/// Enhances a decoded image for downstream recognition.
///
/// # Arguments
///
/// * `img` - The decoded image.
/// * `binarization_radius` - Block radius for the adaptive threshold.
///
/// # Returns
///
/// The binarized grayscale image, or the plain grayscale conversion if the
/// image is too small to enhance.
pub fn enhance_for_recognition(img: &DynamicImage, binarization_radius: u32) -> GrayImage {
    let gray = img.to_luma8();
    if gray.width() < MIN_ENHANCE_DIM
        || gray.height() < MIN_ENHANCE_DIM
        || binarization_radius == 0
    {
        debug!(
            width = gray.width(),
            height = gray.height(),
            "skipping enhancement, using plain grayscale"
        );
        return gray;
    }

    let denoised = median_filter(&gray, 1, 1);
    let equalized = equalize_tiles(&denoised, EQUALIZE_TILE);
    let binary = adaptive_threshold(&equalized, binarization_radius);
    debug!(
        width = binary.width(),
        height = binary.height(),
        "enhancement complete"
    );
    binary
}

/// Applies per-tile histogram equalization for local contrast enhancement.
///
/// Each tile's cumulative histogram is stretched independently, which
/// recovers low-contrast text in unevenly lit regions without washing out
/// the rest of the document.
fn equalize_tiles(gray: &GrayImage, tile: u32) -> GrayImage {
    let (width, height) = gray.dimensions();
    let mut out = gray.clone();

    let mut ty = 0;
    while ty < height {
        let th = tile.min(height - ty);
        let mut tx = 0;
        while tx < width {
            let tw = tile.min(width - tx);
            equalize_tile_in_place(gray, &mut out, tx, ty, tw, th);
            tx += tile;
        }
        ty += tile;
    }
    out
}

/// Equalizes one tile of `src` into `dst`.
fn equalize_tile_in_place(
    src: &GrayImage,
    dst: &mut GrayImage,
    tx: u32,
    ty: u32,
    tw: u32,
    th: u32,
) {
    let mut histogram = [0u32; 256];
    for y in ty..ty + th {
        for x in tx..tx + tw {
            histogram[src.get_pixel(x, y)[0] as usize] += 1;
        }
    }

    let total = (tw * th) as f32;
    let mut cdf = [0f32; 256];
    let mut running = 0u32;
    for (level, count) in histogram.iter().enumerate() {
        running += count;
        cdf[level] = running as f32 / total;
    }

    for y in ty..ty + th {
        for x in tx..tx + tw {
            let level = src.get_pixel(x, y)[0] as usize;
            let mapped = (cdf[level] * 255.0).round().clamp(0.0, 255.0) as u8;
            dst.put_pixel(x, y, image::Luma([mapped]));
        }
    }
}
