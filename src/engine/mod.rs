//! Recognition engine adapters.
//!
//! Each OCR backend is wrapped in an adapter implementing
//! [`RecognitionEngine`], the single seam the fallback orchestrator works
//! against. Three tiers exist: the neural multilingual engine (primary),
//! the classical Tesseract adapter (secondary), and the synthetic mock
//! engine (tertiary), which never fails and guarantees termination.

pub mod classical;
pub mod mock;
pub mod neural;

use crate::core::{EngineDescriptor, Language, OcrResult, TextDetection};
use image::GrayImage;

pub use classical::ClassicalEngine;
pub use mock::MockEngine;
pub use neural::NeuralEngine;

/// Uniform interface over heterogeneous OCR backends.
///
/// Implementations must be `Send + Sync`: engine instances are shared
/// read-only across concurrent requests, and `recognize` is dispatched
/// onto a blocking worker pool.
pub trait RecognitionEngine: Send + Sync {
    /// Returns the engine's identity, current availability, and fallback
    /// priority.
    fn descriptor(&self) -> EngineDescriptor;

    /// Returns whether the engine can attempt recognition for the given
    /// language right now.
    ///
    /// This must be cheap and must not trigger model initialization; the
    /// orchestrator uses it to skip unavailable tiers without paying for
    /// a dispatch.
    fn supports(&self, language: Language) -> bool;

    /// Recognizes text in a preprocessed image.
    ///
    /// Returns line-level detections with bounding regions and per-line
    /// confidences in `[0, 1]`. An empty vector is a valid result and
    /// causes the orchestrator to advance to the next tier.
    fn recognize(&self, image: &GrayImage, language: Language)
        -> OcrResult<Vec<TextDetection>>;
}

/// A horizontal band of the image believed to contain one text line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LineBand {
    pub top: u32,
    pub bottom: u32,
    pub left: u32,
    pub right: u32,
}

/// Segments a binarized image into horizontal text-line bands using a row
/// projection profile.
///
/// Rows whose ink (dark pixel) count exceeds a small fraction of the image
/// width are considered part of a line; consecutive such rows are merged
/// into bands and each band is trimmed to its inked column extent.
pub(crate) fn segment_lines(image: &GrayImage) -> Vec<LineBand> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Vec::new();
    }

    // Ink threshold: at least 1% of the row must be dark.
    let min_ink = (width / 100).max(1);

    let row_ink: Vec<u32> = (0..height)
        .map(|y| (0..width).filter(|&x| image.get_pixel(x, y)[0] < 128).count() as u32)
        .collect();

    let mut bands = Vec::new();
    let mut start: Option<u32> = None;
    for y in 0..height {
        let inked = row_ink[y as usize] >= min_ink;
        match (inked, start) {
            (true, None) => start = Some(y),
            (false, Some(top)) => {
                if let Some(band) = trim_band(image, top, y) {
                    bands.push(band);
                }
                start = None;
            }
            _ => {}
        }
    }
    if let Some(top) = start {
        if let Some(band) = trim_band(image, top, height) {
            bands.push(band);
        }
    }
    bands
}

/// Trims a row band to its inked column extent, dropping degenerate bands.
fn trim_band(image: &GrayImage, top: u32, bottom: u32) -> Option<LineBand> {
    let (width, _) = image.dimensions();
    let mut left = width;
    let mut right = 0;
    for y in top..bottom {
        for x in 0..width {
            if image.get_pixel(x, y)[0] < 128 {
                left = left.min(x);
                right = right.max(x + 1);
            }
        }
    }
    if left >= right || bottom <= top + 1 {
        return None;
    }
    Some(LineBand {
        top,
        bottom,
        left,
        right,
    })
}
