//! Synthetic mock engine (tertiary tier).
//!
//! The last resort when both real engines are unavailable or erroring.
//! It never fails and always returns at least one detection, which
//! guarantees the fallback state machine terminates with a result. The
//! placeholder text is clearly marked so callers can detect degraded mode
//! through `engine_used == "mock"` and the text itself.

use crate::core::{EngineDescriptor, Language, OcrResult, Region, TextDetection};
use crate::engine::RecognitionEngine;
use image::GrayImage;
use tracing::warn;

/// Engine identifier recorded in results and statistics.
pub const MOCK_ENGINE_ID: &str = "mock";

/// The always-succeeding placeholder recognizer.
#[derive(Debug, Default)]
pub struct MockEngine;

impl MockEngine {
    /// Creates the mock engine.
    pub fn new() -> Self {
        Self
    }
}

impl RecognitionEngine for MockEngine {
    fn descriptor(&self) -> EngineDescriptor {
        EngineDescriptor {
            id: MOCK_ENGINE_ID,
            available: true,
            priority: 2,
        }
    }

    fn supports(&self, _language: Language) -> bool {
        true
    }

    fn recognize(
        &self,
        image: &GrayImage,
        language: Language,
    ) -> OcrResult<Vec<TextDetection>> {
        warn!(language = %language, "serving placeholder result, no real engine produced output");
        let text = format!(
            "OCR UNAVAILABLE - PLACEHOLDER RESULT ({} x {}, language {})",
            image.width(),
            image.height(),
            language.code()
        );
        // Confidence 1.0 so the placeholder survives any valid threshold;
        // degraded mode is signalled through the engine identifier.
        Ok(vec![TextDetection::new(
            text,
            Region::full_image(image.width(), image.height()),
            1.0,
        )])
    }
}
