//! Confidence aggregation over raw engine detections.
//!
//! The policy is drop-below-threshold: detections whose confidence falls
//! strictly below the caller's threshold are removed from both the
//! concatenated text and the returned detection list. Zero survivors is a
//! valid outcome (empty text, confidence 0), not a failure.

use crate::core::TextDetection;

/// Result of threshold filtering and confidence aggregation.
#[derive(Debug)]
pub struct Aggregated {
    /// Detections that passed the threshold, in engine order.
    pub detections: Vec<TextDetection>,
    /// Arithmetic mean of the surviving confidences, 0 if none survived.
    pub confidence: f32,
    /// Raw concatenated text of the surviving detections, one line per
    /// detection, before domain correction.
    pub raw_text: String,
}

/// Filters detections by the caller's confidence threshold and merges the
/// per-line confidences into a single score.
pub fn aggregate(detections: Vec<TextDetection>, confidence_threshold: f32) -> Aggregated {
    let survivors: Vec<TextDetection> = detections
        .into_iter()
        .filter(|d| d.confidence >= confidence_threshold)
        .collect();

    let confidence = if survivors.is_empty() {
        0.0
    } else {
        survivors.iter().map(|d| d.confidence).sum::<f32>() / survivors.len() as f32
    };

    let raw_text = survivors
        .iter()
        .map(|d| d.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    Aggregated {
        detections: survivors,
        confidence,
        raw_text,
    }
}
