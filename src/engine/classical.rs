//! Classical recognition engine (secondary tier).
//!
//! Adapter over a locally installed Tesseract binary. Availability is
//! probed once at startup; if the binary is missing the engine reports
//! itself unavailable and the orchestrator skips straight past it.
//!
//! Tesseract is driven in TSV output mode so per-word confidences are
//! recoverable. Its native confidence range is `[0, 100]`; scores are
//! scaled to `[0, 1]` and words are grouped back into line detections.

use crate::core::{EngineDescriptor, Language, OcrError, OcrResult, Region, TextDetection};
use crate::engine::RecognitionEngine;
use image::GrayImage;
use std::collections::BTreeMap;
use std::process::Command;
use tracing::{debug, info, warn};

/// Engine identifier recorded in results and statistics.
pub const CLASSICAL_ENGINE_ID: &str = "tesseract";

/// The secondary, classical recognition engine.
pub struct ClassicalEngine {
    command: String,
    available: bool,
}

impl ClassicalEngine {
    /// Creates the engine, probing the runtime dependency once.
    ///
    /// # Arguments
    ///
    /// * `command` - The Tesseract executable to invoke (usually
    ///   `"tesseract"`, overridable through configuration).
    pub fn probe(command: impl Into<String>) -> Self {
        let command = command.into();
        let available = Command::new(&command)
            .arg("--version")
            .output()
            .map(|out| out.status.success())
            .unwrap_or(false);
        if available {
            info!(command = %command, "classical engine available");
        } else {
            warn!(command = %command, "classical engine runtime dependency not found");
        }
        Self { command, available }
    }

    /// Runs Tesseract over a scratch PNG of the image and captures TSV.
    fn run_tesseract(&self, image: &GrayImage, language: Language) -> OcrResult<String> {
        let scratch = tempfile::Builder::new()
            .prefix("mata-ocr-")
            .suffix(".png")
            .tempfile()?;
        image.save(scratch.path()).map_err(|e| {
            OcrError::engine_with_source(CLASSICAL_ENGINE_ID, "failed to write scratch image", e)
        })?;

        let output = Command::new(&self.command)
            .arg(scratch.path())
            .arg("stdout")
            .args(["-l", language.tesseract_code()])
            .args(["--oem", "3", "--psm", "6"])
            .arg("tsv")
            .output()
            .map_err(|e| {
                OcrError::engine_with_source(CLASSICAL_ENGINE_ID, "failed to spawn process", e)
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::engine(
                CLASSICAL_ENGINE_ID,
                format!("exited with {}: {}", output.status, stderr.trim()),
            ));
        }
        String::from_utf8(output.stdout).map_err(|e| {
            OcrError::engine_with_source(CLASSICAL_ENGINE_ID, "non-UTF8 TSV output", e)
        })
    }
}

impl RecognitionEngine for ClassicalEngine {
    fn descriptor(&self) -> EngineDescriptor {
        EngineDescriptor {
            id: CLASSICAL_ENGINE_ID,
            available: self.available,
            priority: 1,
        }
    }

    fn supports(&self, _language: Language) -> bool {
        // Language packs are assumed installed alongside the binary; a
        // missing pack surfaces as an EngineError and advances the tier.
        self.available
    }

    fn recognize(
        &self,
        image: &GrayImage,
        language: Language,
    ) -> OcrResult<Vec<TextDetection>> {
        if !self.available {
            return Err(OcrError::engine(
                CLASSICAL_ENGINE_ID,
                "runtime dependency unavailable",
            ));
        }
        let tsv = self.run_tesseract(image, language)?;
        let detections = parse_tsv(&tsv);
        debug!(
            lines = detections.len(),
            language = %language,
            "classical recognition"
        );
        Ok(detections)
    }
}

/// One word row accumulated into its line group.
struct WordRow {
    text: String,
    confidence: f32,
    left: f32,
    top: f32,
    right: f32,
    bottom: f32,
}

/// Parses Tesseract TSV output into line-level detections.
///
/// Word rows (level 5) with positive confidence are grouped by their
/// `(block, paragraph, line)` key; each group becomes one detection whose
/// confidence is the mean word confidence scaled into `[0, 1]` and whose
/// region is the union of the word boxes.
pub(crate) fn parse_tsv(tsv: &str) -> Vec<TextDetection> {
    let mut lines: BTreeMap<(u32, u32, u32), Vec<WordRow>> = BTreeMap::new();

    for row in tsv.lines().skip(1) {
        let fields: Vec<&str> = row.split('\t').collect();
        if fields.len() < 12 || fields[0] != "5" {
            continue;
        }
        let parse_u32 = |i: usize| fields[i].parse::<u32>().ok();
        let (Some(block), Some(par), Some(line)) = (parse_u32(2), parse_u32(3), parse_u32(4))
        else {
            continue;
        };
        let (Some(left), Some(top), Some(width), Some(height)) =
            (parse_u32(6), parse_u32(7), parse_u32(8), parse_u32(9))
        else {
            continue;
        };
        let Ok(confidence) = fields[10].parse::<f32>() else {
            continue;
        };
        let text = fields[11].trim();
        if confidence <= 0.0 || text.is_empty() {
            continue;
        }

        lines.entry((block, par, line)).or_default().push(WordRow {
            text: text.to_string(),
            confidence,
            left: left as f32,
            top: top as f32,
            right: (left + width) as f32,
            bottom: (top + height) as f32,
        });
    }

    lines
        .into_values()
        .map(|words| {
            let text = words
                .iter()
                .map(|w| w.text.as_str())
                .collect::<Vec<_>>()
                .join(" ");
            let confidence =
                words.iter().map(|w| w.confidence).sum::<f32>() / words.len() as f32 / 100.0;
            let left = words.iter().map(|w| w.left).fold(f32::MAX, f32::min);
            let top = words.iter().map(|w| w.top).fold(f32::MAX, f32::min);
            let right = words.iter().map(|w| w.right).fold(0.0f32, f32::max);
            let bottom = words.iter().map(|w| w.bottom).fold(0.0f32, f32::max);
            TextDetection::new(text, Region::from_rect(left, top, right, bottom), confidence)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

    fn word(block: u32, line: u32, word: u32, bbox: (u32, u32, u32, u32), conf: f32, text: &str) -> String {
        format!(
            "5\t1\t{block}\t1\t{line}\t{word}\t{}\t{}\t{}\t{}\t{conf}\t{text}",
            bbox.0, bbox.1, bbox.2, bbox.3
        )
    }

    #[test]
    fn groups_words_into_lines() {
        let tsv = [
            HEADER.to_string(),
            word(1, 1, 1, (10, 10, 80, 20), 90.0, "KERAJAAN"),
            word(1, 1, 2, (100, 10, 90, 20), 86.0, "MALAYSIA"),
            word(1, 2, 1, (10, 40, 60, 20), 70.0, "MyKad"),
        ]
        .join("\n");

        let detections = parse_tsv(&tsv);
        assert_eq!(detections.len(), 2);
        assert_eq!(detections[0].text, "KERAJAAN MALAYSIA");
        assert!((detections[0].confidence - 0.88).abs() < 1e-4);
        // Union of the word boxes.
        assert_eq!(detections[0].region.points[0].x, 10.0);
        assert_eq!(detections[0].region.points[2].x, 190.0);
        assert_eq!(detections[1].text, "MyKad");
    }

    #[test]
    fn skips_zero_confidence_and_structural_rows() {
        let tsv = [
            HEADER.to_string(),
            "4\t1\t1\t1\t1\t0\t10\t10\t200\t20\t-1\t".to_string(),
            word(1, 1, 1, (10, 10, 80, 20), -1.0, "noise"),
            word(1, 1, 2, (10, 10, 80, 20), 95.0, "signal"),
        ]
        .join("\n");

        let detections = parse_tsv(&tsv);
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].text, "signal");
        assert!((detections[0].confidence - 0.95).abs() < 1e-6);
    }

    #[test]
    fn empty_output_yields_no_detections() {
        assert!(parse_tsv(HEADER).is_empty());
        assert!(parse_tsv("").is_empty());
    }

    #[test]
    fn missing_binary_probe_marks_unavailable() {
        let engine = ClassicalEngine::probe("definitely-not-a-real-ocr-binary");
        assert!(!engine.descriptor().available);
        assert!(!engine.supports(Language::English));
        let image = GrayImage::from_pixel(8, 8, image::Luma([255]));
        assert!(engine.recognize(&image, Language::English).is_err());
    }
}
