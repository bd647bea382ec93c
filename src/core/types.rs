//! Shared vocabulary types for the OCR pipeline.
//!
//! This module defines the languages and document types the pipeline is
//! tuned for, the detection/result types produced by recognition engines,
//! and the engine descriptor used by the fallback orchestrator.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Languages supported by the pipeline, covering the Malaysian market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// Bahasa Malaysia.
    #[serde(rename = "ms")]
    Malay,
    /// English.
    #[serde(rename = "en")]
    English,
    /// Chinese (Simplified).
    #[serde(rename = "zh")]
    Chinese,
    /// Tamil.
    #[serde(rename = "ta")]
    Tamil,
    /// Arabic / Jawi.
    #[serde(rename = "ar")]
    Arabic,
}

impl Language {
    /// All supported languages, in documentation order.
    pub const ALL: [Language; 5] = [
        Language::Malay,
        Language::English,
        Language::Chinese,
        Language::Tamil,
        Language::Arabic,
    ];

    /// Returns the two-letter language code used on the wire.
    pub fn code(&self) -> &'static str {
        match self {
            Language::Malay => "ms",
            Language::English => "en",
            Language::Chinese => "zh",
            Language::Tamil => "ta",
            Language::Arabic => "ar",
        }
    }

    /// Returns the Tesseract traineddata identifier for this language.
    pub fn tesseract_code(&self) -> &'static str {
        match self {
            Language::Malay => "msa",
            Language::English => "eng",
            Language::Chinese => "chi_sim",
            Language::Tamil => "tam",
            Language::Arabic => "ara",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ms" => Ok(Language::Malay),
            "en" => Ok(Language::English),
            "zh" => Ok(Language::Chinese),
            "ta" => Ok(Language::Tamil),
            "ar" => Ok(Language::Arabic),
            other => Err(format!("unsupported language code '{other}'")),
        }
    }
}

/// Coarse classification of a recognized document, used to select
/// correction rules and reported back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    /// Malaysian national identity card.
    #[serde(rename = "mykad")]
    MyKad,
    /// Passport.
    Passport,
    /// Driving license.
    License,
    /// Invoice, receipt or billing document.
    Invoice,
    /// SSM business registration certificate.
    BusinessRegistration,
    /// Anything that did not match a known category.
    #[default]
    General,
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DocumentType::MyKad => "mykad",
            DocumentType::Passport => "passport",
            DocumentType::License => "license",
            DocumentType::Invoice => "invoice",
            DocumentType::BusinessRegistration => "business_registration",
            DocumentType::General => "general",
        };
        f.write_str(name)
    }
}

/// A 2D point in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// X-coordinate of the point.
    pub x: f32,
    /// Y-coordinate of the point.
    pub y: f32,
}

impl Point {
    /// Creates a new point.
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A quadrilateral bounding region of a detected text line.
///
/// Points are ordered clockwise starting from the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    /// The four corners of the region.
    pub points: [Point; 4],
}

impl Region {
    /// Creates an axis-aligned region from rectangle edges.
    pub fn from_rect(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            points: [
                Point::new(left, top),
                Point::new(right, top),
                Point::new(right, bottom),
                Point::new(left, bottom),
            ],
        }
    }

    /// Creates a region covering a full image of the given dimensions.
    pub fn full_image(width: u32, height: u32) -> Self {
        Self::from_rect(0.0, 0.0, width as f32, height as f32)
    }
}

/// One recognized text line with its bounding region and confidence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextDetection {
    /// The recognized text.
    pub text: String,
    /// The bounding region of the text line.
    pub region: Region,
    /// Recognition confidence in `[0, 1]`.
    pub confidence: f32,
}

impl TextDetection {
    /// Creates a new detection, clamping the confidence into `[0, 1]`.
    pub fn new(text: impl Into<String>, region: Region, confidence: f32) -> Self {
        Self {
            text: text.into(),
            region,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

/// Identity and availability of one recognition engine tier.
#[derive(Debug, Clone, Serialize)]
pub struct EngineDescriptor {
    /// Stable engine identifier (e.g. `"neural"`, `"tesseract"`, `"mock"`).
    pub id: &'static str,
    /// Whether the engine can currently serve requests at all.
    ///
    /// Availability is only ever downgraded at runtime; it is never
    /// upgraded without re-initialization.
    pub available: bool,
    /// Fallback priority; lower values are tried first.
    pub priority: u8,
}

/// The structured result of one pipeline invocation.
///
/// Created once per request and immutable after construction. Every failure
/// mode resolves to an outcome with `success == false` rather than an error
/// escaping to the transport layer.
#[derive(Debug, Clone, Serialize)]
pub struct OcrOutcome {
    /// Whether the pipeline completed without a fatal error.
    ///
    /// Empty recognition is a valid business outcome: `success` stays
    /// `true` even when zero detections pass the confidence threshold.
    pub success: bool,
    /// The corrected, concatenated recognized text, or a human-readable
    /// failure message when `success` is `false`.
    pub text: String,
    /// Mean confidence of the detections that passed the threshold.
    pub confidence: f32,
    /// Language code the request was processed with.
    pub language_detected: String,
    /// Wall-clock processing time in seconds.
    pub processing_time: f64,
    /// Detections that passed the confidence threshold, with their
    /// original per-line text preserved for traceability.
    pub detections: Vec<TextDetection>,
    /// Classified document type.
    pub document_type: DocumentType,
    /// Identifier of the engine tier that produced the detections,
    /// `"mock"` in degraded mode, or `"none"` on decode failure.
    pub engine_used: String,
    /// Number of whitespace-separated words in the corrected text.
    pub word_count: usize,
}

impl OcrOutcome {
    /// Creates a failure outcome carrying a human-readable message.
    pub fn failure(message: impl Into<String>, language: Language, processing_time: f64) -> Self {
        Self {
            success: false,
            text: message.into(),
            confidence: 0.0,
            language_detected: language.code().to_string(),
            processing_time,
            detections: Vec::new(),
            document_type: DocumentType::General,
            engine_used: "none".to_string(),
            word_count: 0,
        }
    }
}
