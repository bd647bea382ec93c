//! # mata-ocr
//!
//! A multi-engine OCR pipeline tuned for Malaysian-market documents
//! (MyKad national IDs, passports, driving licenses, business
//! registrations) across five languages: Bahasa Malaysia, English,
//! Chinese, Tamil, and Arabic/Jawi.
//!
//! ## Architecture
//!
//! One request flows through six stages:
//!
//! 1. **Decode** - raw bytes to pixels, rejecting corrupt payloads.
//! 2. **Preprocess** - grayscale, denoise, local contrast enhancement,
//!    adaptive binarization (never fails; degrades to plain grayscale).
//! 3. **Tiered recognition** - an explicit fallback state machine over
//!    three engine tiers: neural (ONNX), classical (Tesseract), and a
//!    synthetic mock that never fails, guaranteeing termination.
//! 4. **Aggregation** - drop detections below the caller's confidence
//!    threshold, average the rest.
//! 5. **Domain post-processing** - document-type classification and
//!    Malaysian-specific lexical correction.
//! 6. **Statistics** - fold the run into process-wide counters.
//!
//! ## Modules
//!
//! * [`core`] - Shared types, error handling, and running statistics
//! * [`config`] - Pipeline configuration
//! * [`image`] - Image decoding and preprocessing
//! * [`engine`] - Recognition engine adapters
//! * [`postprocess`] - Malaysian document post-processing
//! * [`pipeline`] - The fallback orchestrator and pipeline entry point
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use mata_ocr::prelude::*;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let pipeline = OcrPipeline::new(&PipelineConfig::default());
//! let bytes = std::fs::read("mykad.jpg").unwrap();
//!
//! let outcome = pipeline.process(&bytes, Language::Malay, 0.7).await;
//! if outcome.success {
//!     println!("[{}] {}", outcome.document_type, outcome.text);
//! }
//!
//! let stats = pipeline.stats();
//! println!("processed {} images", stats.total_processed);
//! # }
//! ```

pub mod config;
pub mod core;
pub mod engine;
pub mod image;
pub mod pipeline;
pub mod postprocess;

/// Commonly used types, re-exported for convenience.
pub mod prelude {
    pub use crate::config::PipelineConfig;
    pub use crate::core::{
        DocumentType, EngineDescriptor, Language, OcrError, OcrOutcome, OcrResult, PipelineStats,
        TextDetection,
    };
    pub use crate::engine::RecognitionEngine;
    pub use crate::pipeline::OcrPipeline;
}
