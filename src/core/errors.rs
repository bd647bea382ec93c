//! Error types for the OCR pipeline.
//!
//! This module defines the error taxonomy for the pipeline: decode failures,
//! engine failures (recoverable through the fallback orchestrator), and
//! model initialization failures. It also provides helper constructors for
//! creating errors with appropriate context and source chaining.

use crate::core::types::Language;
use thiserror::Error;

/// Convenient result alias for OCR operations.
pub type OcrResult<T> = Result<T, OcrError>;

/// Enum representing the errors that can occur in the OCR pipeline.
///
/// Decode errors are unrecoverable for a request. Engine errors are
/// recoverable: the fallback orchestrator absorbs them by advancing to the
/// next tier. Preprocessing never surfaces an error at all (it degrades to
/// the unmodified grayscale image).
#[derive(Error, Debug)]
pub enum OcrError {
    /// The image payload could not be decoded into pixels.
    #[error("image decode")]
    Decode(#[source] image::ImageError),

    /// The image payload was empty.
    #[error("empty image payload")]
    EmptyImage,

    /// A recognition engine failed while processing a request.
    #[error("engine '{engine}': {context}")]
    Engine {
        /// Identifier of the engine that failed.
        engine: &'static str,
        /// Additional context about the failure.
        context: String,
        /// The underlying error, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The recognition model for a language is not available.
    ///
    /// Once a language's model fails to initialize it is never retried
    /// within the same process lifetime.
    #[error("no recognition model available for language '{language}'")]
    ModelUnavailable {
        /// The language whose model is unavailable.
        language: Language,
    },

    /// A recognition call exceeded the per-tier time budget.
    #[error("engine '{engine}' timed out after {timeout_secs}s")]
    Timeout {
        /// Identifier of the engine that timed out.
        engine: String,
        /// The configured time budget in seconds.
        timeout_secs: u64,
    },

    /// Error from the ONNX Runtime session.
    #[error(transparent)]
    Session(#[from] ort::Error),

    /// Error from tensor operations.
    #[error("tensor operation")]
    Tensor(#[from] ndarray::ShapeError),

    /// IO error.
    #[error("io")]
    Io(#[from] std::io::Error),
}

impl OcrError {
    /// Creates an engine error with a context message and no source.
    ///
    /// # Arguments
    ///
    /// * `engine` - Identifier of the failing engine.
    /// * `context` - Description of what went wrong.
    pub fn engine(engine: &'static str, context: impl Into<String>) -> Self {
        Self::Engine {
            engine,
            context: context.into(),
            source: None,
        }
    }

    /// Creates an engine error wrapping an underlying cause.
    ///
    /// # Arguments
    ///
    /// * `engine` - Identifier of the failing engine.
    /// * `context` - Description of what went wrong.
    /// * `source` - The underlying error.
    pub fn engine_with_source(
        engine: &'static str,
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Engine {
            engine,
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Returns true if this error is recoverable by the fallback
    /// orchestrator (i.e. the next tier should be tried).
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Decode(_) | Self::EmptyImage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_errors_are_recoverable() {
        let err = OcrError::engine("tesseract", "binary not found");
        assert!(err.is_recoverable());

        let err = OcrError::ModelUnavailable {
            language: Language::Tamil,
        };
        assert!(err.is_recoverable());
    }

    #[test]
    fn decode_errors_are_fatal() {
        assert!(!OcrError::EmptyImage.is_recoverable());
    }

    #[test]
    fn engine_error_display_includes_context() {
        let err = OcrError::engine("neural", "session load failed");
        assert_eq!(err.to_string(), "engine 'neural': session load failed");
    }
}
