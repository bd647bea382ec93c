//! Core types, error handling, and running statistics.

pub mod errors;
pub mod stats;
pub mod types;

pub use errors::{OcrError, OcrResult};
pub use stats::{PipelineStats, StatsRecorder};
pub use types::{
    DocumentType, EngineDescriptor, Language, OcrOutcome, Point, Region, TextDetection,
};
