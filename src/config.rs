//! Configuration for the OCR pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for building an [`crate::pipeline::OcrPipeline`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory holding the neural engine's per-language model files
    /// (`rec_<lang>.onnx`) and character dictionaries (`keys_<lang>.txt`).
    pub model_dir: PathBuf,

    /// Number of concurrent recognition calls allowed on the blocking
    /// worker pool. Recognition is CPU-bound; keep this small.
    ///
    /// A recognition call that outlives its tier timeout keeps its worker
    /// slot until the underlying call returns, so a hung engine can pin
    /// one slot for that long. Size this with that failure mode in mind.
    pub worker_threads: usize,

    /// Time budget for a single engine tier, in seconds. A tier that
    /// exceeds it is treated as failed and the orchestrator advances to
    /// the next tier; the timed-out call itself is not cancelled.
    pub tier_timeout_secs: u64,

    /// Command used to invoke the classical engine's runtime dependency.
    pub classical_command: String,

    /// Block radius for adaptive binarization during preprocessing.
    ///
    /// Local-window thresholding handles the uneven lighting common in
    /// mobile-captured Malaysian documents; a global threshold does not.
    pub binarization_radius: u32,
}

impl PipelineConfig {
    /// Returns the per-tier recognition time budget as a [`Duration`].
    pub fn tier_timeout(&self) -> Duration {
        Duration::from_secs(self.tier_timeout_secs)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            worker_threads: 2,
            tier_timeout_secs: 20,
            classical_command: "tesseract".to_string(),
            binarization_radius: 15,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = PipelineConfig::default();
        assert_eq!(config.worker_threads, 2);
        assert_eq!(config.tier_timeout(), Duration::from_secs(20));
        assert_eq!(config.classical_command, "tesseract");
    }

    #[test]
    fn deserializes_with_partial_fields() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"worker_threads": 4, "model_dir": "/opt/models"}"#).unwrap();
        assert_eq!(config.worker_threads, 4);
        assert_eq!(config.model_dir, PathBuf::from("/opt/models"));
        // Unspecified fields fall back to defaults.
        assert_eq!(config.tier_timeout_secs, 20);
    }
}
