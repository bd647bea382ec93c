//! Running statistics for the OCR pipeline.
//!
//! Statistics are process-wide, in-memory only, and reset on restart. All
//! mutation goes through a single serialized method on [`StatsRecorder`] so
//! concurrent request completions cannot lose updates.

use crate::core::types::Language;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Mutex;

/// Snapshot of the pipeline's running statistics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineStats {
    /// Total requests processed, successes and failures alike.
    pub total_processed: u64,
    /// Streaming mean of per-request processing time in seconds.
    pub avg_processing_time: f64,
    /// Streaming mean of per-request confidence over successful requests.
    ///
    /// Failed requests do not contribute a confidence sample.
    pub avg_confidence: f64,
    /// Requests per language.
    pub language_distribution: HashMap<Language, u64>,
    /// Number of requests that ended with `success == false`.
    pub error_count: u64,
    /// Requests per terminal engine identifier (including `"none"` for
    /// decode failures and `"mock"` for degraded mode).
    pub engine_usage: HashMap<String, u64>,
}

/// Thread-safe recorder guarding the pipeline statistics.
pub struct StatsRecorder {
    stats: Mutex<PipelineStats>,
}

impl StatsRecorder {
    /// Creates a recorder with empty statistics.
    pub fn new() -> Self {
        Self {
            stats: Mutex::new(PipelineStats::default()),
        }
    }

    /// Returns a copy of the current statistics.
    pub fn snapshot(&self) -> PipelineStats {
        self.stats.lock().expect("stats lock poisoned").clone()
    }

    /// Folds one completed request into the running statistics.
    ///
    /// This is the single mutation point for the statistics aggregate and
    /// is called exactly once per request, success or failure.
    ///
    /// # Arguments
    ///
    /// * `language` - Language the request was processed with.
    /// * `engine_used` - Terminal engine identifier for the request.
    /// * `elapsed_secs` - Wall-clock processing time in seconds.
    /// * `confidence` - Overall confidence for a successful request, or
    ///   `None` for a failure (failures increment `error_count` and do not
    ///   shift `avg_confidence`).
    pub fn record(
        &self,
        language: Language,
        engine_used: &str,
        elapsed_secs: f64,
        confidence: Option<f64>,
    ) {
        let mut stats = self.stats.lock().expect("stats lock poisoned");

        stats.total_processed += 1;
        let n = stats.total_processed as f64;
        stats.avg_processing_time = (stats.avg_processing_time * (n - 1.0) + elapsed_secs) / n;

        match confidence {
            Some(sample) => {
                // Confidence averages over successful samples only.
                let successes = (stats.total_processed - stats.error_count) as f64;
                stats.avg_confidence =
                    (stats.avg_confidence * (successes - 1.0) + sample) / successes;
            }
            None => stats.error_count += 1,
        }

        *stats.language_distribution.entry(language).or_insert(0) += 1;
        *stats
            .engine_usage
            .entry(engine_used.to_string())
            .or_insert(0) += 1;
    }

    /// Resets all statistics to their initial empty state.
    pub fn reset(&self) {
        let mut stats = self.stats.lock().expect("stats lock poisoned");
        *stats = PipelineStats::default();
    }
}

impl Default for StatsRecorder {
    fn default() -> Self {
        Self::new()
    }
}
