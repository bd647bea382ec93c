//! The multi-engine OCR pipeline.
//!
//! [`OcrPipeline`] owns the priority-ordered engine tiers, the bounded
//! worker pool for CPU-bound recognition calls, and the process-wide
//! running statistics. One call to [`OcrPipeline::process`] runs the full
//! flow: decode, preprocess, tiered recognition with fallback, confidence
//! aggregation, domain post-processing, and a statistics update.
//!
//! `process` never returns an error to the caller: every failure mode is
//! folded into an [`OcrOutcome`] with `success == false` and a
//! human-readable message.

pub mod aggregate;
pub mod fallback;

use crate::config::PipelineConfig;
use crate::core::{
    EngineDescriptor, Language, OcrError, OcrOutcome, OcrResult, PipelineStats, StatsRecorder,
    TextDetection,
};
use crate::engine::{ClassicalEngine, MockEngine, NeuralEngine, RecognitionEngine};
use crate::image::{decode_image, enhance_for_recognition};
use crate::postprocess::{classify_document, correct_text};
use self::aggregate::{aggregate, Aggregated};
use self::fallback::FallbackTier;
use image::GrayImage;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task;
use tracing::{debug, info, warn};

/// The OCR processing pipeline.
pub struct OcrPipeline {
    /// Engine tiers in fallback priority order.
    engines: Vec<Arc<dyn RecognitionEngine>>,
    /// Process-wide running statistics.
    stats: StatsRecorder,
    /// Bounds concurrent recognition calls on the blocking worker pool.
    permits: Arc<Semaphore>,
    /// Per-tier recognition time budget.
    tier_timeout: Duration,
    /// Block radius for adaptive binarization.
    binarization_radius: u32,
}

impl OcrPipeline {
    /// Builds the pipeline with the standard engine tiers: neural
    /// (primary), classical (secondary), mock (tertiary).
    pub fn new(config: &PipelineConfig) -> Self {
        let engines: Vec<Arc<dyn RecognitionEngine>> = vec![
            Arc::new(NeuralEngine::new(config.model_dir.clone())),
            Arc::new(ClassicalEngine::probe(&config.classical_command)),
            Arc::new(MockEngine::new()),
        ];
        Self::with_engines(engines, config)
    }

    /// Builds the pipeline with an explicit engine list, in fallback
    /// priority order. This is the seam used to inject fake adapters in
    /// tests.
    pub fn with_engines(
        engines: Vec<Arc<dyn RecognitionEngine>>,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            engines,
            stats: StatsRecorder::new(),
            permits: Arc::new(Semaphore::new(config.worker_threads.max(1))),
            tier_timeout: config.tier_timeout(),
            binarization_radius: config.binarization_radius,
        }
    }

    /// Processes one image through the full pipeline.
    ///
    /// # Arguments
    ///
    /// * `image_bytes` - Raw image payload (JPEG, PNG, ...).
    /// * `language` - Language to recognize; already validated upstream.
    /// * `confidence_threshold` - Minimum per-detection confidence in
    ///   `[0.1, 1.0]`; already validated upstream.
    ///
    /// # Returns
    ///
    /// An [`OcrOutcome`]; never an error. Decode failures and total engine
    /// exhaustion yield `success == false` with a message in `text`.
    pub async fn process(
        &self,
        image_bytes: &[u8],
        language: Language,
        confidence_threshold: f32,
    ) -> OcrOutcome {
        debug_assert!(
            (0.1..=1.0).contains(&confidence_threshold),
            "confidence threshold is validated by the transport layer"
        );
        let started = Instant::now();

        let decoded = match decode_image(image_bytes) {
            Ok(img) => img,
            Err(err) => {
                let elapsed = started.elapsed().as_secs_f64();
                warn!(error = %err, "image decoding failed");
                self.stats.record(language, "none", elapsed, None);
                return OcrOutcome::failure(
                    format!("image decoding failed: {err}"),
                    language,
                    elapsed,
                );
            }
        };

        let grid = enhance_for_recognition(&decoded, self.binarization_radius);
        let recognized = self
            .recognize_with_fallback(Arc::new(grid), language)
            .await;

        let Some((raw_detections, engine_used)) = recognized else {
            // Cannot happen with the mock tier installed; reachable only
            // with injected engine sets.
            let elapsed = started.elapsed().as_secs_f64();
            self.stats.record(language, "none", elapsed, None);
            return OcrOutcome::failure(
                "all recognition engines failed or produced no detections",
                language,
                elapsed,
            );
        };

        let Aggregated {
            detections,
            confidence,
            raw_text,
        } = aggregate(raw_detections, confidence_threshold);

        let document_type = classify_document(&raw_text);
        let text = correct_text(&raw_text);
        let word_count = text.split_whitespace().count();
        let processing_time = started.elapsed().as_secs_f64();

        info!(
            engine = %engine_used,
            %document_type,
            confidence,
            processing_time,
            "request complete"
        );
        self.stats
            .record(language, &engine_used, processing_time, Some(confidence as f64));

        OcrOutcome {
            success: true,
            text,
            confidence,
            language_detected: language.code().to_string(),
            processing_time,
            detections,
            document_type,
            engine_used,
            word_count,
        }
    }

    /// Returns a snapshot of the running statistics.
    pub fn stats(&self) -> PipelineStats {
        self.stats.snapshot()
    }

    /// Resets the running statistics.
    pub fn reset_stats(&self) {
        self.stats.reset()
    }

    /// Returns the identity and availability of every engine tier, for
    /// the transport layer's health endpoint.
    pub fn health(&self) -> Vec<EngineDescriptor> {
        self.engines.iter().map(|e| e.descriptor()).collect()
    }

    /// The languages the pipeline accepts.
    pub fn supported_languages() -> &'static [Language] {
        &Language::ALL
    }

    /// Walks the fallback state machine until a tier produces at least
    /// one detection.
    ///
    /// Returns the detections and the terminal engine's identifier, or
    /// `None` if every tier was skipped or failed (impossible with the
    /// mock tier installed).
    async fn recognize_with_fallback(
        &self,
        image: Arc<GrayImage>,
        language: Language,
    ) -> Option<(Vec<TextDetection>, String)> {
        let mut tier = Some(FallbackTier::FIRST);
        while let Some(current) = tier {
            tier = current.next();

            let Some(engine) = self.engines.get(current.index()) else {
                continue;
            };
            let id = engine.descriptor().id;
            if !engine.supports(language) {
                debug!(tier = %current, engine = id, "tier unavailable, advancing");
                continue;
            }

            match self
                .dispatch(Arc::clone(engine), Arc::clone(&image), language)
                .await
            {
                Ok(detections) if !detections.is_empty() => {
                    debug!(
                        tier = %current,
                        engine = id,
                        count = detections.len(),
                        "tier terminal"
                    );
                    return Some((detections, id.to_string()));
                }
                Ok(_) => {
                    debug!(tier = %current, engine = id, "zero detections, advancing");
                }
                Err(err) => {
                    warn!(tier = %current, engine = id, error = %err, "tier failed, advancing");
                }
            }
        }
        None
    }

    /// Dispatches one CPU-bound recognition call onto the bounded blocking
    /// worker pool, with a per-tier time budget.
    ///
    /// A timed-out call is not cancelled (the blocking task runs to
    /// completion in the background); the tier is simply treated as failed
    /// and the state machine advances. The abandoned task holds its worker
    /// permit until the engine call returns, so a hung engine reduces the
    /// pool capacity by one for as long as it hangs.
    async fn dispatch(
        &self,
        engine: Arc<dyn RecognitionEngine>,
        image: Arc<GrayImage>,
        language: Language,
    ) -> OcrResult<Vec<TextDetection>> {
        let id = engine.descriptor().id;
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| OcrError::engine(id, "worker pool closed"))?;

        let handle = task::spawn_blocking(move || {
            let _permit = permit;
            engine.recognize(&image, language)
        });

        match tokio::time::timeout(self.tier_timeout, handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(OcrError::engine_with_source(
                id,
                "recognition task panicked",
                join_err,
            )),
            Err(_) => Err(OcrError::Timeout {
                engine: id.to_string(),
                timeout_secs: self.tier_timeout.as_secs(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DocumentType, Region};
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// What a stub engine should do when asked to recognize.
    enum StubBehavior {
        Detections(Vec<TextDetection>),
        Error,
        Empty,
    }

    /// Injectable fake adapter counting its recognize calls.
    struct StubEngine {
        id: &'static str,
        available: bool,
        behavior: StubBehavior,
        calls: AtomicUsize,
    }

    impl StubEngine {
        fn new(id: &'static str, available: bool, behavior: StubBehavior) -> Arc<Self> {
            Arc::new(Self {
                id,
                available,
                behavior,
                calls: AtomicUsize::new(0),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl RecognitionEngine for StubEngine {
        fn descriptor(&self) -> EngineDescriptor {
            EngineDescriptor {
                id: self.id,
                available: self.available,
                priority: 0,
            }
        }

        fn supports(&self, _language: Language) -> bool {
            self.available
        }

        fn recognize(
            &self,
            _image: &GrayImage,
            _language: Language,
        ) -> OcrResult<Vec<TextDetection>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.behavior {
                StubBehavior::Detections(detections) => Ok(detections.clone()),
                StubBehavior::Error => Err(OcrError::engine(self.id, "stubbed failure")),
                StubBehavior::Empty => Ok(Vec::new()),
            }
        }
    }

    fn detection(text: &str, confidence: f32) -> TextDetection {
        TextDetection::new(text, Region::from_rect(0.0, 0.0, 100.0, 20.0), confidence)
    }

    fn png_bytes() -> Vec<u8> {
        let img = RgbImage::from_fn(64, 64, |x, y| {
            if y % 16 < 4 && x > 8 && x < 56 {
                Rgb([20, 20, 20])
            } else {
                Rgb([245, 245, 245])
            }
        });
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn pipeline_with(engines: Vec<Arc<dyn RecognitionEngine>>) -> OcrPipeline {
        // Makes pipeline tracing visible under `cargo test -- --nocapture`.
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        OcrPipeline::with_engines(engines, &PipelineConfig::default())
    }

    #[tokio::test]
    async fn secondary_terminal_skips_tertiary() {
        let primary = StubEngine::new("neural", false, StubBehavior::Empty);
        let secondary = StubEngine::new(
            "tesseract",
            true,
            StubBehavior::Detections(vec![detection("KERAJAAN MALAYSIA", 0.91)]),
        );
        let tertiary = StubEngine::new("mock", true, StubBehavior::Empty);
        let pipeline = pipeline_with(vec![
            primary.clone(),
            secondary.clone(),
            tertiary.clone(),
        ]);

        let outcome = pipeline.process(&png_bytes(), Language::English, 0.7).await;

        assert!(outcome.success);
        assert_eq!(outcome.engine_used, "tesseract");
        assert_eq!(primary.call_count(), 0, "unavailable tier must not be invoked");
        assert_eq!(tertiary.call_count(), 0, "terminal tier short-circuits");
    }

    #[tokio::test]
    async fn erroring_primary_falls_back_to_secondary() {
        let primary = StubEngine::new("neural", true, StubBehavior::Error);
        let secondary = StubEngine::new(
            "tesseract",
            true,
            StubBehavior::Detections(vec![detection("NO. PASPORT A1234567", 0.91)]),
        );
        let pipeline = pipeline_with(vec![
            primary.clone(),
            secondary.clone(),
            StubEngine::new("mock", true, StubBehavior::Empty),
        ]);

        let outcome = pipeline.process(&png_bytes(), Language::Tamil, 0.7).await;

        assert!(outcome.success);
        assert_eq!(outcome.engine_used, "tesseract");
        assert_eq!(outcome.detections.len(), 1);
        assert!((outcome.detections[0].confidence - 0.91).abs() < 1e-6);
        assert_eq!(primary.call_count(), 1);
    }

    #[tokio::test]
    async fn degrades_to_mock_when_real_engines_unavailable() {
        let pipeline = pipeline_with(vec![
            StubEngine::new("neural", false, StubBehavior::Empty),
            StubEngine::new("tesseract", false, StubBehavior::Empty),
            Arc::new(MockEngine::new()),
        ]);

        let outcome = pipeline.process(&png_bytes(), Language::English, 0.5).await;

        assert!(outcome.success);
        assert_eq!(outcome.engine_used, "mock");
        assert!(!outcome.text.is_empty());
        assert_eq!(pipeline.stats().engine_usage["mock"], 1);
    }

    #[tokio::test]
    async fn decode_failure_is_a_recorded_error() {
        let pipeline = pipeline_with(vec![Arc::new(MockEngine::new())]);
        let garbage: Vec<u8> = (0..2048u32).map(|i| (i * 7 % 251) as u8).collect();

        let outcome = pipeline.process(&garbage, Language::Malay, 0.8).await;

        assert!(!outcome.success);
        assert_eq!(outcome.engine_used, "none");
        assert_eq!(outcome.confidence, 0.0);
        assert!(outcome.text.contains("decoding failed"));

        let stats = pipeline.stats();
        assert_eq!(stats.total_processed, 1);
        assert_eq!(stats.error_count, 1);
        assert_eq!(stats.engine_usage["none"], 1);
    }

    #[tokio::test]
    async fn threshold_drops_low_confidence_detections() {
        let engine = StubEngine::new(
            "neural",
            true,
            StubBehavior::Detections(vec![
                detection("KERAJAAN MALAYSIA MYKAO", 0.9),
                detection("smudged line", 0.5),
            ]),
        );
        let pipeline = pipeline_with(vec![engine]);

        let outcome = pipeline.process(&png_bytes(), Language::Malay, 0.7).await;

        assert!(outcome.success);
        assert_eq!(outcome.detections.len(), 1);
        assert!(!outcome.text.contains("smudged"));
        // Corrected concatenated text, original detection text preserved.
        assert_eq!(outcome.text, "KERAJAAN MALAYSIA MyKad");
        assert_eq!(outcome.detections[0].text, "KERAJAAN MALAYSIA MYKAO");
        assert_eq!(outcome.document_type, DocumentType::MyKad);
    }

    #[tokio::test]
    async fn zero_survivors_is_still_a_success() {
        let engine = StubEngine::new(
            "neural",
            true,
            StubBehavior::Detections(vec![detection("barely legible", 0.2)]),
        );
        let pipeline = pipeline_with(vec![engine]);

        let outcome = pipeline.process(&png_bytes(), Language::English, 0.9).await;

        assert!(outcome.success);
        assert!(outcome.text.is_empty());
        assert_eq!(outcome.confidence, 0.0);
        assert_eq!(outcome.word_count, 0);
    }

    #[tokio::test]
    async fn exhausted_fallback_without_mock_is_a_failure() {
        let pipeline = pipeline_with(vec![
            StubEngine::new("neural", true, StubBehavior::Error),
            StubEngine::new("tesseract", true, StubBehavior::Error),
        ]);

        let outcome = pipeline.process(&png_bytes(), Language::Chinese, 0.5).await;

        assert!(!outcome.success);
        assert_eq!(outcome.engine_used, "none");
        assert_eq!(pipeline.stats().error_count, 1);
    }

    #[tokio::test]
    async fn statistics_average_over_requests() {
        let engine = StubEngine::new(
            "neural",
            true,
            StubBehavior::Detections(vec![detection("line", 0.8)]),
        );
        let pipeline = pipeline_with(vec![engine]);
        let bytes = png_bytes();

        pipeline.process(&bytes, Language::English, 0.5).await;
        pipeline.process(&bytes, Language::Malay, 0.5).await;

        let stats = pipeline.stats();
        assert_eq!(stats.total_processed, 2);
        assert_eq!(stats.error_count, 0);
        assert!((stats.avg_confidence - 0.8).abs() < 1e-6);
        assert_eq!(stats.language_distribution[&Language::English], 1);
        assert_eq!(stats.language_distribution[&Language::Malay], 1);
    }

    #[tokio::test]
    async fn health_reports_every_tier() {
        let pipeline = pipeline_with(vec![
            StubEngine::new("neural", false, StubBehavior::Empty),
            Arc::new(MockEngine::new()),
        ]);
        let health = pipeline.health();
        assert_eq!(health.len(), 2);
        assert!(!health[0].available);
        assert!(health[1].available);
    }
}
