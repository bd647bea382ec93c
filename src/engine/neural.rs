//! Neural multilingual recognition engine (primary tier).
//!
//! Wraps per-language CRNN-style ONNX recognition models. Models are
//! initialized lazily, at most once per language: the first request for a
//! language loads its session and character dictionary under a lock, and a
//! failed initialization leaves a sticky `Failed` marker that is never
//! retried within the same process lifetime.
//!
//! The image is segmented into text-line bands with a projection profile;
//! each band is resized, normalized, run through the session, and decoded
//! with greedy CTC.

use crate::core::{EngineDescriptor, Language, OcrError, OcrResult, Region, TextDetection};
use crate::engine::{segment_lines, LineBand, RecognitionEngine};
use image::imageops::{self, FilterType};
use image::GrayImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Engine identifier recorded in results and statistics.
pub const NEURAL_ENGINE_ID: &str = "neural";

/// Model input height expected by the recognition models.
const INPUT_HEIGHT: u32 = 48;

/// Maximum model input width; wider lines are squeezed.
const MAX_INPUT_WIDTH: u32 = 320;

/// State of one language's model slot in the cache.
enum ModelSlot {
    /// The model initialized successfully and is shared across requests.
    Ready(Arc<RecModel>),
    /// Initialization failed; never retried for this process lifetime.
    Failed,
}

/// A loaded recognition model for one language.
struct RecModel {
    /// ONNX Runtime session. `run` needs exclusive access.
    session: Mutex<Session>,
    /// Name of the model's input tensor.
    input_name: String,
    /// Name of the model's output tensor.
    output_name: String,
    /// Character dictionary; class `i` maps to `charset[i - 1]`, class 0
    /// is the CTC blank.
    charset: Vec<String>,
}

/// The primary neural recognition engine.
pub struct NeuralEngine {
    model_dir: PathBuf,
    models: Mutex<HashMap<Language, ModelSlot>>,
}

impl NeuralEngine {
    /// Creates a neural engine reading models from the given directory.
    ///
    /// No model is loaded here; initialization happens on first use per
    /// language.
    pub fn new(model_dir: impl Into<PathBuf>) -> Self {
        let model_dir = model_dir.into();
        info!(model_dir = %model_dir.display(), "neural engine configured");
        Self {
            model_dir,
            models: Mutex::new(HashMap::new()),
        }
    }

    fn model_path(&self, language: Language) -> PathBuf {
        self.model_dir.join(format!("rec_{}.onnx", language.code()))
    }

    fn charset_path(&self, language: Language) -> PathBuf {
        self.model_dir.join(format!("keys_{}.txt", language.code()))
    }

    /// Returns the shared model for a language, initializing it at most
    /// once. Concurrent first-use is serialized by the cache lock.
    fn model_for(&self, language: Language) -> OcrResult<Arc<RecModel>> {
        let mut models = self
            .models
            .lock()
            .map_err(|_| OcrError::engine(NEURAL_ENGINE_ID, "model cache lock poisoned"))?;

        match models.get(&language) {
            Some(ModelSlot::Ready(model)) => Ok(Arc::clone(model)),
            Some(ModelSlot::Failed) => Err(OcrError::ModelUnavailable { language }),
            None => match self.load_model(language) {
                Ok(model) => {
                    let model = Arc::new(model);
                    models.insert(language, ModelSlot::Ready(Arc::clone(&model)));
                    info!(language = %language, "neural model initialized");
                    Ok(model)
                }
                Err(err) => {
                    warn!(
                        language = %language,
                        error = %err,
                        "neural model initialization failed, marking unavailable"
                    );
                    models.insert(language, ModelSlot::Failed);
                    Err(err)
                }
            },
        }
    }

    /// Loads the session and character dictionary for one language.
    fn load_model(&self, language: Language) -> OcrResult<RecModel> {
        let charset = load_charset(&self.charset_path(language))?;

        let model_path = self.model_path(language);
        let session = Session::builder()?.commit_from_file(&model_path)?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .ok_or_else(|| OcrError::engine(NEURAL_ENGINE_ID, "model declares no inputs"))?;
        let output_name = session
            .outputs
            .first()
            .map(|o| o.name.clone())
            .ok_or_else(|| OcrError::engine(NEURAL_ENGINE_ID, "model declares no outputs"))?;

        Ok(RecModel {
            session: Mutex::new(session),
            input_name,
            output_name,
            charset,
        })
    }

    /// Runs one line band through the model and decodes the prediction.
    fn recognize_band(
        &self,
        model: &RecModel,
        image: &GrayImage,
        band: LineBand,
    ) -> OcrResult<Option<TextDetection>> {
        let width = band.right - band.left;
        let height = band.bottom - band.top;
        let crop = imageops::crop_imm(image, band.left, band.top, width, height).to_image();

        let target_w = ((width * INPUT_HEIGHT) / height.max(1)).clamp(16, MAX_INPUT_WIDTH);
        let resized = imageops::resize(&crop, target_w, INPUT_HEIGHT, FilterType::Triangle);

        // Normalize to [-1, 1] and replicate the gray channel, matching the
        // PaddleOCR recognition preprocessing convention.
        let mut input =
            Array4::<f32>::zeros((1, 3, INPUT_HEIGHT as usize, target_w as usize));
        for (x, y, pixel) in resized.enumerate_pixels() {
            let value = (pixel[0] as f32 / 255.0 - 0.5) / 0.5;
            for channel in 0..3 {
                input[[0, channel, y as usize, x as usize]] = value;
            }
        }

        let input_tensor = TensorRef::from_array_view(input.view())?;
        let mut session = model
            .session
            .lock()
            .map_err(|_| OcrError::engine(NEURAL_ENGINE_ID, "session lock poisoned"))?;
        let outputs = session.run(ort::inputs![model.input_name.as_str() => input_tensor])?;
        let (shape, data) = outputs[model.output_name.as_str()].try_extract_tensor::<f32>()?;

        let dims = shape.to_vec();
        if dims.len() != 3 {
            return Err(OcrError::engine(
                NEURAL_ENGINE_ID,
                format!("expected a 3D prediction tensor, got {} dims", dims.len()),
            ));
        }
        let classes = dims[2] as usize;
        let (text, confidence) = ctc_greedy_decode(data, classes, &model.charset);
        if text.is_empty() {
            return Ok(None);
        }

        let region = Region::from_rect(
            band.left as f32,
            band.top as f32,
            band.right as f32,
            band.bottom as f32,
        );
        Ok(Some(TextDetection::new(text, region, confidence)))
    }
}

impl RecognitionEngine for NeuralEngine {
    fn descriptor(&self) -> EngineDescriptor {
        EngineDescriptor {
            id: NEURAL_ENGINE_ID,
            available: self.model_dir.is_dir(),
            priority: 0,
        }
    }

    fn supports(&self, language: Language) -> bool {
        if let Ok(models) = self.models.lock() {
            match models.get(&language) {
                Some(ModelSlot::Ready(_)) => return true,
                Some(ModelSlot::Failed) => return false,
                None => {}
            }
        }
        // Not yet initialized: availability means the model file exists.
        self.model_path(language).is_file()
    }

    fn recognize(
        &self,
        image: &GrayImage,
        language: Language,
    ) -> OcrResult<Vec<TextDetection>> {
        let model = self.model_for(language)?;

        let bands = segment_lines(image);
        debug!(lines = bands.len(), language = %language, "neural recognition");

        let mut detections = Vec::with_capacity(bands.len());
        for band in bands {
            if let Some(detection) = self.recognize_band(&model, image, band)? {
                detections.push(detection);
            }
        }
        Ok(detections)
    }
}

/// Loads a character dictionary: one token per line, class index offset by
/// one for the CTC blank at class 0.
fn load_charset(path: &Path) -> OcrResult<Vec<String>> {
    let raw = std::fs::read_to_string(path)?;
    let charset: Vec<String> = raw
        .lines()
        .map(|line| line.trim_end_matches(['\r', '\n']).to_string())
        .filter(|line| !line.is_empty())
        .collect();
    if charset.is_empty() {
        return Err(OcrError::engine(
            NEURAL_ENGINE_ID,
            format!("character dictionary '{}' is empty", path.display()),
        ));
    }
    Ok(charset)
}

/// Greedy CTC decode over a `[seq, classes]` probability sequence.
///
/// Collapses repeated classes, drops blanks (class 0), and returns the
/// decoded text with the mean probability of the emitted characters.
pub(crate) fn ctc_greedy_decode(
    data: &[f32],
    classes: usize,
    charset: &[String],
) -> (String, f32) {
    if classes == 0 {
        return (String::new(), 0.0);
    }

    let mut text = String::new();
    let mut probs = Vec::new();
    let mut previous = 0usize;

    for step in data.chunks_exact(classes) {
        let (index, &prob) = step
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
            .unwrap_or((0, &0.0));

        if index != 0 && index != previous {
            if let Some(token) = charset.get(index - 1) {
                text.push_str(token);
                probs.push(prob);
            }
        }
        previous = index;
    }

    let confidence = if probs.is_empty() {
        0.0
    } else {
        probs.iter().sum::<f32>() / probs.len() as f32
    };
    (text, confidence.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use std::io::Write;

    fn charset_abc() -> Vec<String> {
        vec!["A".to_string(), "B".to_string(), "C".to_string()]
    }

    /// Builds a `[seq, classes]` one-hot-ish sequence from class indices.
    fn sequence(steps: &[usize], classes: usize, peak: f32) -> Vec<f32> {
        let mut data = vec![0.01; steps.len() * classes];
        for (t, &class) in steps.iter().enumerate() {
            data[t * classes + class] = peak;
        }
        data
    }

    #[test]
    fn ctc_collapses_repeats_and_blanks() {
        // blank, A, A, blank, B, B, C -> "ABC"
        let data = sequence(&[0, 1, 1, 0, 2, 2, 3], 4, 0.9);
        let (text, confidence) = ctc_greedy_decode(&data, 4, &charset_abc());
        assert_eq!(text, "ABC");
        assert!((confidence - 0.9).abs() < 1e-6);
    }

    #[test]
    fn ctc_blank_separates_repeated_characters() {
        // A, blank, A -> "AA"
        let data = sequence(&[1, 0, 1], 4, 0.8);
        let (text, _) = ctc_greedy_decode(&data, 4, &charset_abc());
        assert_eq!(text, "AA");
    }

    #[test]
    fn ctc_all_blank_yields_empty_text() {
        let data = sequence(&[0, 0, 0], 4, 0.9);
        let (text, confidence) = ctc_greedy_decode(&data, 4, &charset_abc());
        assert!(text.is_empty());
        assert_eq!(confidence, 0.0);
    }

    #[test]
    fn failed_initialization_is_sticky() {
        let dir = tempfile::tempdir().unwrap();
        let engine = NeuralEngine::new(dir.path());
        let image = GrayImage::from_pixel(64, 64, Luma([255]));

        // No model files: the first call fails and marks the language.
        assert!(engine.recognize(&image, Language::Tamil).is_err());
        assert!(!engine.supports(Language::Tamil));

        // Sticky: even after a model file appears, no retry happens.
        std::fs::File::create(dir.path().join("rec_ta.onnx"))
            .unwrap()
            .write_all(b"not a real model")
            .unwrap();
        assert!(!engine.supports(Language::Tamil));
        assert!(matches!(
            engine.recognize(&image, Language::Tamil),
            Err(OcrError::ModelUnavailable { .. })
        ));
    }

    #[test]
    fn supports_reflects_model_file_presence() {
        let dir = tempfile::tempdir().unwrap();
        let engine = NeuralEngine::new(dir.path());
        assert!(!engine.supports(Language::English));

        std::fs::File::create(dir.path().join("rec_en.onnx")).unwrap();
        assert!(engine.supports(Language::English));
    }

    #[test]
    fn charset_loader_skips_empty_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys_en.txt");
        std::fs::write(&path, "A\nB\n\nC\n").unwrap();
        let charset = load_charset(&path).unwrap();
        assert_eq!(charset, charset_abc());
    }
}
