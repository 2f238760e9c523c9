//! Model Classifier (C3): an ONNX sequence classifier loaded through `ort`
//! with tokenization via `tokenizers`. Mirrors the teacher's lazy-import
//! posture for optional heavyweight dependencies: if the tokenizer or model
//! file cannot be loaded at construction time, the classifier disables
//! itself and every subsequent scan returns empty rather than erroring, so
//! the rest of the fusion pipeline keeps working without the ML signal.

use std::path::Path;
use std::sync::Mutex;

use ndarray::{Array2, CowArray};
use ort::{Environment, ExecutionProvider, GraphOptimizationLevel, Session, SessionBuilder, Value};
use tokenizers::Tokenizer;
use tracing::warn;

use crate::models::{ThreatFinding, ThreatType};

const MAX_SEQUENCE_LEN: usize = 256;
/// Inputs shorter than this are skipped entirely: too little signal for a
/// sequence classifier to be meaningful.
const MIN_TEXT_LEN: usize = 5;

pub struct ModelClassifier {
    enabled: bool,
    /// Minimum class-1 (injection) probability required to surface a
    /// finding, taken from `DetectionConfig::model_classifier_threshold`.
    threshold: f32,
    tokenizer: Option<Tokenizer>,
    session: Option<Mutex<Session>>,
}

impl ModelClassifier {
    /// Attempts to load a tokenizer and ONNX model from the given paths.
    /// Never returns an error: failure is recorded as `enabled = false`.
    pub fn load(tokenizer_path: impl AsRef<Path>, model_path: impl AsRef<Path>, threshold: f32) -> Self {
        let tokenizer = match Tokenizer::from_file(tokenizer_path.as_ref()) {
            Ok(t) => Some(t),
            Err(e) => {
                warn!(error = %e, "model classifier: tokenizer unavailable, disabling");
                None
            }
        };

        let session = tokenizer.as_ref().and_then(|_| {
            let environment = match Environment::builder()
                .with_name("guard-detect")
                .with_execution_providers([ExecutionProvider::CPU(Default::default())])
                .build()
            {
                Ok(env) => env.into_arc(),
                Err(e) => {
                    warn!(error = %e, "model classifier: ort environment unavailable, disabling");
                    return None;
                }
            };
            match SessionBuilder::new(&environment)
                .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level1))
                .and_then(|b| b.with_model_from_file(model_path.as_ref()))
            {
                Ok(session) => Some(Mutex::new(session)),
                Err(e) => {
                    warn!(error = %e, "model classifier: model artifact unavailable, disabling");
                    None
                }
            }
        });

        let enabled = tokenizer.is_some() && session.is_some();
        Self { enabled, threshold, tokenizer, session }
    }

    /// A classifier with no backing artifacts: always disabled. Useful as a
    /// default when no model has been provisioned for a deployment.
    pub fn disabled(threshold: f32) -> Self {
        Self { enabled: false, threshold, tokenizer: None, session: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn scan(&self, text: &str) -> Vec<ThreatFinding> {
        if !self.enabled || text.chars().count() < MIN_TEXT_LEN {
            return Vec::new();
        }
        match self.run_inference(text) {
            Ok(Some(score)) if score >= self.threshold => {
                vec![ThreatFinding::new(
                    ThreatType::PromptInjection,
                    score as f64,
                    false,
                    (0, text.len()),
                    "model",
                    format!("sequence classifier score {score:.3}"),
                )]
            }
            Ok(_) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "model classifier: inference failed, skipping");
                Vec::new()
            }
        }
    }

    fn run_inference(&self, text: &str) -> Result<Option<f32>, String> {
        let tokenizer = self.tokenizer.as_ref().ok_or("tokenizer missing")?;
        let session_lock = self.session.as_ref().ok_or("session missing")?;
        let encoding = tokenizer.encode(text, true).map_err(|e| e.to_string())?;
        let mut ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
        ids.truncate(MAX_SEQUENCE_LEN);
        let len = ids.len();
        let input = Array2::from_shape_vec((1, len), ids).map_err(|e| e.to_string())?;
        let input = CowArray::from(input).into_dyn();

        let session = session_lock.lock().map_err(|_| "session lock poisoned")?;
        let value = Value::from_array(session.allocator(), &input).map_err(|e| e.to_string())?;
        let outputs = session.run(vec![value]).map_err(|e| e.to_string())?;
        let logits = outputs
            .first()
            .ok_or("no model output")?
            .try_extract::<f32>()
            .map_err(|e| e.to_string())?;
        let view = logits.view();
        let class_logits: Vec<f32> = view.iter().copied().collect();
        Ok(Some(softmax_class1(&class_logits)))
    }
}

/// Softmaxes a binary classifier's two logits and returns the probability
/// mass on class 1 (injection). Falls back to a sigmoid over the last
/// value if the model only produced a single logit.
fn softmax_class1(logits: &[f32]) -> f32 {
    if logits.len() < 2 {
        let x = logits.last().copied().unwrap_or(0.0);
        return 1.0 / (1.0 + (-x).exp());
    }
    let max = logits.iter().cloned().fold(f32::MIN, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps[1] / sum
}
