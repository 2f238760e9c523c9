//! # guard-detect
//!
//! Detection primitives for the PromptGuard threat engine: the Pattern
//! Classifier (C1, regex catalogue), the Model Classifier (C3, ONNX
//! sequence classifier), the Intent Classifier (C4, short-text veto
//! heuristic) and the PII Scanner (C5).
//!
//! ```text
//!            text in
//!              |
//!   +----------+-----------+
//!   |          |           |
//! pattern   model       intent     (C1, C3, C4 -- run by callers, fused
//!   |          |           |        upstream in guard-core)
//!   +----------+-----------+
//!              |
//!        Vec<ThreatFinding>
//! ```
//!
//! Each classifier here is independent and side-effect free: none of them
//! know about fusion, caching or policy. That orchestration lives in
//! `guard-core`, which is the only thing that calls more than one of these
//! at once.
//!
//! ## Threat model
//!
//! These classifiers see untrusted user input before it reaches an
//! upstream model, and untrusted model output before it reaches a caller.
//! They are deliberately cheap and CPU-bound except for the model
//! classifier's inference call, so a malicious prompt cannot stall the
//! guard path by triggering expensive work -- worst case, one classifier's
//! finding is just absent.

pub mod intent;
pub mod model_classifier;
pub mod models;
pub mod pattern;
pub mod pii;

pub use intent::IntentClassifier;
pub use model_classifier::ModelClassifier;
pub use models::{
    DetectError, PiiMatch, PiiScanResult, PiiType, Result, SanitizeMode, ThreatFinding, ThreatType,
};
pub use pattern::{PatternClassifier, SignatureDef};
pub use pii::PiiScanner;
