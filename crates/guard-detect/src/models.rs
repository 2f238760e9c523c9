//! Shared types for the pattern, model and intent classifiers and the PII scanner.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse category a threat classifier can assign to a span of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThreatType {
    PromptInjection,
    JailbreakAttempt,
    DataExfiltration,
    RoleManipulation,
    InstructionOverride,
    Encoding,
    Other,
}

/// A single classifier's finding about a span of input text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreatFinding {
    pub threat_type: ThreatType,
    pub confidence: f64,
    pub is_critical: bool,
    pub span: (usize, usize),
    pub detector: &'static str,
    pub description: String,
}

impl ThreatFinding {
    pub fn new(
        threat_type: ThreatType,
        confidence: f64,
        is_critical: bool,
        span: (usize, usize),
        detector: &'static str,
        description: impl Into<String>,
    ) -> Self {
        Self {
            threat_type,
            confidence: confidence.clamp(0.0, 1.0),
            is_critical,
            span,
            detector,
            description: description.into(),
        }
    }
}

/// Kind of personally identifiable information a scan can find.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PiiType {
    Email,
    Phone,
    CreditCard,
    Ipv4,
    KoreanRrn,
    KoreanPhone,
    KoreanBankAccount,
    Ssn,
}

impl PiiType {
    /// English label used when redacting a match in `Label` mode.
    pub fn label(self) -> &'static str {
        match self {
            PiiType::Email => "[EMAIL]",
            PiiType::Phone => "[PHONE]",
            PiiType::CreditCard => "[CREDIT_CARD]",
            PiiType::Ipv4 => "[IP_ADDRESS]",
            PiiType::KoreanRrn => "[RRN]",
            PiiType::KoreanPhone => "[PHONE]",
            PiiType::KoreanBankAccount => "[BANK_ACCOUNT]",
            PiiType::Ssn => "[SSN]",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PiiMatch {
    pub pii_type: PiiType,
    pub span: (usize, usize),
    pub matched_text: String,
}

/// How a PII scan rewrites the matched spans of the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SanitizeMode {
    /// Replace the whole match with a type label, e.g. `[EMAIL]`.
    Label,
    /// Keep a short prefix/suffix of the match and mask the interior with `*`.
    Mask,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PiiScanResult {
    pub matches: Vec<PiiMatch>,
    pub sanitized_text: String,
}

#[derive(Debug, Error)]
pub enum DetectError {
    #[error("invalid regex pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("model classifier artifact unavailable: {0}")]
    ModelUnavailable(String),
    #[error("tokenizer error: {0}")]
    Tokenizer(String),
    #[error("inference error: {0}")]
    Inference(String),
}

pub type Result<T> = std::result::Result<T, DetectError>;
