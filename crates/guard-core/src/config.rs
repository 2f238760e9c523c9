//! Configuration types for the Runtime Guard.

use std::path::PathBuf;

use guard_economy::CostPolicy;
use serde::{Deserialize, Serialize};

/// Top-level configuration, loadable from a TOML file via
/// `GuardConfig::load`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GuardConfig {
    pub detection: DetectionConfig,
    pub knowledge: KnowledgeConfig,
    pub cache: CacheConfig,
    pub policy: CostPolicy,
    pub global: GlobalConfig,
}

impl GuardConfig {
    pub fn load(path: impl AsRef<std::path::Path>) -> crate::error::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&raw)?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Minimum risk score a model classifier finding must clear to be
    /// surfaced at all.
    pub model_classifier_threshold: f64,
    /// PII sanitization mode: "label" or "mask".
    pub pii_label_mode: bool,
    /// Fused risk score at or above which a request is blocked outright.
    pub block_threshold: f64,
    /// Fused risk score at or above which a request is allowed through but
    /// surfaced as `GuardDecision::Warn` rather than a plain `Allow`.
    pub warn_threshold: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            model_classifier_threshold: 0.95,
            pii_label_mode: true,
            block_threshold: 0.8,
            warn_threshold: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    pub db_path: PathBuf,
    /// Bound on the number of samples queued for background ingestion
    /// before new samples are dropped rather than blocking the guard path.
    pub ingestion_high_water_mark: usize,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self { db_path: PathBuf::from("./guard_knowledge.db"), ingestion_high_water_mark: 10_000 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub capacity: usize,
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { capacity: 10_000, ttl_seconds: 300 }
    }
}

/// Global guard settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Fail-closed mode: an internal error results in Block instead of Allow.
    pub fail_closed: bool,
    pub audit_logging: bool,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self { fail_closed: true, audit_logging: true }
    }
}
