//! Error types for the Runtime Guard.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GuardError {
    #[error("detection error: {0}")]
    Detect(#[from] guard_detect::DetectError),

    #[error("knowledge store error: {0}")]
    Knowledge(#[from] guard_knowledge::KnowledgeError),

    #[error("economy error: {0}")]
    Economy(#[from] guard_economy::EconomyError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to read config file: {0}")]
    ConfigIo(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, GuardError>;
