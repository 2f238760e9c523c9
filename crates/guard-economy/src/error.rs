//! Error types shared across the response cache, model router, prompt
//! compressor and policy engine.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, EconomyError>;

#[derive(Debug, Error)]
pub enum EconomyError {
    #[error("budget exhausted: {operation} requires {required}, only {available} available")]
    BudgetExhausted { required: f64, available: f64, operation: String },

    #[error("no model tier satisfies the request's cost policy")]
    NoModelAvailable,

    #[error("cache lock poisoned for key {0}")]
    CachePoisoned(String),

    #[error("unknown model id: {0}")]
    UnknownModel(String),
}
