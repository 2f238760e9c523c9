//! Request/response envelopes and session-scoped usage records shared by
//! the Runtime Guard's public API.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundRequest {
    pub session_id: String,
    pub model: String,
    pub temperature: f64,
    pub system_prompt: String,
    pub user_message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanInputResponse {
    pub decision: crate::verdict::GuardDecision,
    pub risk_score: f64,
    pub sanitized_message: String,
    pub selected_model: Option<String>,
    pub compressed_prompt: Option<String>,
    pub cached_response: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanOutputResponse {
    pub decision: crate::verdict::GuardDecision,
    pub sanitized_response: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageRecord {
    pub session_id: String,
    pub model: String,
    pub estimated_cost: f64,
    pub actual_cost: f64,
}
