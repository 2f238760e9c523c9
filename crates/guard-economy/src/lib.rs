//! # guard-economy
//!
//! The cost-control half of the gateway: Response Cache (C7), Model Router
//! (C8), Prompt Compressor (C9) and Policy Engine (C10).
//!
//! ```text
//!  request ---> router::classify_request ---> ModelRouter::select
//!           \-> cache::fingerprint -------> ResponseCache::get/put
//!           \-> compressor::compress
//!           \-> policy::PolicyEngine::evaluate -> reserve/commit/release
//! ```
//!
//! None of these four depend on each other; `guard-core`'s Runtime Guard
//! is what sequences them (cache probe, then route and compress only on a
//! miss, then policy before the call goes upstream).

pub mod cache;
pub mod compressor;
pub mod error;
pub mod policy;
pub mod router;

pub use cache::{CacheEntry, ResponseCache};
pub use compressor::{CompressionResult, PromptCompressor};
pub use error::{EconomyError, Result};
pub use policy::{CostPolicy, PolicyDecision, PolicyEngine};
pub use router::{classify_request, default_model_configs, ModelConfig, ModelRouter, ModelTier, RequestType};
