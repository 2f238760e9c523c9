//! # guard-core
//!
//! The Runtime Guard (C12): the unified facade that orchestrates Detection
//! Fusion (C6), the Response Cache, Model Router, Prompt Compressor and
//! Policy Engine from `guard-economy`, and the Provenance Chain from
//! `guard-knowledge`, into the two pipelines every caller drives.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                        RUNTIME GUARD                          │
//! ├───────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  before_request:                                               │
//! │    PII scan -> Detection Fusion -> Cache probe                 │
//! │                                 -> Router + Policy Engine       │
//! │                                 -> Prompt Compressor            │
//! │                                                                 │
//! │  after_response:                                                │
//! │    PII / leak scan -> Cache populate -> Policy commit           │
//! │                     -> Usage record -> Provenance append        │
//! │                                                                 │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Security notes
//!
//! - The pipeline is fail-closed: an internal error during `before_request`
//!   is turned into a `Block` decision rather than an `Allow`, when
//!   `GlobalConfig::fail_closed` is set (the default).
//! - A critical finding from fusion always wins, independent of cache or
//!   budget state — a cached response is never served for a request that
//!   fusion has just flagged as critical.
//! - Every decision is appended to the session's provenance chain, whether
//!   audit logging later inspects it or not.

mod config;
mod error;
mod fusion;
mod guard;
mod types;
mod verdict;

pub use config::{CacheConfig, DetectionConfig, GlobalConfig, GuardConfig, KnowledgeConfig};
pub use error::{GuardError, Result};
pub use fusion::{DetectionFusion, FusionResult};
pub use guard::RuntimeGuard;
pub use types::{InboundRequest, ScanInputResponse, ScanOutputResponse, UsageRecord};
pub use verdict::{BlockReason, GuardDecision};
