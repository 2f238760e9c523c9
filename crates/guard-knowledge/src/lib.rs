//! # guard-knowledge
//!
//! The attack knowledge graph (C11) and the hash-linked provenance chain
//! (C13), both persisted with `sled`.
//!
//! The knowledge graph stores known attack samples together with their
//! keywords and techniques, and answers keyword-overlap similarity queries
//! for `guard-semantic`'s Semantic Classifier. The provenance chain is an
//! independent, per-session append-only log: every record's hash covers
//! the previous record's hash, so a verifier can walk the chain and find
//! the first broken link without trusting the storage layer itself.
//!
//! ```text
//!  ingest_sample ----> [samples | keywords | techniques | signatures]
//!                            |         (inverted indexes)
//!                   keyword_to_samples, category_to_samples
//!                            |
//!               find_similar_by_keywords(query) -> SimilarityMatch
//!
//!  append(session, event) -> ProvenanceRecord{ previous_hash, record_hash }
//! ```

pub mod models;
pub mod provenance;
pub mod storage;
pub mod store;

pub use models::{
    AttackKeyword, AttackSample, AttackSignature, AttackTechnique, DetectionEdge, KeywordEdge,
    KnowledgeError, KnowledgeStats, ProvenanceRecord, Result, SimilarityEdge, SimilarityMatch,
};
pub use provenance::ProvenanceChain;
pub use store::KnowledgeStore;
