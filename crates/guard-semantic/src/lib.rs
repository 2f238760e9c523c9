//! # guard-semantic
//!
//! Semantic Classifier (C2): keyword-overlap similarity search against the
//! attack knowledge graph maintained by `guard-knowledge`. Where the
//! Pattern Classifier matches exact phrasing, this classifier catches
//! paraphrases of known attacks by extracting keywords from the input and
//! asking the knowledge store which stored attack samples share enough of
//! them.
//!
//! A closed list of keyword combinations gates the knowledge-store query
//! itself: unless the input's keyword set shares at least two tokens with
//! one of these combinations, the classifier returns no threats without
//! ever touching the store, which keeps casual use of a single common word
//! like "admin" from triggering a lookup. Passing the gate is not itself a
//! finding -- it only permits the similarity search to run, and that
//! search's own thresholds decide whether anything is reported.

pub mod classifier;

pub use classifier::{SemanticClassifier, HIGH_INTENT_COMBOS};
