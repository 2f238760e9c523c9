//! Intent Classifier (C4): a short-text heuristic that acts purely as a veto
//! signal inside fusion, never as a standalone detector. It looks at
//! surface properties of short messages — imperative mood markers, direct
//! address of "the system"/"the assistant", and a lack of any legitimate
//! task framing — to flag messages that read as commands aimed at the
//! model itself rather than content for the model to act on.

use crate::models::{ThreatFinding, ThreatType};

const IMPERATIVE_MARKERS: &[&str] = &["ignore", "disregard", "forget", "override", "bypass", "reveal", "act as"];
const ADDRESSEE_MARKERS: &[&str] = &["system", "assistant", "model", "ai"];

/// Messages longer than this are considered out of scope for the heuristic:
/// it is calibrated on short, command-shaped text and gets noisy on prose.
const MAX_LEN: usize = 280;

pub struct IntentClassifier;

impl IntentClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn scan(&self, text: &str) -> Vec<ThreatFinding> {
        if text.len() > MAX_LEN {
            return Vec::new();
        }
        let lower = text.to_lowercase();
        let has_imperative = IMPERATIVE_MARKERS.iter().any(|m| lower.contains(m));
        let has_addressee = ADDRESSEE_MARKERS.iter().any(|m| lower.contains(m));
        if !(has_imperative && has_addressee) {
            return Vec::new();
        }
        vec![ThreatFinding::new(
            ThreatType::InstructionOverride,
            0.4,
            false,
            (0, text.len()),
            "intent",
            "short imperative message directly addressing the system",
        )]
    }
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::new()
    }
}
