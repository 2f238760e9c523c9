//! Model Router (C8): classifies a request's complexity and decides whether
//! its declared model should be swapped for a cheaper one.
//!
//! The pricing table below mirrors a typical provider rate card: each
//! model carries its per-tier placement, per-token input/output price and
//! provider name. The caller's declared model is preserved unless the
//! request classifies as `Simple` and its estimated cost exceeds the
//! configured auto-downgrade threshold — only then is it swapped for an
//! Economy-tier model; ties between equally-priced candidates are broken
//! first by provider locality (prefer the declared model's own provider, to
//! avoid a cold cross-provider call) and then alphabetically by model id, so
//! routing is deterministic.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RequestType {
    Simple,
    Moderate,
    Complex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ModelTier {
    Economy,
    Standard,
    Premium,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub id: &'static str,
    pub provider: &'static str,
    pub tier: ModelTier,
    pub input_price_per_1k: f64,
    pub output_price_per_1k: f64,
}

pub fn default_model_configs() -> Vec<ModelConfig> {
    vec![
        ModelConfig { id: "gpt-4o", provider: "openai", tier: ModelTier::Premium, input_price_per_1k: 0.005, output_price_per_1k: 0.015 },
        ModelConfig { id: "gpt-4o-mini", provider: "openai", tier: ModelTier::Economy, input_price_per_1k: 0.00015, output_price_per_1k: 0.0006 },
        ModelConfig { id: "gpt-4-turbo", provider: "openai", tier: ModelTier::Premium, input_price_per_1k: 0.01, output_price_per_1k: 0.03 },
        ModelConfig { id: "claude-3-5-sonnet", provider: "anthropic", tier: ModelTier::Standard, input_price_per_1k: 0.003, output_price_per_1k: 0.015 },
        ModelConfig { id: "claude-3-haiku", provider: "anthropic", tier: ModelTier::Economy, input_price_per_1k: 0.00025, output_price_per_1k: 0.00125 },
        ModelConfig { id: "claude-3-opus", provider: "anthropic", tier: ModelTier::Premium, input_price_per_1k: 0.015, output_price_per_1k: 0.075 },
    ]
}

/// Keywords that push a request toward `Complex` regardless of length:
/// reasoning-heavy asks benefit from a stronger model even when short.
const COMPLEX_HINTS: &[&str] = &["prove", "derive", "architecture", "design a", "optimize", "debug", "refactor"];
const MODERATE_HINTS: &[&str] = &["summarize", "explain", "compare", "analyze"];

pub fn classify_request(text: &str) -> RequestType {
    let lower = text.to_lowercase();
    let density = keyword_density(&lower, COMPLEX_HINTS);
    if density > 0.0 || text.len() > 2000 {
        return RequestType::Complex;
    }
    if keyword_density(&lower, MODERATE_HINTS) > 0.0 || text.len() > 400 {
        return RequestType::Moderate;
    }
    RequestType::Simple
}

fn keyword_density(text: &str, hints: &[&str]) -> f64 {
    let hits = hints.iter().filter(|h| text.contains(*h)).count();
    hits as f64 / hints.len() as f64
}

pub struct ModelRouter {
    catalogue: Vec<ModelConfig>,
}

impl ModelRouter {
    pub fn new(catalogue: Vec<ModelConfig>) -> Self {
        Self { catalogue }
    }

    pub fn with_default_catalogue() -> Self {
        Self::new(default_model_configs())
    }

    fn find(&self, id: &str) -> Option<&ModelConfig> {
        self.catalogue.iter().find(|m| m.id == id)
    }

    /// Preserves the caller's `declared_model` unchanged unless the request
    /// is classified `Simple` and `estimated_cost` exceeds
    /// `auto_downgrade_threshold`, in which case it is swapped for the
    /// cheapest (Economy-tier) model, preferring the declared model's own
    /// provider on ties. A `declared_model` not present in the catalogue is
    /// still returned as-is when no downgrade is justified — the router
    /// only ever substitutes models it knows about.
    pub fn select(&self, declared_model: &str, request_type: RequestType, estimated_cost: f64, auto_downgrade_threshold: f64) -> &str {
        let should_downgrade = request_type == RequestType::Simple && estimated_cost > auto_downgrade_threshold;
        if !should_downgrade {
            return declared_model;
        }
        let preferred_provider = self.find(declared_model).map(|m| m.provider);
        self.pick_at_tier(ModelTier::Economy, preferred_provider).map(|m| m.id).unwrap_or(declared_model)
    }

    fn pick_at_tier(&self, tier: ModelTier, preferred_provider: Option<&str>) -> Option<&ModelConfig> {
        let mut candidates: Vec<&ModelConfig> = self.catalogue.iter().filter(|m| m.tier == tier).collect();
        if candidates.is_empty() {
            return None;
        }
        candidates.sort_by(|a, b| {
            let a_local = preferred_provider.map(|p| a.provider == p).unwrap_or(false);
            let b_local = preferred_provider.map(|p| b.provider == p).unwrap_or(false);
            b_local.cmp(&a_local).then_with(|| a.id.cmp(b.id))
        });
        candidates.into_iter().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_short_plain_text_as_simple() {
        assert_eq!(classify_request("hi, how are you?"), RequestType::Simple);
    }

    #[test]
    fn classifies_reasoning_keyword_as_complex_even_when_short() {
        assert_eq!(classify_request("prove this theorem"), RequestType::Complex);
    }

    #[test]
    fn declared_model_is_preserved_when_cost_is_under_threshold() {
        let router = ModelRouter::with_default_catalogue();
        let selected = router.select("gpt-4-turbo", RequestType::Simple, 0.01, 0.10);
        assert_eq!(selected, "gpt-4-turbo");
    }

    #[test]
    fn declared_model_is_preserved_for_non_simple_requests_regardless_of_cost() {
        let router = ModelRouter::with_default_catalogue();
        let selected = router.select("gpt-4-turbo", RequestType::Complex, 5.0, 0.10);
        assert_eq!(selected, "gpt-4-turbo");
    }

    #[test]
    fn simple_request_over_cost_threshold_downgrades_to_economy_tier() {
        let router = ModelRouter::with_default_catalogue();
        let selected = router.select("gpt-4-turbo", RequestType::Simple, 0.5, 0.10);
        let model = router.find(selected).unwrap();
        assert_eq!(model.tier, ModelTier::Economy);
    }

    #[test]
    fn auto_downgrade_prefers_declared_models_own_provider() {
        let router = ModelRouter::with_default_catalogue();
        let selected = router.select("claude-3-opus", RequestType::Simple, 0.5, 0.10);
        let model = router.find(selected).unwrap();
        assert_eq!(model.tier, ModelTier::Economy);
        assert_eq!(model.provider, "anthropic");
    }

    #[test]
    fn declared_model_unknown_to_catalogue_is_still_preserved_without_downgrade() {
        let router = ModelRouter::with_default_catalogue();
        let selected = router.select("some-custom-model", RequestType::Simple, 0.01, 0.10);
        assert_eq!(selected, "some-custom-model");
    }
}
