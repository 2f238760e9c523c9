//! Runtime Guard (C12): the orchestrator tying detection, caching,
//! routing, compression, policy and provenance together into the two
//! pipelines a caller actually drives — `before_request` and
//! `after_response`.
//!
//! ```text
//! before_request:  scan -> cache probe -> route + policy -> compress
//! after_response:  pii/leak scan -> cache populate -> policy commit
//!                  -> usage record -> provenance append
//! ```
//!
//! The guard is fail-closed: any internal error while `global.fail_closed`
//! is set is turned into a `Block` rather than propagated as `Allow`.
//! Knowledge-graph ingestion of newly detected samples happens on a
//! background task fed by an unbounded channel; a high-water mark on the
//! number of samples in flight makes ingestion back off by dropping new
//! samples rather than ever blocking the guard path itself.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use guard_detect::{IntentClassifier, ModelClassifier, PatternClassifier, PiiScanner, SanitizeMode};
use guard_economy::{classify_request, CostPolicy, ModelRouter, PolicyDecision, PolicyEngine, PromptCompressor, ResponseCache};
use guard_knowledge::{KnowledgeStore, ProvenanceChain};
use guard_semantic::SemanticClassifier;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::GuardConfig;
use crate::error::{GuardError, Result};
use crate::fusion::DetectionFusion;
use crate::types::{InboundRequest, ScanInputResponse, ScanOutputResponse, UsageRecord};
use crate::verdict::{BlockReason, GuardDecision};

struct IngestJob {
    text: String,
    category: String,
    risk_score: f64,
    keywords: Vec<String>,
}

pub struct RuntimeGuard {
    config: GuardConfig,
    fusion: DetectionFusion,
    pii: PiiScanner,
    cache: ResponseCache,
    router: ModelRouter,
    compressor: PromptCompressor,
    policy: PolicyEngine,
    provenance: Arc<ProvenanceChain>,
    ingest_tx: mpsc::UnboundedSender<IngestJob>,
    ingest_in_flight: Arc<AtomicUsize>,
}

impl RuntimeGuard {
    pub fn new(config: GuardConfig) -> Result<Self> {
        let knowledge = Arc::new(KnowledgeStore::open(&config.knowledge.db_path)?);
        let provenance = Arc::new(knowledge.provenance()?);

        let semantic = SemanticClassifier::new(knowledge.clone());
        let fusion = DetectionFusion::new(
            PatternClassifier::with_default_catalogue(),
            semantic,
            ModelClassifier::disabled(config.detection.model_classifier_threshold as f32),
            IntentClassifier::new(),
            config.detection.block_threshold,
        );

        let pii_mode = if config.detection.pii_label_mode { SanitizeMode::Label } else { SanitizeMode::Mask };

        let (ingest_tx, mut ingest_rx) = mpsc::unbounded_channel::<IngestJob>();
        let ingest_in_flight = Arc::new(AtomicUsize::new(0));
        let ingest_in_flight_bg = ingest_in_flight.clone();
        let knowledge_bg = knowledge.clone();
        tokio::spawn(async move {
            while let Some(job) = ingest_rx.recv().await {
                ingest_in_flight_bg.fetch_sub(1, Ordering::SeqCst);
                if let Err(e) = knowledge_bg.ingest_sample(&job.text, &job.category, job.risk_score, job.keywords, vec![]) {
                    warn!(error = %e, "background knowledge ingestion failed");
                }
            }
        });

        Ok(Self {
            cache: ResponseCache::new(config.cache.capacity, std::time::Duration::from_secs(config.cache.ttl_seconds)),
            router: ModelRouter::with_default_catalogue(),
            compressor: PromptCompressor::new(),
            policy: PolicyEngine::new(config.policy.clone()),
            fusion,
            pii: PiiScanner::new(pii_mode),
            provenance,
            ingest_tx,
            ingest_in_flight,
            config,
        })
    }

    fn queue_ingestion(&self, text: &str, category: &str, risk_score: f64, keywords: Vec<String>) {
        if self.ingest_in_flight.load(Ordering::SeqCst) >= self.config.knowledge.ingestion_high_water_mark {
            warn!("knowledge ingestion high-water mark reached, dropping sample");
            return;
        }
        self.ingest_in_flight.fetch_add(1, Ordering::SeqCst);
        let _ = self.ingest_tx.send(IngestJob { text: text.to_string(), category: category.to_string(), risk_score, keywords });
    }

    pub async fn before_request(&self, request: &InboundRequest) -> Result<ScanInputResponse> {
        match self.try_before_request(request).await {
            Ok(response) => Ok(response),
            Err(e) if self.config.global.fail_closed => {
                warn!(error = %e, "before_request failed, failing closed");
                self.append_provenance(&request.session_id, serde_json::json!({"event": "before_request_error", "error": e.to_string()}));
                Ok(ScanInputResponse {
                    decision: GuardDecision::block(BlockReason::InternalError { description: e.to_string() }),
                    risk_score: 1.0,
                    sanitized_message: String::new(),
                    selected_model: None,
                    compressed_prompt: None,
                    cached_response: None,
                })
            }
            Err(e) => Err(e),
        }
    }

    async fn try_before_request(&self, request: &InboundRequest) -> Result<ScanInputResponse> {
        let pii_result = self.pii.scan_and_sanitize(&request.user_message);
        let fusion_result = self.fusion.analyze(&pii_result.sanitized_text).await;

        if !fusion_result.safe {
            let top = fusion_result.top_finding();
            let threat_type = top.map(|f| format!("{:?}", f.threat_type)).unwrap_or_default();
            let detector = top.map(|f| f.detector).unwrap_or("fusion");
            self.queue_ingestion(&pii_result.sanitized_text, "prompt_injection", fusion_result.risk_score, Vec::new());
            let decision = GuardDecision::block(BlockReason::CriticalThreatDetected { threat_type, detector });
            self.append_provenance(&request.session_id, serde_json::json!({"event": "before_request", "decision": "block"}));
            return Ok(ScanInputResponse {
                decision,
                risk_score: fusion_result.risk_score,
                sanitized_message: pii_result.sanitized_text,
                selected_model: None,
                compressed_prompt: None,
                cached_response: None,
            });
        }

        let fingerprint = ResponseCache::fingerprint(&request.model, request.temperature, &request.system_prompt, &pii_result.sanitized_text);
        if let Some(cached) = self.cache.get(&fingerprint).await {
            self.append_provenance(&request.session_id, serde_json::json!({"event": "before_request", "decision": "cache_hit"}));
            return Ok(ScanInputResponse {
                decision: self.decision_for_risk(fusion_result.risk_score),
                risk_score: fusion_result.risk_score,
                sanitized_message: pii_result.sanitized_text,
                selected_model: Some(request.model.clone()),
                compressed_prompt: None,
                cached_response: Some(cached),
            });
        }

        let request_type = classify_request(&pii_result.sanitized_text);
        let estimated_cost = estimate_cost(&pii_result.sanitized_text);
        let decision = match self.policy.evaluate(&request.model, estimated_cost) {
            PolicyDecision::Block { reason } => GuardDecision::block(BlockReason::BudgetExceeded { scope: reason }),
            PolicyDecision::RequireApproval { reason } => GuardDecision::RequireApproval { reason },
            PolicyDecision::Downgrade { reason } => GuardDecision::Downgrade { reason },
            PolicyDecision::Warn { reason } => GuardDecision::Warn { reason },
            PolicyDecision::Allow => self.decision_for_risk(fusion_result.risk_score),
        };

        if decision.is_blocked() || decision.requires_approval() {
            self.append_provenance(&request.session_id, serde_json::json!({"event": "before_request", "decision": "policy_stop"}));
            return Ok(ScanInputResponse {
                decision,
                risk_score: fusion_result.risk_score,
                sanitized_message: pii_result.sanitized_text,
                selected_model: None,
                compressed_prompt: None,
                cached_response: None,
            });
        }

        self.policy.reserve(estimated_cost)?;

        let selected_model = Some(self.router.select(&request.model, request_type, estimated_cost, self.config.policy.auto_downgrade_threshold).to_string());
        let compression = self.compressor.compress(&pii_result.sanitized_text);

        info!(session = %request.session_id, risk = fusion_result.risk_score, "before_request allowed");
        self.append_provenance(&request.session_id, serde_json::json!({"event": "before_request", "decision": "allow"}));

        Ok(ScanInputResponse {
            decision,
            risk_score: fusion_result.risk_score,
            sanitized_message: pii_result.sanitized_text,
            selected_model,
            compressed_prompt: Some(compression.text),
            cached_response: None,
        })
    }

    pub async fn after_response(&self, request: &InboundRequest, response_text: &str, reserved_cost: f64, actual_cost: f64) -> Result<(ScanOutputResponse, UsageRecord)> {
        let pii_result = self.pii.scan_and_sanitize(response_text);
        let fusion_result = self.fusion.analyze(&pii_result.sanitized_text).await;

        let decision = if !fusion_result.safe {
            GuardDecision::block(BlockReason::CriticalThreatDetected { threat_type: "DataExfiltration".into(), detector: "fusion" })
        } else {
            self.decision_for_risk(fusion_result.risk_score)
        };

        if decision.is_allowed() {
            let fingerprint = ResponseCache::fingerprint(&request.model, request.temperature, &request.system_prompt, &request.user_message);
            self.cache.put(&fingerprint, pii_result.sanitized_text.clone()).await;
        }

        self.policy.commit(reserved_cost, actual_cost);
        let usage = UsageRecord {
            session_id: request.session_id.clone(),
            model: request.model.clone(),
            estimated_cost: reserved_cost,
            actual_cost,
        };
        self.append_provenance(&request.session_id, serde_json::json!({"event": "after_response", "decision": format!("{decision:?}")}));

        Ok((ScanOutputResponse { decision, sanitized_response: pii_result.sanitized_text }, usage))
    }

    /// Surfaces a non-blocking fused risk score as `Warn` once it clears
    /// `warn_threshold`, else plain `Allow`. Only ever called once the score
    /// has already cleared `block_threshold` (`fusion_result.safe`).
    fn decision_for_risk(&self, risk_score: f64) -> GuardDecision {
        if risk_score >= self.config.detection.warn_threshold {
            GuardDecision::Warn { reason: format!("fused risk score {risk_score:.2} exceeds warn threshold") }
        } else {
            GuardDecision::allow()
        }
    }

    fn append_provenance(&self, session_id: &str, event: serde_json::Value) {
        if !self.config.global.audit_logging {
            return;
        }
        if let Err(e) = self.provenance.append(session_id, event) {
            warn!(error = %e, "failed to append provenance record");
        }
    }

    pub fn verify_provenance(&self, session_id: &str) -> Result<()> {
        self.provenance.verify(session_id).map_err(GuardError::from)
    }
}

/// Rough per-request cost estimate: token count times a representative
/// blended per-token price, used only to decide whether a request fits
/// the policy's budget before a model has actually been selected.
fn estimate_cost(text: &str) -> f64 {
    const BLENDED_PRICE_PER_1K: f64 = 0.005;
    let tokens = guard_economy::compressor::estimate_tokens(text) as f64;
    (tokens / 1000.0) * BLENDED_PRICE_PER_1K
}
