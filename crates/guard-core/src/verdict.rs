//! Decision types returned by the Runtime Guard.

use serde::{Deserialize, Serialize};

/// The decision the Runtime Guard reaches after fusing C1-C4 and running
/// the Policy Engine over a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GuardDecision {
    /// Request passed all checks. Safe to send upstream.
    Allow,

    /// Request failed security or budget checks. Do not send upstream.
    Block { reason: BlockReason },

    /// Request requires human approval before proceeding.
    RequireApproval { reason: String },

    /// Request may proceed, but routed to a cheaper model tier.
    Downgrade { reason: String },

    /// Request may proceed; logged for visibility but not blocking.
    Warn { reason: String },
}

impl GuardDecision {
    pub fn allow() -> Self {
        Self::Allow
    }

    pub fn block(reason: BlockReason) -> Self {
        Self::Block { reason }
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow | Self::Warn { .. } | Self::Downgrade { .. })
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::Block { .. })
    }

    pub fn requires_approval(&self) -> bool {
        matches!(self, Self::RequireApproval { .. })
    }
}

/// Reasons the guard can block a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BlockReason {
    CriticalThreatDetected { threat_type: String, detector: &'static str },
    DenylistedSubject { subject: String },
    BudgetExceeded { scope: String },
    SessionLimitExceeded,
    InternalError { description: String },
}

impl std::fmt::Display for BlockReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CriticalThreatDetected { threat_type, detector } => {
                write!(f, "critical threat `{threat_type}` detected by {detector}")
            }
            Self::DenylistedSubject { subject } => write!(f, "`{subject}` is denylisted"),
            Self::BudgetExceeded { scope } => write!(f, "{scope} budget exceeded"),
            Self::SessionLimitExceeded => write!(f, "session spending limit exceeded"),
            Self::InternalError { description } => write!(f, "internal error: {description}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_reports_allowed() {
        let decision = GuardDecision::allow();
        assert!(decision.is_allowed());
        assert!(!decision.is_blocked());
    }

    #[test]
    fn block_reports_blocked_not_allowed() {
        let decision = GuardDecision::block(BlockReason::SessionLimitExceeded);
        assert!(!decision.is_allowed());
        assert!(decision.is_blocked());
    }

    #[test]
    fn warn_and_downgrade_still_count_as_allowed() {
        assert!(GuardDecision::Warn { reason: "x".into() }.is_allowed());
        assert!(GuardDecision::Downgrade { reason: "x".into() }.is_allowed());
    }
}
