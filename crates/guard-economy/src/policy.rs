//! Policy Engine (C10): an ordered decision pipeline over a session's
//! spending, plus the budget bookkeeping that backs it.
//!
//! Budget state is guarded by a single mutex and mutated only through
//! `reserve` / `commit` / `release`, so two concurrent requests against
//! the same session can never both observe headroom and overdraw it:
//! `reserve` deducts eagerly before the upstream call is made, `commit`
//! reconciles the reservation against the call's actual cost once it's
//! known, and `release` gives an unused reservation back if the call
//! never happened (for example, the request was blocked before it was
//! sent upstream).

use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::error::{EconomyError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostPolicy {
    pub denylist: Vec<String>,
    pub daily_budget: f64,
    pub monthly_budget: f64,
    pub per_request_cap: f64,
    pub session_warn_threshold: f64,
    pub session_block_threshold: f64,
    /// Estimated cost above which a `simple` request's declared model is
    /// swapped for the Economy tier rather than honored as-is.
    pub auto_downgrade_threshold: f64,
}

impl Default for CostPolicy {
    fn default() -> Self {
        Self {
            denylist: Vec::new(),
            daily_budget: 50.0,
            monthly_budget: 1000.0,
            per_request_cap: 1.0,
            session_warn_threshold: 5.0,
            session_block_threshold: 10.0,
            auto_downgrade_threshold: 0.10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PolicyDecision {
    Allow,
    Warn { reason: String },
    RequireApproval { reason: String },
    Downgrade { reason: String },
    Block { reason: String },
}

#[derive(Debug, Default)]
struct BudgetState {
    day_spent: f64,
    month_spent: f64,
    session_spent: f64,
}

pub struct PolicyEngine {
    policy: CostPolicy,
    budget: Mutex<BudgetState>,
}

impl PolicyEngine {
    pub fn new(policy: CostPolicy) -> Self {
        Self { policy, budget: Mutex::new(BudgetState::default()) }
    }

    /// Runs the ordered decision pipeline for a request of estimated cost
    /// `estimated_cost` against `subject` (e.g. the requesting model or
    /// user id). Does not mutate budget state; call `reserve` separately
    /// once the caller has decided to proceed.
    pub fn evaluate(&self, subject: &str, estimated_cost: f64) -> PolicyDecision {
        if self.policy.denylist.iter().any(|d| d == subject) {
            return PolicyDecision::Block { reason: format!("`{subject}` is denylisted") };
        }

        let budget = self.budget.lock().expect("budget mutex poisoned");
        if budget.day_spent + estimated_cost > self.policy.daily_budget
            || budget.month_spent + estimated_cost > self.policy.monthly_budget
        {
            return PolicyDecision::Block { reason: "daily or monthly budget would be exceeded".into() };
        }

        if estimated_cost > self.policy.per_request_cap {
            return PolicyDecision::RequireApproval {
                reason: format!("request cost {estimated_cost:.2} exceeds per-request cap {:.2}", self.policy.per_request_cap),
            };
        }

        if budget.session_spent + estimated_cost > self.policy.session_block_threshold {
            return PolicyDecision::Block { reason: "session spending limit would be exceeded".into() };
        }
        if budget.session_spent + estimated_cost > self.policy.session_warn_threshold {
            return PolicyDecision::Warn { reason: "session spending is approaching its limit".into() };
        }

        PolicyDecision::Allow
    }

    /// Deducts `amount` from all three budgets atomically before the
    /// upstream call is made.
    pub fn reserve(&self, amount: f64) -> Result<()> {
        let mut budget = self.budget.lock().expect("budget mutex poisoned");
        let available = self.policy.daily_budget - budget.day_spent;
        if amount > available {
            return Err(EconomyError::BudgetExhausted { required: amount, available, operation: "reserve".into() });
        }
        budget.day_spent += amount;
        budget.month_spent += amount;
        budget.session_spent += amount;
        Ok(())
    }

    /// Reconciles a reservation of `reserved` against the call's actual
    /// cost `actual`, crediting back any difference.
    pub fn commit(&self, reserved: f64, actual: f64) {
        let mut budget = self.budget.lock().expect("budget mutex poisoned");
        let refund = reserved - actual;
        budget.day_spent -= refund;
        budget.month_spent -= refund;
        budget.session_spent -= refund;
    }

    /// Returns a reservation in full, e.g. because the request was blocked
    /// before any upstream call happened.
    pub fn release(&self, reserved: f64) {
        self.commit(reserved, 0.0);
    }

    pub fn session_spent(&self) -> f64 {
        self.budget.lock().expect("budget mutex poisoned").session_spent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn denylist_blocks_before_budget_checks() {
        let policy = CostPolicy { denylist: vec!["bad-actor".into()], ..Default::default() };
        let engine = PolicyEngine::new(policy);
        assert_eq!(engine.evaluate("bad-actor", 0.01), PolicyDecision::Block { reason: "`bad-actor` is denylisted".into() });
    }

    #[test]
    fn per_request_cap_requires_approval() {
        let policy = CostPolicy { per_request_cap: 0.5, ..Default::default() };
        let engine = PolicyEngine::new(policy);
        match engine.evaluate("user", 1.0) {
            PolicyDecision::RequireApproval { .. } => {}
            other => panic!("expected RequireApproval, got {other:?}"),
        }
    }

    #[test]
    fn reserve_then_release_restores_budget() {
        let engine = PolicyEngine::new(CostPolicy::default());
        engine.reserve(2.0).unwrap();
        assert_eq!(engine.session_spent(), 2.0);
        engine.release(2.0);
        assert_eq!(engine.session_spent(), 0.0);
    }

    #[test]
    fn reserve_refuses_to_overdraw_daily_budget() {
        let policy = CostPolicy { daily_budget: 1.0, ..Default::default() };
        let engine = PolicyEngine::new(policy);
        assert!(engine.reserve(2.0).is_err());
    }

    #[test]
    fn session_threshold_warns_then_blocks() {
        let policy = CostPolicy { session_warn_threshold: 1.0, session_block_threshold: 2.0, ..Default::default() };
        let engine = PolicyEngine::new(policy);
        engine.reserve(1.5).unwrap();
        match engine.evaluate("user", 0.2) {
            PolicyDecision::Warn { .. } => {}
            other => panic!("expected Warn, got {other:?}"),
        }
        match engine.evaluate("user", 0.9) {
            PolicyDecision::Block { .. } => {}
            other => panic!("expected Block, got {other:?}"),
        }
    }
}
