//! Hard terminal limits on a process (spec.md §3/§5: "Budget... exceeding
//! any is a terminal condition with status TERMINATED").

use serde::{Deserialize, Serialize};

/// Per-process limits, all optional (a `None` field never terminates the
/// process). Mirrors `mofa-kernel::budget::BudgetConfig`'s shape, scoped down
/// to one process instead of one agent-id's session/day buckets, since a
/// `Budget` here lives and dies with a single `AgentProcess`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub max_actions: Option<u32>,
    pub max_tokens: Option<u64>,
    pub max_cost: Option<f64>,
}

impl Budget {
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn with_max_actions(mut self, max_actions: u32) -> Self {
        self.max_actions = Some(max_actions);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u64) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_max_cost(mut self, max_cost: f64) -> Self {
        self.max_cost = Some(max_cost);
        self
    }
}

/// Which limit a [`Budget`] check tripped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BudgetExceededReason {
    MaxActions { used: u32, limit: u32 },
    MaxTokens { used: u64, limit: u64 },
    MaxCost { used: f64, limit: f64 },
}

/// Running totals for one process, checked against its [`Budget`] between
/// actions and before each LLM call (spec.md §5).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct BudgetUsage {
    pub actions: u32,
    pub tokens: u64,
    pub cost: f64,
}

impl BudgetUsage {
    pub fn record_action(&mut self) {
        self.actions += 1;
    }

    pub fn record_llm_usage(&mut self, tokens: u64, cost: f64) {
        self.tokens += tokens;
        self.cost += cost;
    }

    /// `Some(reason)` for the first limit this usage trips against `budget`,
    /// checking actions, then tokens, then cost.
    pub fn exceeded(&self, budget: &Budget) -> Option<BudgetExceededReason> {
        if let Some(limit) = budget.max_actions {
            if self.actions >= limit {
                return Some(BudgetExceededReason::MaxActions {
                    used: self.actions,
                    limit,
                });
            }
        }
        if let Some(limit) = budget.max_tokens {
            if self.tokens >= limit {
                return Some(BudgetExceededReason::MaxTokens {
                    used: self.tokens,
                    limit,
                });
            }
        }
        if let Some(limit) = budget.max_cost {
            if self.cost >= limit {
                return Some(BudgetExceededReason::MaxCost {
                    used: self.cost,
                    limit,
                });
            }
        }
        None
    }
}
