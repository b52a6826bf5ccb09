use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use uuid::Uuid;

use super::budget::{Budget, BudgetExceededReason, BudgetUsage};
use super::options::Verbosity;

/// The slice of a process's state that code outside the process loop needs
/// to see by id alone — chiefly the LLM mediator, which receives only a
/// [`super::ProcessContext`] (process id + shared handles) at call time, not
/// a reference to the owning `AgentProcess` itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessMeta {
    pub budget: Budget,
    pub usage: BudgetUsage,
    pub verbosity: Verbosity,
    pub test_mode: bool,
}

/// A process-id-keyed registry of [`ProcessMeta`], grounded on
/// `mofa-kernel::budget::BudgetEnforcer`'s `Arc<RwLock<HashMap<_, _>>>`
/// pattern but keyed per-process instead of per-agent-session/day, since a
/// [`super::AgentProcess`]'s budget is scoped to itself rather than shared
/// across a fleet of processes for the same agent.
#[derive(Clone, Default)]
pub struct ProcessRegistry {
    entries: Arc<RwLock<HashMap<Uuid, ProcessMeta>>>,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, process_id: Uuid, budget: Budget, verbosity: Verbosity, test_mode: bool) {
        self.entries.write().expect("process registry lock poisoned").insert(
            process_id,
            ProcessMeta {
                budget,
                usage: BudgetUsage::default(),
                verbosity,
                test_mode,
            },
        );
    }

    pub fn unregister(&self, process_id: Uuid) {
        self.entries.write().expect("process registry lock poisoned").remove(&process_id);
    }

    pub fn meta(&self, process_id: Uuid) -> Option<ProcessMeta> {
        self.entries.read().expect("process registry lock poisoned").get(&process_id).copied()
    }

    pub fn record_action(&self, process_id: Uuid) -> Option<BudgetExceededReason> {
        let mut entries = self.entries.write().expect("process registry lock poisoned");
        let entry = entries.get_mut(&process_id)?;
        entry.usage.record_action();
        entry.usage.exceeded(&entry.budget)
    }

    /// Records LLM usage against `process_id`'s running totals, called by a
    /// concrete `LlmMediator` implementation after a real call completes, and
    /// returns the tripped limit (if any) so the caller can decide whether to
    /// let the in-flight response through or fail the action.
    pub fn record_llm_usage(&self, process_id: Uuid, tokens: u64, cost: f64) -> Option<BudgetExceededReason> {
        let mut entries = self.entries.write().expect("process registry lock poisoned");
        let entry = entries.get_mut(&process_id)?;
        entry.usage.record_llm_usage(tokens, cost);
        entry.usage.exceeded(&entry.budget)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_action_returns_exceeded_reason_once_tripped() {
        let registry = ProcessRegistry::new();
        let id = Uuid::new_v4();
        registry.register(id, Budget::unlimited().with_max_actions(2), Verbosity::quiet(), false);

        assert!(registry.record_action(id).is_none());
        assert!(registry.record_action(id).is_some());
    }

    #[test]
    fn unknown_process_id_yields_none_everywhere() {
        let registry = ProcessRegistry::new();
        assert!(registry.meta(Uuid::new_v4()).is_none());
        assert!(registry.record_action(Uuid::new_v4()).is_none());
    }

    #[test]
    fn unregister_removes_the_entry() {
        let registry = ProcessRegistry::new();
        let id = Uuid::new_v4();
        registry.register(id, Budget::unlimited(), Verbosity::quiet(), true);
        assert!(registry.meta(id).is_some());
        registry.unregister(id);
        assert!(registry.meta(id).is_none());
    }
}
