use std::collections::BTreeSet;

use agentic_kernel::blackboard::Blackboard;
use serde::{Deserialize, Serialize};

use super::budget::Budget;

/// Which event classes are worth printing for a human watching a process run
/// (spec.md §6: "Verbosity controls which event classes are surfaced").
/// Orthogonal to whether events fire at all — the event bus always carries
/// every event; verbosity only governs what a CLI-style subscriber echoes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verbosity {
    pub show_planning: bool,
    pub show_prompts: bool,
    pub show_llm_responses: bool,
    pub show_tool_calls: bool,
}

impl Verbosity {
    pub fn quiet() -> Self {
        Self::default()
    }

    pub fn all() -> Self {
        Self {
            show_planning: true,
            show_prompts: true,
            show_llm_responses: true,
            show_tool_calls: true,
        }
    }
}

/// What happens to a suspended action's eventual result once a process has
/// already been abandoned by its caller (spec.md §5: "EarlyTerminationPolicy").
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EarlyTerminationPolicy {
    /// Let the in-flight action finish and record its outcome even though no
    /// one is driving the loop forward anymore.
    #[default]
    LetInFlightFinish,
    /// Cancel the in-flight action's `CancellationToken` immediately.
    CancelImmediately,
}

/// Artificial delays injected between operations, used by tests that need to
/// observe an in-between state (e.g. "cancel while an action is running")
/// without a race (spec.md §5: "Control: deterministic delay hooks").
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ControlDelays {
    pub tool_delay_ms: u64,
    pub operation_delay_ms: u64,
}

/// Configuration for one [`super::AgentProcess`] (spec.md §6's configuration
/// table). Everything is set through builder methods at construction time —
/// there is no file-based layering, matching the rest of this workspace's
/// config surfaces (e.g. `agentic-kernel` has none, and this crate's other
/// `*Options` structs follow the same shape).
pub struct ProcessOptions {
    pub(crate) budget: Budget,
    pub(crate) verbosity: Verbosity,
    pub(crate) test_mode: bool,
    pub(crate) allow_goal_change: bool,
    pub(crate) early_termination: EarlyTerminationPolicy,
    pub(crate) delays: ControlDelays,
    /// Restricts planning to actions whose `tool_groups` are a subset of this
    /// set (spec.md §4.3 edge case: "actions with missing required tool
    /// groups are excluded"). `None` means unrestricted — every
    /// [`crate::platform::Platform::create_process`] call fills this in from
    /// its own registered tool groups unless the caller already set one;
    /// callers building an `AgentProcess` directly get the unrestricted
    /// default.
    pub(crate) available_tool_groups: Option<BTreeSet<String>>,
    seeds: Vec<Box<dyn FnOnce(&mut Blackboard) + Send>>,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            budget: Budget::unlimited(),
            verbosity: Verbosity::quiet(),
            test_mode: false,
            allow_goal_change: false,
            early_termination: EarlyTerminationPolicy::default(),
            delays: ControlDelays::default(),
            available_tool_groups: None,
            seeds: Vec::new(),
        }
    }
}

impl std::fmt::Debug for ProcessOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessOptions")
            .field("budget", &self.budget)
            .field("verbosity", &self.verbosity)
            .field("test_mode", &self.test_mode)
            .field("allow_goal_change", &self.allow_goal_change)
            .field("early_termination", &self.early_termination)
            .field("delays", &self.delays)
            .field("available_tool_groups", &self.available_tool_groups)
            .field("seeds", &self.seeds.len())
            .finish()
    }
}

impl ProcessOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_budget(mut self, budget: Budget) -> Self {
        self.budget = budget;
        self
    }

    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Substitutes a deterministic fake LLM/ranker at the call sites that
    /// support one (spec.md §4.6/§4.7: "Determinism in test mode").
    pub fn test_mode(mut self, test_mode: bool) -> Self {
        self.test_mode = test_mode;
        self
    }

    pub fn allow_goal_change(mut self, allow: bool) -> Self {
        self.allow_goal_change = allow;
        self
    }

    pub fn with_early_termination(mut self, policy: EarlyTerminationPolicy) -> Self {
        self.early_termination = policy;
        self
    }

    pub fn with_delays(mut self, delays: ControlDelays) -> Self {
        self.delays = delays;
        self
    }

    /// Explicitly restricts planning to this set of tool groups, overriding
    /// whatever [`crate::platform::Platform::create_process`] would otherwise
    /// fill in from its own registry.
    pub fn with_available_tool_groups(mut self, groups: BTreeSet<String>) -> Self {
        self.available_tool_groups = Some(groups);
        self
    }

    /// Seeds the process's blackboard with a pre-bound object before the
    /// first planning pass (spec.md §6: "initialBindings"). Stored as a
    /// closure rather than a `BlackboardObject` because the blackboard the
    /// value will eventually live on does not exist yet at options-build
    /// time.
    pub fn with_initial_binding<T>(mut self, name: impl Into<String>, value: T) -> Self
    where
        T: std::any::Any + Send + Sync + 'static,
    {
        let name = name.into();
        self.seeds.push(Box::new(move |bb: &mut Blackboard| {
            bb.bind(name, value);
        }));
        self
    }

    /// Applies every `with_initial_binding` seed to `blackboard`, consuming
    /// them. Called once by `AgentProcess::new`.
    pub(crate) fn apply_seeds(&mut self, blackboard: &mut Blackboard) {
        for seed in self.seeds.drain(..) {
            seed(blackboard);
        }
    }
}
