//! The persisted-state data shape (spec.md §6: "Process id, status, options,
//! blackboard contents (ordered objects + bindings), history of actions with
//! timestamps, accumulated usage, pending awaitable (opaque) — a bag of typed
//! records; exact wire format is implementer's choice provided round-trip
//! identity holds for the documented types").
//!
//! No storage backend ships (persistence itself is out of scope, spec.md §1);
//! this module only defines the serializable shape a caller-supplied store
//! would read and write.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::budget::{Budget, BudgetUsage};
use super::options::{ControlDelays, EarlyTerminationPolicy, Verbosity};
use super::{ExecutedAction, FailureInfo, ProcessStatus};

/// A blackboard object's structural identity — sequence number and runtime
/// type name, not the opaque payload itself. A blackboard object is an
/// `Arc<dyn Any + Send + Sync>` (see `agentic_kernel::blackboard::BlackboardObject`)
/// and so cannot round-trip generically through `serde`; a real store would
/// need a caller-supplied, type-specific serializer keyed by `type_name` to
/// recover the payload, which is exactly the "implementer's choice" spec.md
/// §6 leaves open.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlackboardObjectRecord {
    pub seq: u64,
    pub type_name: String,
}

/// The structural shape of a persisted blackboard: append order plus
/// name-to-object bindings, keyed by sequence number rather than an
/// embedded copy of the object (spec.md §6: "blackboard contents (ordered
/// objects + bindings)").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlackboardRecord {
    pub objects: Vec<BlackboardObjectRecord>,
    pub bindings: HashMap<String, u64>,
}

/// The serializable snapshot of an [`super::AgentProcess`] (spec.md §6).
/// `pending_awaitable` only records whether one exists, not its payload —
/// `Awaitable` is a type-erased `Box<dyn Any + Send + Sync>` with no
/// `serde` contract of its own, matching spec.md §6's "pending awaitable
/// (opaque)".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedProcessState {
    pub process_id: Uuid,
    pub status: ProcessStatus,
    pub failure: Option<FailureInfo>,
    pub budget: Budget,
    pub usage: BudgetUsage,
    pub verbosity: Verbosity,
    pub test_mode: bool,
    pub allow_goal_change: bool,
    pub early_termination: EarlyTerminationPolicy,
    pub delays: ControlDelays,
    pub available_tool_groups: Option<BTreeSet<String>>,
    pub blackboard: BlackboardRecord,
    pub history: Vec<ExecutedAction>,
    pub pending_awaitable: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let state = PersistedProcessState {
            process_id: Uuid::new_v4(),
            status: ProcessStatus::Completed,
            failure: None,
            budget: Budget::unlimited().with_max_actions(5),
            usage: BudgetUsage::default(),
            verbosity: Verbosity::quiet(),
            test_mode: true,
            allow_goal_change: false,
            early_termination: EarlyTerminationPolicy::default(),
            delays: ControlDelays::default(),
            available_tool_groups: None,
            blackboard: BlackboardRecord {
                objects: vec![BlackboardObjectRecord {
                    seq: 0,
                    type_name: "demo::Report".to_string(),
                }],
                bindings: HashMap::from([("input".to_string(), 0)]),
            },
            history: vec![ExecutedAction {
                action_name: "write".to_string(),
                at: std::time::SystemTime::UNIX_EPOCH,
                outcome: "appended demo::Report".to_string(),
            }],
            pending_awaitable: false,
        };

        let json = serde_json::to_string(&state).unwrap();
        let restored: PersistedProcessState = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.process_id, state.process_id);
        assert_eq!(restored.blackboard.objects.len(), 1);
        assert_eq!(restored.history.len(), 1);
    }
}
