use std::time::SystemTime;

use agentic_kernel::model::Action;
use uuid::Uuid;

use super::budget::BudgetExceededReason;
use super::{FailureInfo, ProcessStatus};

/// Everything observable about a running [`super::AgentProcess`], broadcast
/// on its [`super::EventBus`] channel (spec.md §6's event list). Every
/// variant carries enough to reconstruct a timeline without re-querying the
/// process — a subscriber that only ever sees events should be able to
/// render the same picture as one polling `AgentProcess::status`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum ProcessEvent {
    ProcessCreated {
        process_id: Uuid,
        agent_name: String,
        at: SystemTime,
    },
    ReadyToPlan {
        process_id: Uuid,
        world_state: std::collections::BTreeMap<String, agentic_kernel::world::Determination>,
        at: SystemTime,
    },
    PlanFormulated {
        process_id: Uuid,
        goal_name: String,
        action_names: Vec<String>,
        total_cost: f64,
        at: SystemTime,
    },
    NoPlanFound {
        process_id: Uuid,
        at: SystemTime,
    },
    ActionStart {
        process_id: Uuid,
        action_name: String,
        at: SystemTime,
    },
    ActionFinish {
        process_id: Uuid,
        action_name: String,
        outcome: String,
        at: SystemTime,
    },
    ObjectAdded {
        process_id: Uuid,
        type_name: String,
        at: SystemTime,
    },
    ObjectBound {
        process_id: Uuid,
        name: String,
        type_name: String,
        at: SystemTime,
    },
    LlmRequest {
        process_id: Uuid,
        interaction_id: Uuid,
        prompt_preview: String,
        at: SystemTime,
    },
    LlmResponse {
        process_id: Uuid,
        interaction_id: Uuid,
        tokens: u64,
        cost: f64,
        at: SystemTime,
    },
    ToolCallRequest {
        process_id: Uuid,
        tool_name: String,
        at: SystemTime,
    },
    ToolCallResponse {
        process_id: Uuid,
        tool_name: String,
        succeeded: bool,
        at: SystemTime,
    },
    ProgressUpdate {
        process_id: Uuid,
        message: String,
        at: SystemTime,
    },
    RankingChoiceRequest {
        process_id: Uuid,
        description: String,
        candidates: Vec<String>,
        at: SystemTime,
    },
    RankingChoiceMade {
        process_id: Uuid,
        chosen: String,
        confidence: f64,
        at: SystemTime,
    },
    RankingChoiceNotMade {
        process_id: Uuid,
        reason: String,
        at: SystemTime,
    },
    DynamicAgentCreated {
        process_id: Uuid,
        agent_name: String,
        at: SystemTime,
    },
    BudgetExceeded {
        process_id: Uuid,
        reason: BudgetExceededReason,
        at: SystemTime,
    },
    ProcessCompleted {
        process_id: Uuid,
        at: SystemTime,
    },
    ProcessFailed {
        process_id: Uuid,
        status: ProcessStatus,
        failure: FailureInfo,
        at: SystemTime,
    },
}

impl ProcessEvent {
    pub fn process_id(&self) -> Uuid {
        match self {
            ProcessEvent::ProcessCreated { process_id, .. }
            | ProcessEvent::ReadyToPlan { process_id, .. }
            | ProcessEvent::PlanFormulated { process_id, .. }
            | ProcessEvent::NoPlanFound { process_id, .. }
            | ProcessEvent::ActionStart { process_id, .. }
            | ProcessEvent::ActionFinish { process_id, .. }
            | ProcessEvent::ObjectAdded { process_id, .. }
            | ProcessEvent::ObjectBound { process_id, .. }
            | ProcessEvent::LlmRequest { process_id, .. }
            | ProcessEvent::LlmResponse { process_id, .. }
            | ProcessEvent::ToolCallRequest { process_id, .. }
            | ProcessEvent::ToolCallResponse { process_id, .. }
            | ProcessEvent::ProgressUpdate { process_id, .. }
            | ProcessEvent::RankingChoiceRequest { process_id, .. }
            | ProcessEvent::RankingChoiceMade { process_id, .. }
            | ProcessEvent::RankingChoiceNotMade { process_id, .. }
            | ProcessEvent::DynamicAgentCreated { process_id, .. }
            | ProcessEvent::BudgetExceeded { process_id, .. }
            | ProcessEvent::ProcessCompleted { process_id, .. }
            | ProcessEvent::ProcessFailed { process_id, .. } => *process_id,
        }
    }
}

pub(crate) fn action_names(actions: &[Action]) -> Vec<String> {
    actions.iter().map(|a| a.name.clone()).collect()
}
