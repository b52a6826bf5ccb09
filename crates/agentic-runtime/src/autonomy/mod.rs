//! Autonomy (spec.md §4.8): the two entry points that turn a free-form user
//! intent into a running [`AgentProcess`] — `choose_and_run_agent`'s closed
//! execution model (pick one of the platform's registered agents) and
//! `choose_and_accomplish_goal`'s open execution model (pick a goal out of a
//! scope, synthesize a pruned [`Agent`] around it).
//!
//! Errors are modeled as variant values, never thrown control flow (spec.md
//! §7): [`AutonomyError`] carries the seven spec-mandated cases, and a
//! successful-but-suspended process is surfaced as [`AutonomySuccess::Waiting`]
//! rather than an error, per §7's "this is a success with a suspend
//! semantic, not an error".

use std::sync::Arc;

use agentic_kernel::blackboard::Blackboard;
use agentic_kernel::model::Agent;
use agentic_kernel::planner::prune_actions;
use agentic_kernel::world::WorldState;
use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::platform::Platform;
use crate::process::{AgentProcess, ProcessOptions, ProcessStatus};
use crate::process::ProcessEvent;
use crate::ranker::{Ranker, RankerError, Rankings, DEFAULT_CONFIDENCE_CUTOFF};
use crate::DEFAULT_BINDING;

/// The free-form intent seeded onto a process's blackboard under the
/// default binding at the start of both autonomy entry points (spec.md
/// §4.8: "Seed the blackboard with a `UserInput(intent)`").
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct UserInput(pub String);

/// The seven spec-mandated error variants (spec.md §7), minus the
/// not-an-error `ProcessWaiting` case, which [`AutonomySuccess::Waiting`]
/// carries instead.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AutonomyError {
    #[error("no goal in scope scored above the confidence cutoff for intent '{intent}'")]
    NoGoalFound { intent: String, rankings: Rankings },

    #[error("goal '{goal}' was not approved for intent '{intent}': {reason}")]
    GoalNotApproved {
        intent: String,
        goal: String,
        rankings: Rankings,
        reason: String,
    },

    #[error("no registered agent scored above the confidence cutoff for intent '{intent}'")]
    NoAgentFound { intent: String, rankings: Rankings },

    #[error("process {process_id} failed: {detail}")]
    ProcessFailed { process_id: Uuid, detail: String },

    #[error("process {process_id} got stuck: no reachable plan to any goal")]
    ProcessStuck { process_id: Uuid },

    #[error("process {process_id} was terminated: {reason}")]
    ProcessTerminated { process_id: Uuid, reason: String },

    #[error("ranker backend failed: {0}")]
    Ranker(#[from] RankerError),

    #[error("scope has no goal named '{0}'")]
    UnknownGoal(String),

    #[error("world state error while pruning the synthesized agent: {0}")]
    World(#[from] agentic_kernel::world::WorldStateError),
}

/// The outcome of a successful autonomy call: either the process ran to
/// completion, or it suspended on an `Awaitable` and is handed back to the
/// caller so they can `resume` it later (spec.md §7: waiting is a success).
pub enum AutonomySuccess {
    Completed(Box<AgentProcess>),
    Waiting(Box<AgentProcess>),
}

impl AutonomySuccess {
    pub fn into_process(self) -> AgentProcess {
        match self {
            AutonomySuccess::Completed(process) => *process,
            AutonomySuccess::Waiting(process) => *process,
        }
    }
}

/// Confidence cutoffs and the `ProcessOptions` to seed each created process
/// with (spec.md §6's configuration table: `goalConfidenceCutOff`,
/// `agentConfidenceCutOff`, default `0.6`).
pub struct AutonomyOptions {
    pub goal_confidence_cutoff: f64,
    pub agent_confidence_cutoff: f64,
    pub process_options: ProcessOptions,
}

impl Default for AutonomyOptions {
    fn default() -> Self {
        Self {
            goal_confidence_cutoff: DEFAULT_CONFIDENCE_CUTOFF,
            agent_confidence_cutoff: DEFAULT_CONFIDENCE_CUTOFF,
            process_options: ProcessOptions::new(),
        }
    }
}

impl AutonomyOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_goal_confidence_cutoff(mut self, cutoff: f64) -> Self {
        self.goal_confidence_cutoff = cutoff;
        self
    }

    pub fn with_agent_confidence_cutoff(mut self, cutoff: f64) -> Self {
        self.agent_confidence_cutoff = cutoff;
        self
    }

    pub fn with_process_options(mut self, options: ProcessOptions) -> Self {
        self.process_options = options;
        self
    }
}

/// What a ranked goal needs from a human (or policy) before Autonomy will
/// pursue it (spec.md §4.8: `chooseAndAccomplishGoal(..., goalApprover,
/// ...)`).
#[derive(Debug, Clone)]
pub enum GoalApproval {
    Approved,
    Rejected { reason: String },
}

#[async_trait]
pub trait GoalApprover: Send + Sync {
    async fn approve(&self, goal_name: &str, intent: &str) -> GoalApproval;
}

/// A [`GoalApprover`] that approves everything, for tests and for callers
/// that don't want a human in the loop.
pub struct AlwaysApprove;

#[async_trait]
impl GoalApprover for AlwaysApprove {
    async fn approve(&self, _goal_name: &str, _intent: &str) -> GoalApproval {
        GoalApproval::Approved
    }
}

/// Intent → ranking → synthesize pruned [`Agent`] → execute (spec.md §2 C8,
/// §4.8).
pub struct Autonomy {
    platform: Platform,
    ranker: Arc<dyn Ranker>,
}

impl Autonomy {
    pub fn new(platform: Platform, ranker: Arc<dyn Ranker>) -> Self {
        Self { platform, ranker }
    }

    /// Closed execution model (spec.md §4.8): rank the platform's registered
    /// agents against `intent`; if the top score clears the cutoff, seed and
    /// run that agent.
    pub async fn choose_and_run_agent(
        &self,
        intent: &str,
        options: AutonomyOptions,
    ) -> Result<AutonomySuccess, AutonomyError> {
        let agents = self.platform.agents();
        let candidate_names: Vec<String> = agents.iter().map(|a| a.name.clone()).collect();

        self.platform.events().publish(ProcessEvent::RankingChoiceRequest {
            process_id: Uuid::nil(),
            description: "select the agent best suited to this intent".to_string(),
            candidates: candidate_names.clone(),
            at: std::time::SystemTime::now(),
        });

        if candidate_names.is_empty() {
            self.platform.events().publish(ProcessEvent::RankingChoiceNotMade {
                process_id: Uuid::nil(),
                reason: "no agents registered".to_string(),
                at: std::time::SystemTime::now(),
            });
            return Err(AutonomyError::NoAgentFound {
                intent: intent.to_string(),
                rankings: Rankings::new(Vec::new()),
            });
        }

        let rankings = self
            .ranker
            .rank("select the agent best suited to this intent", intent, &candidate_names)
            .await?;

        let Some(top) = rankings.top_above(options.agent_confidence_cutoff) else {
            self.platform.events().publish(ProcessEvent::RankingChoiceNotMade {
                process_id: Uuid::nil(),
                reason: "no agent scored above the confidence cutoff".to_string(),
                at: std::time::SystemTime::now(),
            });
            return Err(AutonomyError::NoAgentFound {
                intent: intent.to_string(),
                rankings,
            });
        };

        let chosen_name = top.candidate.clone();
        let chosen_score = top.score;
        let agent = agents
            .into_iter()
            .find(|a| a.name == chosen_name)
            .expect("ranked candidate names come from this agent list");

        self.platform.events().publish(ProcessEvent::RankingChoiceMade {
            process_id: Uuid::nil(),
            chosen: chosen_name,
            confidence: chosen_score,
            at: std::time::SystemTime::now(),
        });

        let process_options = options
            .process_options
            .with_initial_binding(DEFAULT_BINDING, UserInput(intent.to_string()));

        let _permit = self.platform.acquire_slot().await;
        let mut process = self.platform.create_process(agent, process_options);
        let status = process.run().await;
        resolve(process, status)
    }

    /// Open execution model (spec.md §4.8): rank `scope`'s goals against
    /// `intent`; on approval, synthesize an [`Agent`] containing all of
    /// `scope`'s actions/conditions plus the single chosen goal, prune it
    /// against the world state a freshly seeded `UserInput` produces, and run
    /// it.
    pub async fn choose_and_accomplish_goal(
        &self,
        intent: &str,
        options: AutonomyOptions,
        approver: &dyn GoalApprover,
        scope: &Agent,
    ) -> Result<AutonomySuccess, AutonomyError> {
        let goal_names: Vec<String> = scope.goals().iter().map(|g| g.name.clone()).collect();

        self.platform.events().publish(ProcessEvent::RankingChoiceRequest {
            process_id: Uuid::nil(),
            description: "select the goal that best matches this intent".to_string(),
            candidates: goal_names.clone(),
            at: std::time::SystemTime::now(),
        });

        if goal_names.is_empty() {
            self.platform.events().publish(ProcessEvent::RankingChoiceNotMade {
                process_id: Uuid::nil(),
                reason: "scope has no goals".to_string(),
                at: std::time::SystemTime::now(),
            });
            return Err(AutonomyError::NoGoalFound {
                intent: intent.to_string(),
                rankings: Rankings::new(Vec::new()),
            });
        }

        let rankings = self
            .ranker
            .rank("select the goal that best matches this intent", intent, &goal_names)
            .await?;

        let Some(top) = rankings.top_above(options.goal_confidence_cutoff) else {
            self.platform.events().publish(ProcessEvent::RankingChoiceNotMade {
                process_id: Uuid::nil(),
                reason: "no goal scored above the confidence cutoff".to_string(),
                at: std::time::SystemTime::now(),
            });
            return Err(AutonomyError::NoGoalFound {
                intent: intent.to_string(),
                rankings,
            });
        };

        let goal_name = top.candidate.clone();
        let goal_score = top.score;

        match approver.approve(&goal_name, intent).await {
            GoalApproval::Rejected { reason } => {
                self.platform.events().publish(ProcessEvent::RankingChoiceNotMade {
                    process_id: Uuid::nil(),
                    reason: reason.clone(),
                    at: std::time::SystemTime::now(),
                });
                return Err(AutonomyError::GoalNotApproved {
                    intent: intent.to_string(),
                    goal: goal_name,
                    rankings,
                    reason,
                });
            }
            GoalApproval::Approved => {}
        }

        self.platform.events().publish(ProcessEvent::RankingChoiceMade {
            process_id: Uuid::nil(),
            chosen: goal_name.clone(),
            confidence: goal_score,
            at: std::time::SystemTime::now(),
        });

        let single_goal_agent = scope
            .with_single_goal(&goal_name)
            .map_err(|_| AutonomyError::UnknownGoal(goal_name.clone()))?;

        let mut seed_blackboard = Blackboard::new();
        seed_blackboard.bind(DEFAULT_BINDING, UserInput(intent.to_string()));
        let starting_world =
            WorldState::evaluate(single_goal_agent.conditions(), &seed_blackboard.snapshot())?;
        let pruned_actions = prune_actions(&starting_world, single_goal_agent.actions());
        let pruned_agent = single_goal_agent.with_actions(pruned_actions);

        let process_options = options
            .process_options
            .with_initial_binding(DEFAULT_BINDING, UserInput(intent.to_string()));

        let mut process = self.platform.create_process(pruned_agent, process_options);
        self.platform.events().publish(ProcessEvent::DynamicAgentCreated {
            process_id: process.id(),
            agent_name: format!("{}::{}", scope.name, goal_name),
            at: std::time::SystemTime::now(),
        });

        let _permit = self.platform.acquire_slot().await;
        let status = process.run().await;
        resolve(process, status)
    }
}

fn resolve(process: AgentProcess, status: ProcessStatus) -> Result<AutonomySuccess, AutonomyError> {
    match status {
        ProcessStatus::Completed => Ok(AutonomySuccess::Completed(Box::new(process))),
        ProcessStatus::Waiting => Ok(AutonomySuccess::Waiting(Box::new(process))),
        ProcessStatus::Failed => Err(AutonomyError::ProcessFailed {
            process_id: process.id(),
            detail: process
                .failure()
                .map(|f| f.detail.clone())
                .unwrap_or_else(|| "no detail".to_string()),
        }),
        ProcessStatus::Stuck => Err(AutonomyError::ProcessStuck { process_id: process.id() }),
        ProcessStatus::Terminated => Err(AutonomyError::ProcessTerminated {
            process_id: process.id(),
            reason: process
                .failure()
                .map(|f| f.detail.clone())
                .unwrap_or_else(|| "no reason recorded".to_string()),
        }),
        ProcessStatus::Created | ProcessStatus::Running => {
            unreachable!("AgentProcess::run always returns a rest state")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranker::FakeRanker;

    #[tokio::test]
    async fn no_agent_found_when_registry_is_empty() {
        let platform = Platform::new();
        let autonomy = Autonomy::new(platform, Arc::new(FakeRanker::new()));

        let err = autonomy
            .choose_and_run_agent("xyz", AutonomyOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AutonomyError::NoAgentFound { .. }));
    }
}
