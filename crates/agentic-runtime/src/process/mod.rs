//! The stateful plan → act → replan loop (spec.md §4.5) that drives one
//! [`Agent`] instance toward its goals, plus the supporting budget,
//! event-bus, and options types it is built from.

mod budget;
mod bus;
mod events;
mod options;
mod persist;
mod registry;

pub use budget::{Budget, BudgetExceededReason, BudgetUsage};
pub use bus::EventBus;
pub use events::ProcessEvent;
pub use options::{ControlDelays, EarlyTerminationPolicy, ProcessOptions, Verbosity};
pub use persist::{BlackboardObjectRecord, BlackboardRecord, PersistedProcessState};
pub use registry::{ProcessMeta, ProcessRegistry};

use std::collections::BTreeSet;
use std::time::SystemTime;

use agentic_kernel::blackboard::Blackboard;
use agentic_kernel::model::{
    Action, ActionContext, ActionExecutionError, ActionOutcome, Agent, Awaitable, AwaitableResponse,
    CancellationToken, Goal,
};
use agentic_kernel::planner::{PlanOutcome, Planner};
use thiserror::Error;
use uuid::Uuid;

use self::events::action_names;

/// Errors raised by process construction/control that are distinct from a
/// normal terminal status (spec.md §7: process *outcomes* are communicated
/// via [`ProcessStatus`], not exceptions — these are the narrower set of
/// genuine misuse errors, e.g. resuming a process that was never waiting).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProcessError {
    #[error("world state error: {0}")]
    World(#[from] agentic_kernel::world::WorldStateError),

    #[error("blackboard error: {0}")]
    Blackboard(#[from] agentic_kernel::blackboard::BlackboardError),

    #[error("process is not waiting on an awaitable")]
    NotWaiting,

    #[error("process has already reached a terminal status")]
    AlreadyTerminal,
}

/// The five terminal/non-terminal states a process can be in (spec.md §4.5,
/// §7). `Created` and `Running` are transient; the rest are rest states a
/// caller observes once `run`/`resume` returns control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ProcessStatus {
    Created,
    Running,
    Completed,
    Failed,
    Stuck,
    Waiting,
    Terminated,
}

impl ProcessStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ProcessStatus::Completed | ProcessStatus::Failed | ProcessStatus::Stuck | ProcessStatus::Terminated
        )
    }
}

/// Detail recorded alongside a `Failed`/`Stuck`/`Terminated` status (spec.md
/// §6: "persisted-state shape" includes a failure detail string).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct FailureInfo {
    pub detail: String,
}

/// One entry in a process's action history (spec.md §6: persisted state
/// includes the actions executed so far).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ExecutedAction {
    pub action_name: String,
    pub at: SystemTime,
    pub outcome: String,
}

/// The handle an `LlmMediator` (or any other code reached only by process id)
/// uses to emit events and record usage against the right process, without
/// holding a reference to the `AgentProcess` itself.
#[derive(Clone)]
pub struct ProcessContext {
    pub process_id: Uuid,
    pub registry: ProcessRegistry,
    pub events: EventBus,
}

/// A running instance of an [`Agent`] working toward its goals (spec.md
/// §4.4/§4.5). Owns its own [`Blackboard`]; nothing about a process is
/// shared with any other process except the platform-wide [`ProcessRegistry`]
/// and [`EventBus`] handles used to reach it by id.
pub struct AgentProcess {
    id: Uuid,
    agent: Agent,
    blackboard: Blackboard,
    status: ProcessStatus,
    failure: Option<FailureInfo>,
    history: Vec<ExecutedAction>,
    already_executed: BTreeSet<String>,
    /// Signalled to the running action's `ActionContext` — tripped
    /// immediately only under `EarlyTerminationPolicy::CancelImmediately`.
    cancellation: CancellationToken,
    /// Checked at the top of the `run` loop, regardless of policy — always
    /// tripped by `cancel()`, so `LetInFlightFinish` still stops the process
    /// before its next action once the in-flight one completes naturally.
    stop_requested: CancellationToken,
    pending_awaitable: Option<Box<dyn Awaitable>>,
    allow_goal_change: bool,
    /// The goal a plan was first found for, once `!allow_goal_change` has
    /// pinned the process to it (spec.md §6: "replanning may switch goals
    /// mid-process" is the `allow_goal_change` flag's job to forbid).
    committed_goal: Option<String>,
    early_termination: EarlyTerminationPolicy,
    delays: ControlDelays,
    available_tool_groups: Option<BTreeSet<String>>,
    registry: ProcessRegistry,
    events: EventBus,
    planner: Planner,
}

impl AgentProcess {
    /// Creates a new process for `agent`, applying `options`' initial
    /// blackboard bindings and registering it with `registry`/`events` so it
    /// is reachable by id from the LLM/tool mediation layer.
    pub fn new(agent: Agent, mut options: ProcessOptions, registry: ProcessRegistry, events: EventBus) -> Self {
        let id = Uuid::new_v4();
        let mut blackboard = Blackboard::new();
        options.apply_seeds(&mut blackboard);

        registry.register(id, options.budget, options.verbosity, options.test_mode);
        events.publish(ProcessEvent::ProcessCreated {
            process_id: id,
            agent_name: agent.name.clone(),
            at: SystemTime::now(),
        });

        Self {
            id,
            agent,
            blackboard,
            status: ProcessStatus::Created,
            failure: None,
            history: Vec::new(),
            already_executed: BTreeSet::new(),
            cancellation: CancellationToken::new(),
            stop_requested: CancellationToken::new(),
            pending_awaitable: None,
            allow_goal_change: options.allow_goal_change,
            committed_goal: None,
            early_termination: options.early_termination,
            delays: options.delays,
            available_tool_groups: options.available_tool_groups.take(),
            registry,
            events,
            planner: Planner::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn status(&self) -> ProcessStatus {
        self.status
    }

    pub fn failure(&self) -> Option<&FailureInfo> {
        self.failure.as_ref()
    }

    pub fn history(&self) -> &[ExecutedAction] {
        &self.history
    }

    pub fn blackboard(&self) -> &Blackboard {
        &self.blackboard
    }

    pub fn cancellation(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Request cancellation. The process always stops before planning its
    /// next action; whether the in-flight action is itself interrupted
    /// depends on [`EarlyTerminationPolicy`] (spec.md §5): under
    /// `CancelImmediately` the running action's own `CancellationToken` is
    /// tripped too, so a cooperative executor can bail out at its next
    /// suspension point; under the default `LetInFlightFinish` it runs to
    /// natural completion first.
    pub fn cancel(&self) {
        self.stop_requested.cancel();
        if self.early_termination == EarlyTerminationPolicy::CancelImmediately {
            self.cancellation.cancel();
        }
    }

    /// The [`ProcessContext`] handle for this process, to hand to an
    /// `LlmMediator` call from inside an action's executor.
    pub fn context(&self) -> ProcessContext {
        ProcessContext {
            process_id: self.id,
            registry: self.registry.clone(),
            events: self.events.clone(),
        }
    }

    /// A serializable snapshot a caller-supplied store could persist (spec.md
    /// §6). Blackboard objects are recorded by sequence number and type name
    /// only, not their opaque payload — see [`PersistedProcessState`]'s own
    /// documentation for why.
    pub fn to_persisted(&self) -> PersistedProcessState {
        let meta = self.registry.meta(self.id).unwrap_or_default();
        let snapshot = self.blackboard.snapshot();
        let objects = snapshot
            .objects()
            .iter()
            .map(|obj| persist::BlackboardObjectRecord {
                seq: obj.seq(),
                type_name: obj.type_name().to_string(),
            })
            .collect();
        let bindings = snapshot
            .bindings()
            .iter()
            .map(|(name, obj)| (name.clone(), obj.seq()))
            .collect();

        PersistedProcessState {
            process_id: self.id,
            status: self.status,
            failure: self.failure.clone(),
            budget: meta.budget,
            usage: meta.usage,
            verbosity: meta.verbosity,
            test_mode: meta.test_mode,
            allow_goal_change: self.allow_goal_change,
            early_termination: self.early_termination,
            delays: self.delays,
            available_tool_groups: self.available_tool_groups.clone(),
            blackboard: persist::BlackboardRecord { objects, bindings },
            history: self.history.clone(),
            pending_awaitable: self.pending_awaitable.is_some(),
        }
    }

    /// The goals this iteration's plan may target: every goal, unless
    /// `allow_goal_change` is `false` and an earlier iteration already
    /// committed to one, in which case only that goal.
    fn candidate_goals(&self) -> Vec<Goal> {
        if !self.allow_goal_change {
            if let Some(name) = &self.committed_goal {
                if let Some(goal) = self.agent.goal(name) {
                    return vec![goal.clone()];
                }
            }
        }
        self.agent.goals().to_vec()
    }

    /// Pins the process to `goal_name` once a plan has been found for it, if
    /// `allow_goal_change` is `false` and nothing is pinned yet.
    fn commit_goal(&mut self, goal_name: &str) {
        if !self.allow_goal_change && self.committed_goal.is_none() {
            self.committed_goal = Some(goal_name.to_string());
        }
    }

    /// Drives the plan → act → replan loop until the process reaches a
    /// terminal status, suspends on an `Awaitable`, or is cancelled.
    #[tracing::instrument(skip(self), fields(process_id = %self.id, agent = %self.agent.name))]
    pub async fn run(&mut self) -> ProcessStatus {
        if self.status.is_terminal() {
            return self.status;
        }
        self.status = ProcessStatus::Running;

        loop {
            if self.stop_requested.is_cancelled() {
                self.finish(ProcessStatus::Terminated, Some("cancelled".to_string()));
                break;
            }

            let snapshot = self.blackboard.snapshot();
            let world = match agentic_kernel::world::WorldState::evaluate(self.agent.conditions(), &snapshot) {
                Ok(world) => world,
                Err(err) => {
                    self.finish(ProcessStatus::Failed, Some(err.to_string()));
                    break;
                }
            };

            self.events.publish(ProcessEvent::ReadyToPlan {
                process_id: self.id,
                world_state: world.determinations().clone(),
                at: SystemTime::now(),
            });

            let candidate_goals = self.candidate_goals();
            let outcome = self.planner.plan(
                &world,
                &self.agent.planning_system(),
                &candidate_goals,
                &self.already_executed,
                self.available_tool_groups.as_ref(),
            );

            match outcome {
                PlanOutcome::Found(plan) if plan.is_empty() => {
                    self.commit_goal(&plan.goal_name);
                    self.finish(ProcessStatus::Completed, None);
                    break;
                }
                PlanOutcome::Found(plan) => {
                    self.commit_goal(&plan.goal_name);
                    self.events.publish(ProcessEvent::PlanFormulated {
                        process_id: self.id,
                        goal_name: plan.goal_name.clone(),
                        action_names: action_names(&plan.actions),
                        total_cost: plan.total_cost,
                        at: SystemTime::now(),
                    });

                    let action = plan.head().expect("plan.is_empty() was false").clone();

                    self.delay(self.delays.operation_delay_ms).await;

                    if !self.run_action(&action).await {
                        break;
                    }

                    if let Some(reason) = self.registry.record_action(self.id) {
                        self.events.publish(ProcessEvent::BudgetExceeded {
                            process_id: self.id,
                            reason,
                            at: SystemTime::now(),
                        });
                        self.finish(ProcessStatus::Terminated, Some(format!("budget exceeded: {reason:?}")));
                        break;
                    }
                }
                PlanOutcome::NoPlan => {
                    self.events.publish(ProcessEvent::NoPlanFound {
                        process_id: self.id,
                        at: SystemTime::now(),
                    });
                    self.finish(ProcessStatus::Stuck, Some("no reachable plan to any goal".to_string()));
                    break;
                }
            }
        }

        self.status
    }

    /// Sleeps `ms` milliseconds if non-zero (spec.md §6: `control.toolDelay`,
    /// `control.operationDelay` — "pacing for external calls"). A no-op under
    /// the default `ControlDelays`, so production runs pay nothing for this.
    async fn delay(&self, ms: u64) {
        if ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(ms)).await;
        }
    }

    /// Runs one action to completion. Returns `true` if the loop should keep
    /// going, `false` if it already transitioned `self.status` to a terminal
    /// or waiting state and the caller should stop.
    async fn run_action(&mut self, action: &Action) -> bool {
        if !action.tool_groups.is_empty() {
            self.delay(self.delays.tool_delay_ms).await;
        }

        self.events.publish(ProcessEvent::ActionStart {
            process_id: self.id,
            action_name: action.name.clone(),
            at: SystemTime::now(),
        });

        let mut ctx = ActionContext {
            blackboard: &mut self.blackboard,
            process_id: self.id,
            cancellation: self.cancellation.clone(),
        };

        let result = action.executor.run(&mut ctx).await;

        if !action.can_rerun {
            self.already_executed.insert(action.name.clone());
        }

        match result {
            Ok(ActionOutcome::Appended { type_name }) => {
                self.events.publish(ProcessEvent::ObjectAdded {
                    process_id: self.id,
                    type_name: type_name.to_string(),
                    at: SystemTime::now(),
                });
                self.record_history(action, "appended");
                true
            }
            Ok(ActionOutcome::Bound { name, type_name }) => {
                self.events.publish(ProcessEvent::ObjectBound {
                    process_id: self.id,
                    name,
                    type_name: type_name.to_string(),
                    at: SystemTime::now(),
                });
                self.record_history(action, "bound");
                true
            }
            Ok(ActionOutcome::Suspended(awaitable)) => {
                self.record_history(action, &format!("suspended:{}", awaitable.kind()));
                self.pending_awaitable = Some(awaitable);
                self.status = ProcessStatus::Waiting;
                self.events.publish(ProcessEvent::ActionFinish {
                    process_id: self.id,
                    action_name: action.name.clone(),
                    outcome: "waiting".to_string(),
                    at: SystemTime::now(),
                });
                false
            }
            Err(ActionExecutionError::Cancelled) => {
                self.finish(ProcessStatus::Terminated, Some("action cancelled".to_string()));
                false
            }
            Err(err) => {
                self.finish(ProcessStatus::Failed, Some(err.to_string()));
                false
            }
        }
    }

    fn record_history(&mut self, action: &Action, outcome: &str) {
        self.events.publish(ProcessEvent::ActionFinish {
            process_id: self.id,
            action_name: action.name.clone(),
            outcome: outcome.to_string(),
            at: SystemTime::now(),
        });
        self.history.push(ExecutedAction {
            action_name: action.name.clone(),
            at: SystemTime::now(),
            outcome: outcome.to_string(),
        });
    }

    fn finish(&mut self, status: ProcessStatus, detail: Option<String>) {
        self.status = status;
        self.failure = detail.clone().map(|detail| FailureInfo { detail });

        if status == ProcessStatus::Completed {
            self.events.publish(ProcessEvent::ProcessCompleted {
                process_id: self.id,
                at: SystemTime::now(),
            });
        } else {
            self.events.publish(ProcessEvent::ProcessFailed {
                process_id: self.id,
                status,
                failure: self.failure.clone().unwrap_or(FailureInfo {
                    detail: "no detail".to_string(),
                }),
                at: SystemTime::now(),
            });
        }

        if status.is_terminal() {
            self.registry.unregister(self.id);
            self.events.retire(self.id);
        }
    }

    /// Applies an external response to the pending `Awaitable` and resumes
    /// the plan/act loop (spec.md §4.5: suspend/resume). Errs if the process
    /// was not actually `Waiting`.
    pub async fn resume(&mut self, response: AwaitableResponse) -> Result<ProcessStatus, ProcessError> {
        if self.status != ProcessStatus::Waiting {
            return Err(ProcessError::NotWaiting);
        }
        let awaitable = self.pending_awaitable.take().ok_or(ProcessError::NotWaiting)?;
        awaitable.apply_response(response, &mut self.blackboard)?;
        self.status = ProcessStatus::Running;
        Ok(self.run().await)
    }

    pub fn allow_goal_change(&self) -> bool {
        self.allow_goal_change
    }
}
