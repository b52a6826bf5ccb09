//! The immutable Action/Goal/Agent value model (spec.md §3/§4.4) plus the
//! small set of supporting types an `Action`'s opaque executor needs:
//! [`ActionContext`], [`ActionOutcome`], [`Awaitable`]/[`AwaitableResponse`],
//! and [`CancellationToken`].

mod awaitable;
mod cancellation;
mod executor;

pub use awaitable::{Awaitable, AwaitableResponse};
pub use cancellation::CancellationToken;
pub use executor::{ActionContext, ActionExecutionError, ActionExecutor, ActionOutcome};

use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;

use crate::world::{Condition, Precondition};

/// Errors raised while constructing or validating Action/Goal/Agent values.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AgentModelError {
    #[error("agent '{agent}' has no goal named '{goal}'")]
    UnknownGoal { agent: String, goal: String },

    #[error("action cost must be non-negative, got {0}")]
    NegativeCost(f64),

    #[error("action value must be non-negative, got {0}")]
    NegativeValue(f64),
}

/// Immutable record of a unit of work the planner may schedule (spec.md §3).
#[derive(Clone)]
pub struct Action {
    pub name: String,
    pub description: String,
    pub preconditions: BTreeSet<Precondition>,
    pub postconditions: BTreeSet<Precondition>,
    pub cost: f64,
    pub value: f64,
    pub can_rerun: bool,
    pub input_types: Option<Vec<String>>,
    pub output_type: Option<String>,
    pub tool_groups: BTreeSet<String>,
    pub executor: Arc<dyn ActionExecutor>,
}

impl std::fmt::Debug for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Action")
            .field("name", &self.name)
            .field("cost", &self.cost)
            .field("value", &self.value)
            .field("can_rerun", &self.can_rerun)
            .field("tool_groups", &self.tool_groups)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Action`], mirroring the fluent `with_*` style used
/// throughout this workspace for immutable value construction.
pub struct ActionBuilder {
    name: String,
    description: String,
    preconditions: BTreeSet<Precondition>,
    postconditions: BTreeSet<Precondition>,
    cost: f64,
    value: f64,
    can_rerun: bool,
    input_types: Option<Vec<String>>,
    output_type: Option<String>,
    tool_groups: BTreeSet<String>,
}

impl ActionBuilder {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            preconditions: BTreeSet::new(),
            postconditions: BTreeSet::new(),
            cost: 1.0,
            value: 0.0,
            can_rerun: true,
            input_types: None,
            output_type: None,
            tool_groups: BTreeSet::new(),
        }
    }

    pub fn requires(mut self, precondition: Precondition) -> Self {
        self.preconditions.insert(precondition);
        self
    }

    pub fn produces(mut self, postcondition: Precondition) -> Self {
        self.postconditions.insert(postcondition);
        self
    }

    pub fn cost(mut self, cost: f64) -> Self {
        self.cost = cost;
        self
    }

    pub fn value(mut self, value: f64) -> Self {
        self.value = value;
        self
    }

    pub fn can_rerun(mut self, can_rerun: bool) -> Self {
        self.can_rerun = can_rerun;
        self
    }

    pub fn output_type(mut self, output_type: impl Into<String>) -> Self {
        self.output_type = Some(output_type.into());
        self
    }

    pub fn input_types(mut self, input_types: Vec<String>) -> Self {
        self.input_types = Some(input_types);
        self
    }

    pub fn tool_group(mut self, name: impl Into<String>) -> Self {
        self.tool_groups.insert(name.into());
        self
    }

    pub fn build(self, executor: Arc<dyn ActionExecutor>) -> Result<Action, AgentModelError> {
        if self.cost < 0.0 {
            return Err(AgentModelError::NegativeCost(self.cost));
        }
        if self.value < 0.0 {
            return Err(AgentModelError::NegativeValue(self.value));
        }
        Ok(Action {
            name: self.name,
            description: self.description,
            preconditions: self.preconditions,
            postconditions: self.postconditions,
            cost: self.cost,
            value: self.value,
            can_rerun: self.can_rerun,
            input_types: self.input_types,
            output_type: self.output_type,
            tool_groups: self.tool_groups,
            executor,
        })
    }
}

/// Immutable record of a target state the planner can search toward
/// (spec.md §3). Unlike [`Action`]/[`Agent`], a `Goal` carries no opaque
/// executor or condition trait object, so it derives `Serialize`/
/// `Deserialize` directly (spec.md §3's expanded "crosses a process
/// boundary" requirement).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Goal {
    pub name: String,
    pub description: String,
    pub preconditions: BTreeSet<Precondition>,
    /// The output type whose presence on the blackboard means success, as a
    /// `std::any::type_name`-style string (matched against
    /// `object_present_condition_name`).
    pub satisfied_by: Option<String>,
    pub output_class: Option<String>,
}

impl Goal {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            preconditions: BTreeSet::new(),
            satisfied_by: None,
            output_class: None,
        }
    }

    pub fn requires(mut self, precondition: Precondition) -> Self {
        self.preconditions.insert(precondition);
        self
    }

    pub fn satisfied_by_type(mut self, type_name: impl Into<String>) -> Self {
        self.satisfied_by = Some(type_name.into());
        self
    }

    /// The synthetic condition name the planner/goal-test checks when
    /// `satisfied_by` is set (spec.md §9's resolved Open Question).
    pub fn satisfied_by_condition_name(&self) -> Option<String> {
        self.satisfied_by
            .as_deref()
            .map(crate::world::object_present_condition_name)
    }
}

/// A named bundle of actions, conditions, and goals forming a self-contained
/// plan space (spec.md §3/§4.4).
#[derive(Clone)]
pub struct Agent {
    pub name: String,
    actions: Vec<Action>,
    conditions: Vec<Arc<dyn Condition>>,
    goals: Vec<Goal>,
}

/// The (actions, conditions) view the planner consumes, without the goal
/// list (spec.md §4.4: `planningSystem()`).
#[derive(Clone)]
pub struct PlanningSystem {
    pub actions: Vec<Action>,
    pub conditions: Vec<Arc<dyn Condition>>,
}

impl Agent {
    pub fn new(
        name: impl Into<String>,
        actions: Vec<Action>,
        conditions: Vec<Arc<dyn Condition>>,
        goals: Vec<Goal>,
    ) -> Self {
        Self {
            name: name.into(),
            actions,
            conditions,
            goals,
        }
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn conditions(&self) -> &[Arc<dyn Condition>] {
        &self.conditions
    }

    pub fn goals(&self) -> &[Goal] {
        &self.goals
    }

    pub fn goal(&self, name: &str) -> Option<&Goal> {
        self.goals.iter().find(|g| g.name == name)
    }

    /// Actions reachable via `crate::planner::Planner::prune`'s reachability
    /// closure, discarding all others (spec.md §4.3 "Pruning").
    pub fn with_actions(&self, actions: Vec<Action>) -> Self {
        Self {
            name: self.name.clone(),
            actions,
            conditions: self.conditions.clone(),
            goals: self.goals.clone(),
        }
    }

    /// A copy restricted to one named goal (spec.md §4.4).
    pub fn with_single_goal(&self, goal_name: &str) -> Result<Self, AgentModelError> {
        let goal = self
            .goal(goal_name)
            .cloned()
            .ok_or_else(|| AgentModelError::UnknownGoal {
                agent: self.name.clone(),
                goal: goal_name.to_string(),
            })?;
        Ok(Self {
            name: self.name.clone(),
            actions: self.actions.clone(),
            conditions: self.conditions.clone(),
            goals: vec![goal],
        })
    }

    /// The (actions, conditions) view the planner consumes.
    pub fn planning_system(&self) -> PlanningSystem {
        PlanningSystem {
            actions: self.actions.clone(),
            conditions: self.conditions.clone(),
        }
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("actions", &self.actions.iter().map(|a| &a.name).collect::<Vec<_>>())
            .field("goals", &self.goals.iter().map(|g| &g.name).collect::<Vec<_>>())
            .finish()
    }
}
