//! The GOAP A* planner (spec.md §4.3).
//!
//! Given a current [`WorldState`], a set of [`Action`]s and [`Goal`]s, the
//! planner searches the space of world states reachable by applying
//! actions' postconditions, and returns the lowest-cost [`Plan`] to any
//! reachable goal (or [`PlanOutcome::NoPlan`]).

mod key;
mod prune;

pub use prune::prune_actions;

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use thiserror::Error;

use crate::model::{Action, Goal, PlanningSystem};
use crate::world::{Precondition, WorldState};
use key::SearchKey;

/// Errors raised by the planner that indicate a programming mistake (an
/// unreachable query), not a planning failure — planning failure is
/// [`PlanOutcome::NoPlan`], a normal result, not an error.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PlannerError {
    #[error("no goal named '{0}' in the supplied goal set")]
    UnknownGoal(String),
}

/// A finite, ordered sequence of actions from a world state to a goal, with
/// total cost (spec.md §3).
#[derive(Debug, Clone)]
pub struct Plan {
    pub goal_name: String,
    pub actions: Vec<Action>,
    pub total_cost: f64,
    pub total_value: f64,
}

impl Plan {
    /// The first action — the one the executor runs next (spec.md §3).
    pub fn head(&self) -> Option<&Action> {
        self.actions.first()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    fn action_names(&self) -> Vec<&str> {
        self.actions.iter().map(|a| a.name.as_str()).collect()
    }
}

/// The result of a planning attempt.
#[derive(Debug, Clone)]
pub enum PlanOutcome {
    Found(Plan),
    NoPlan,
}

impl PlanOutcome {
    pub fn into_plan(self) -> Option<Plan> {
        match self {
            PlanOutcome::Found(plan) => Some(plan),
            PlanOutcome::NoPlan => None,
        }
    }
}

/// Stateless GOAP A* planner. All the actual state lives in the arguments to
/// [`Planner::plan`]; the type exists to give the algorithm a name and a
/// place to hang documentation and tests, mirroring how this workspace
/// gives even pure-function subsystems a unit struct + inherent methods
/// rather than free functions.
#[derive(Debug, Default, Clone, Copy)]
pub struct Planner;

impl Planner {
    pub fn new() -> Self {
        Self
    }

    /// Find the lowest-cost plan from `world_state` to any goal in `goals`,
    /// using `system`'s actions (spec.md §4.3).
    ///
    /// `already_executed` excludes `can_rerun == false` actions that have
    /// run earlier in this process (spec.md §4.3 edge case). `available_tool_groups`,
    /// when `Some`, excludes actions requiring a tool group not in the set
    /// (`None` means every tool group is available).
    pub fn plan(
        &self,
        world_state: &WorldState,
        system: &PlanningSystem,
        goals: &[Goal],
        already_executed: &std::collections::BTreeSet<String>,
        available_tool_groups: Option<&std::collections::BTreeSet<String>>,
    ) -> PlanOutcome {
        let candidate_actions: Vec<&Action> = system
            .actions
            .iter()
            .filter(|a| a.can_rerun || !already_executed.contains(&a.name))
            .filter(|a| {
                available_tool_groups
                    .map(|available| a.tool_groups.is_subset(available))
                    .unwrap_or(true)
            })
            .collect();

        let mut best: Option<Plan> = None;

        for goal in goals {
            if world_state.contradicts(&goal.preconditions) {
                continue;
            }
            if let Some(plan) = self.search_one_goal(world_state, &candidate_actions, goal) {
                best = Some(match best {
                    None => plan,
                    Some(current_best) => pick_better(current_best, plan),
                });
            }
        }

        match best {
            Some(plan) => PlanOutcome::Found(plan),
            None => PlanOutcome::NoPlan,
        }
    }

    /// Plan toward a single, named goal. Convenience wrapper that also
    /// accepts "goal not found" as a hard error, for callers (like
    /// `Agent::with_single_goal` callers) who already know the goal should
    /// exist.
    pub fn plan_for_goal(
        &self,
        world_state: &WorldState,
        system: &PlanningSystem,
        goals: &[Goal],
        goal_name: &str,
        already_executed: &std::collections::BTreeSet<String>,
        available_tool_groups: Option<&std::collections::BTreeSet<String>>,
    ) -> Result<PlanOutcome, PlannerError> {
        let goal = goals
            .iter()
            .find(|g| g.name == goal_name)
            .ok_or_else(|| PlannerError::UnknownGoal(goal_name.to_string()))?;
        Ok(self.plan(
            world_state,
            system,
            std::slice::from_ref(goal),
            already_executed,
            available_tool_groups,
        ))
    }

    fn search_one_goal(
        &self,
        start: &WorldState,
        actions: &[&Action],
        goal: &Goal,
    ) -> Option<Plan> {
        let goal_preconditions = effective_goal_preconditions(goal);

        if start.satisfies(&goal_preconditions) {
            return Some(Plan {
                goal_name: goal.name.clone(),
                actions: vec![],
                total_cost: 0.0,
                total_value: 0.0,
            });
        }

        let mut open: BinaryHeap<Reverse<SearchKey>> = BinaryHeap::new();
        let mut best_g: HashMap<WorldState, f64> = HashMap::new();

        let h0 = unmet_count(start, &goal_preconditions);
        best_g.insert(start.clone(), 0.0);
        open.push(Reverse(SearchKey::new(0.0, h0 as f64, vec![], start.clone())));

        // Actions considered in a fixed, deterministic order at every expansion.
        let mut ordered_actions: Vec<&Action> = actions.to_vec();
        ordered_actions.sort_by(|a, b| a.name.cmp(&b.name));

        while let Some(Reverse(node)) = open.pop() {
            if node.g > *best_g.get(&node.state).unwrap_or(&f64::INFINITY) {
                continue; // stale entry, a cheaper path to this state was already found
            }
            if node.state.satisfies(&goal_preconditions) {
                let actions_by_name: HashMap<&str, &Action> =
                    ordered_actions.iter().map(|a| (a.name.as_str(), *a)).collect();
                let actions: Vec<Action> = node
                    .path
                    .iter()
                    .map(|name| actions_by_name[name.as_str()].clone())
                    .collect();
                let total_value: f64 = actions.iter().map(|a| a.value).sum();
                return Some(Plan {
                    goal_name: goal.name.clone(),
                    total_cost: node.g,
                    total_value,
                    actions,
                });
            }

            for action in &ordered_actions {
                if !node.state.satisfies(&action.preconditions) {
                    continue;
                }
                let effective_post = effective_postconditions(action, goal);
                let successor = node.state.overlay(&effective_post);
                let tentative_g = node.g + action.cost;

                let is_better = tentative_g < *best_g.get(&successor).unwrap_or(&f64::INFINITY);
                if is_better {
                    best_g.insert(successor.clone(), tentative_g);
                    let mut path = node.path.clone();
                    path.push(action.name.clone());
                    let h = unmet_count(&successor, &goal_preconditions) as f64;
                    open.push(Reverse(SearchKey::new(tentative_g, h, path, successor)));
                }
            }
        }

        None
    }
}

/// Goal preconditions plus the synthetic `object-of-type-<T>-present`
/// condition when `satisfied_by` is set (spec.md §9's resolved Open
/// Question).
fn effective_goal_preconditions(goal: &Goal) -> std::collections::BTreeSet<Precondition> {
    let mut preconditions = goal.preconditions.clone();
    if let Some(condition) = goal.satisfied_by_condition_name() {
        preconditions.insert(Precondition::is_true(condition));
    }
    preconditions
}

/// An action's postconditions, plus the synthetic `object-of-type-<T>-present`
/// postcondition when the action's declared `output_type` matches the
/// goal's `satisfied_by` type.
fn effective_postconditions(action: &Action, goal: &Goal) -> std::collections::BTreeSet<Precondition> {
    let mut post = action.postconditions.clone();
    if let (Some(satisfied_by), Some(condition)) =
        (&goal.satisfied_by, goal.satisfied_by_condition_name())
    {
        if action.output_type.as_deref() == Some(satisfied_by.as_str()) {
            post.insert(Precondition::is_true(condition));
        }
    }
    post
}

fn unmet_count(state: &WorldState, preconditions: &std::collections::BTreeSet<Precondition>) -> usize {
    preconditions
        .iter()
        .filter(|p| state.get(&p.condition) != p.required)
        .count()
}

/// Pick the better of two complete plans to (possibly different) goals,
/// using the spec's tie-break order (spec.md §4.3 step 2): lowest total
/// cost; then highest sum of action value; then shortest length; then
/// lexicographic on action names.
fn pick_better(a: Plan, b: Plan) -> Plan {
    use std::cmp::Ordering;

    let ordering = a
        .total_cost
        .partial_cmp(&b.total_cost)
        .unwrap_or(Ordering::Equal)
        .then_with(|| b.total_value.partial_cmp(&a.total_value).unwrap_or(Ordering::Equal))
        .then_with(|| a.actions.len().cmp(&b.actions.len()))
        .then_with(|| a.action_names().cmp(&b.action_names()));

    if ordering == Ordering::Greater {
        b
    } else {
        a
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ActionBuilder, ActionContext, ActionExecutionError, ActionExecutor, ActionOutcome};
    use crate::world::Determination;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct Noop;
    #[async_trait]
    impl ActionExecutor for Noop {
        async fn run(&self, _ctx: &mut ActionContext<'_>) -> Result<ActionOutcome, ActionExecutionError> {
            Ok(ActionOutcome::Appended { type_name: "noop" })
        }
    }

    fn action(name: &str, cost: f64, requires: &[&str], produces: &[&str]) -> Action {
        let mut builder = ActionBuilder::new(name, name).cost(cost);
        for r in requires {
            builder = builder.requires(Precondition::is_true(*r));
        }
        for p in produces {
            builder = builder.produces(Precondition::is_true(*p));
        }
        builder.build(Arc::new(Noop)).unwrap()
    }

    fn ws(pairs: &[(&str, Determination)]) -> WorldState {
        let mut map = std::collections::BTreeMap::new();
        for (k, v) in pairs {
            map.insert(k.to_string(), *v);
        }
        WorldState::from_map(map)
    }

    #[test]
    fn plans_a_simple_two_step_chain() {
        let a = action("gather", 1.0, &[], &["have-data"]);
        let b = action("writeup", 1.0, &["have-data"], &["done"]);
        let system = PlanningSystem {
            actions: vec![a, b],
            conditions: vec![],
        };
        let goal = Goal::new("finish", "finish").requires(Precondition::is_true("done"));

        let outcome = Planner::new().plan(
            &WorldState::default(),
            &system,
            &[goal],
            &Default::default(),
            None,
        );
        let plan = outcome.into_plan().expect("a plan should be found");
        assert_eq!(plan.action_names(), vec!["gather", "writeup"]);
        assert_eq!(plan.total_cost, 2.0);
    }

    #[test]
    fn returns_no_plan_when_unreachable() {
        let a = action("irrelevant", 1.0, &["never-true"], &["done"]);
        let system = PlanningSystem {
            actions: vec![a],
            conditions: vec![],
        };
        let goal = Goal::new("finish", "finish").requires(Precondition::is_true("done"));

        let outcome = Planner::new().plan(
            &WorldState::default(),
            &system,
            &[goal],
            &Default::default(),
            None,
        );
        assert!(matches!(outcome, PlanOutcome::NoPlan));
    }

    #[test]
    fn picks_cheapest_plan_across_two_paths() {
        let cheap = action("cheap-path", 1.0, &[], &["done"]);
        let expensive_a = action("expensive-a", 5.0, &[], &["mid"]);
        let expensive_b = action("expensive-b", 5.0, &["mid"], &["done"]);
        let system = PlanningSystem {
            actions: vec![cheap, expensive_a, expensive_b],
            conditions: vec![],
        };
        let goal = Goal::new("finish", "finish").requires(Precondition::is_true("done"));

        let outcome = Planner::new().plan(
            &WorldState::default(),
            &system,
            &[goal],
            &Default::default(),
            None,
        );
        let plan = outcome.into_plan().unwrap();
        assert_eq!(plan.action_names(), vec!["cheap-path"]);
        assert_eq!(plan.total_cost, 1.0);
    }

    #[test]
    fn deterministic_across_repeated_calls() {
        let a = action("a", 1.0, &[], &["mid"]);
        let b = action("b", 1.0, &["mid"], &["done"]);
        let system = PlanningSystem {
            actions: vec![a, b],
            conditions: vec![],
        };
        let goal = Goal::new("finish", "finish").requires(Precondition::is_true("done"));

        let first = Planner::new()
            .plan(&WorldState::default(), &system, &[goal.clone()], &Default::default(), None)
            .into_plan()
            .unwrap();
        let second = Planner::new()
            .plan(&WorldState::default(), &system, &[goal], &Default::default(), None)
            .into_plan()
            .unwrap();
        assert_eq!(first.action_names(), second.action_names());
        assert_eq!(first.total_cost, second.total_cost);
    }

    #[test]
    fn already_executed_non_rerunnable_action_is_excluded() {
        let once = ActionBuilder::new("once", "once")
            .produces(Precondition::is_true("done"))
            .can_rerun(false)
            .build(Arc::new(Noop))
            .unwrap();
        let system = PlanningSystem {
            actions: vec![once],
            conditions: vec![],
        };
        let goal = Goal::new("finish", "finish").requires(Precondition::is_true("done"));
        let mut already = std::collections::BTreeSet::new();
        already.insert("once".to_string());

        let outcome = Planner::new().plan(&WorldState::default(), &system, &[goal], &already, None);
        assert!(matches!(outcome, PlanOutcome::NoPlan));
    }

    #[test]
    fn missing_tool_group_excludes_action() {
        let gated = ActionBuilder::new("gated", "gated")
            .produces(Precondition::is_true("done"))
            .tool_group("search")
            .build(Arc::new(Noop))
            .unwrap();
        let system = PlanningSystem {
            actions: vec![gated],
            conditions: vec![],
        };
        let goal = Goal::new("finish", "finish").requires(Precondition::is_true("done"));

        let no_tools = std::collections::BTreeSet::new();
        let outcome = Planner::new().plan(&WorldState::default(), &system, &[goal.clone()], &Default::default(), Some(&no_tools));
        assert!(matches!(outcome, PlanOutcome::NoPlan));

        let mut with_tools = std::collections::BTreeSet::new();
        with_tools.insert("search".to_string());
        let outcome = Planner::new().plan(&WorldState::default(), &system, &[goal], &Default::default(), Some(&with_tools));
        assert!(outcome.into_plan().is_some());
    }

    #[test]
    fn satisfied_by_uses_synthetic_condition() {
        struct WriteupType;
        let _ = WriteupType; // marker only, used for naming below

        let produce = ActionBuilder::new("produce", "produce")
            .output_type("Writeup")
            .build(Arc::new(Noop))
            .unwrap();
        let system = PlanningSystem {
            actions: vec![produce],
            conditions: vec![],
        };
        let goal = Goal::new("finish", "finish").satisfied_by_type("Writeup");

        let outcome = Planner::new().plan(&WorldState::default(), &system, &[goal], &Default::default(), None);
        let plan = outcome.into_plan().expect("producing the right output type should satisfy the goal");
        assert_eq!(plan.action_names(), vec!["produce"]);
    }

    #[test]
    fn empty_plan_when_goal_already_satisfied() {
        let system = PlanningSystem {
            actions: vec![],
            conditions: vec![],
        };
        let goal = Goal::new("finish", "finish").requires(Precondition::is_true("done"));
        let state = ws(&[("done", Determination::True)]);

        let outcome = Planner::new().plan(&state, &system, &[goal], &Default::default(), None);
        let plan = outcome.into_plan().unwrap();
        assert!(plan.is_empty());
        assert_eq!(plan.total_cost, 0.0);
    }
}
