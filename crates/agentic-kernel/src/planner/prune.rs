use crate::model::Action;
use crate::world::WorldState;

/// Discard actions that can never fire from `start`, however the others are
/// sequenced (spec.md §4.3 "Pruning", invariant 7: pruning soundness).
///
/// This is a forward-reachability fixpoint over an optimistic, relaxed world
/// state: starting from `start`, repeatedly admit any not-yet-admitted
/// action whose preconditions the accumulated state already satisfies, then
/// overlay its postconditions onto that state and try again, until a pass
/// admits nothing new. An action survives if *some* sequencing of the
/// admitted actions could make it fire — not just the one sequencing any
/// single goal's optimal plan happens to use. Goal-blind on purpose: a
/// goal-specific union of optimal plans would risk discarding an action that
/// only a non-optimal (but still valid) plan relies on, which would violate
/// soundness.
pub fn prune_actions(start: &WorldState, actions: &[Action]) -> Vec<Action> {
    let mut state = start.clone();
    let mut kept: Vec<Action> = Vec::new();
    let mut remaining: Vec<&Action> = actions.iter().collect();

    loop {
        let mut admitted_this_pass = Vec::new();
        remaining.retain(|action| {
            if state.satisfies(&action.preconditions) {
                admitted_this_pass.push(*action);
                false
            } else {
                true
            }
        });

        if admitted_this_pass.is_empty() {
            break;
        }

        for action in &admitted_this_pass {
            state = state.overlay(&action.postconditions);
            kept.push((*action).clone());
        }
    }

    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ActionBuilder, ActionContext, ActionExecutionError, ActionExecutor, ActionOutcome};
    use crate::world::{Determination, Precondition};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct Noop;
    #[async_trait]
    impl ActionExecutor for Noop {
        async fn run(&self, _ctx: &mut ActionContext<'_>) -> Result<ActionOutcome, ActionExecutionError> {
            Ok(ActionOutcome::Appended { type_name: "noop" })
        }
    }

    fn action(name: &str, requires: &[&str], produces: &[&str]) -> Action {
        let mut builder = ActionBuilder::new(name, name);
        for r in requires {
            builder = builder.requires(Precondition::is_true(*r));
        }
        for p in produces {
            builder = builder.produces(Precondition::is_true(*p));
        }
        builder.build(Arc::new(Noop)).unwrap()
    }

    #[test]
    fn keeps_chained_reachable_actions() {
        let a = action("a", &[], &["x"]);
        let b = action("b", &["x"], &["y"]);
        let c = action("c", &["never"], &["z"]);

        let kept = prune_actions(&WorldState::default(), &[a, b, c]);
        let names: Vec<&str> = kept.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn keeps_an_action_useful_to_a_non_optimal_plan() {
        // `direct` alone satisfies any goal needing `done`; `via_detour` is a
        // costlier alternate route to the same postcondition through `mid`.
        // Pruning must not discard `via_detour` just because `direct` is
        // cheaper — soundness is about reachability, not optimality.
        let direct = action("direct", &[], &["done"]);
        let detour_start = action("detour-start", &[], &["mid"]);
        let via_detour = action("via-detour", &["mid"], &["done"]);

        let kept = prune_actions(&WorldState::default(), &[direct, detour_start, via_detour]);
        let names: std::collections::BTreeSet<&str> = kept.iter().map(|a| a.name.as_str()).collect();
        assert!(names.contains("direct"));
        assert!(names.contains("detour-start"));
        assert!(names.contains("via-detour"));
    }

    #[test]
    fn starting_state_conditions_seed_reachability() {
        let already_known = {
            let mut map = std::collections::BTreeMap::new();
            map.insert("have-key".to_string(), Determination::True);
            WorldState::from_map(map)
        };
        let unlock = action("unlock", &["have-key"], &["unlocked"]);

        let kept = prune_actions(&already_known, &[unlock]);
        assert_eq!(kept.len(), 1);
    }
}
