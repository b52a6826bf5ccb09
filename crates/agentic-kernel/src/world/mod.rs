//! WorldState & Conditions (spec.md §4.2).
//!
//! A [`Condition`] is a named, pure predicate over a blackboard snapshot. A
//! [`WorldState`] is the result of evaluating every condition known to an
//! agent against one snapshot, immutable once built, and used both as the
//! planner's search-space node representation and as the input to goal
//! completion checks.

mod builtin;

pub use builtin::{ObjectOfTypePresent, object_present_condition_name};

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::blackboard::BlackboardSnapshot;

/// The three-valued outcome of evaluating a condition (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub enum Determination {
    True,
    False,
    Unknown,
}

impl Determination {
    pub fn is_true(self) -> bool {
        matches!(self, Determination::True)
    }
}

impl fmt::Display for Determination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Determination::True => write!(f, "TRUE"),
            Determination::False => write!(f, "FALSE"),
            Determination::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// A single (condition-name, required-determination) pair used in both
/// `Action::preconditions`/`postconditions` and `Goal::preconditions`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct Precondition {
    pub condition: String,
    pub required: Determination,
}

impl Precondition {
    pub fn new(condition: impl Into<String>, required: Determination) -> Self {
        Self {
            condition: condition.into(),
            required,
        }
    }

    pub fn is_true(condition: impl Into<String>) -> Self {
        Self::new(condition, Determination::True)
    }

    pub fn is_false(condition: impl Into<String>) -> Self {
        Self::new(condition, Determination::False)
    }
}

/// A named, pure predicate over a blackboard snapshot.
///
/// Implementations must be deterministic for a given snapshot (spec.md
/// §4.2). A condition that cannot determine an answer should return
/// `Ok(Determination::Unknown)` rather than erring; `Err` is reserved for
/// genuine evaluator faults (a panic-worthy bug, a malformed input) which the
/// executor degrades to `Unknown` and records as a [`ConditionEvalFailure`].
pub trait Condition: Send + Sync {
    /// The condition's name, used as the key in a [`WorldState`] and in
    /// `Precondition`/postcondition references.
    fn name(&self) -> &str;

    /// Evaluate the condition against a snapshot.
    fn evaluate(&self, snapshot: &BlackboardSnapshot) -> Result<Determination, String>;
}

/// A condition built from a plain closure, for ad-hoc agent definitions that
/// do not warrant a dedicated type.
pub struct FnCondition<F> {
    name: String,
    f: F,
}

impl<F> FnCondition<F>
where
    F: Fn(&BlackboardSnapshot) -> Result<Determination, String> + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self { name: name.into(), f }
    }
}

impl<F> Condition for FnCondition<F>
where
    F: Fn(&BlackboardSnapshot) -> Result<Determination, String> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, snapshot: &BlackboardSnapshot) -> Result<Determination, String> {
        (self.f)(snapshot)
    }
}

/// A condition evaluator failure recorded on a [`WorldState`] rather than
/// bubbled up as a hard error (spec.md §4.2, §7: "Condition evaluator errors
/// do not fail the process; they degrade that condition to UNKNOWN").
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ConditionEvalFailure {
    pub condition: String,
    pub cause: String,
}

/// Errors raised while constructing or querying world state that are *not*
/// per-condition evaluator faults (those degrade to [`ConditionEvalFailure`]
/// instead of this type).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WorldStateError {
    /// Two distinct conditions registered on an agent share a name, making
    /// the world state map ambiguous.
    #[error("duplicate condition name: {0}")]
    DuplicateCondition(String),
}

/// An immutable map from condition-name to determination, produced by
/// evaluating every known condition against one blackboard snapshot
/// (spec.md §3).
#[derive(Debug, Clone, Default)]
pub struct WorldState {
    determinations: BTreeMap<String, Determination>,
    failures: Vec<ConditionEvalFailure>,
}

impl WorldState {
    /// Evaluate every condition against `snapshot`, collecting failures
    /// rather than propagating them.
    pub fn evaluate(
        conditions: &[Arc<dyn Condition>],
        snapshot: &BlackboardSnapshot,
    ) -> Result<Self, WorldStateError> {
        let mut determinations = BTreeMap::new();
        let mut failures = Vec::new();
        let mut seen = std::collections::HashSet::new();

        for condition in conditions {
            if !seen.insert(condition.name().to_string()) {
                return Err(WorldStateError::DuplicateCondition(condition.name().to_string()));
            }
            match condition.evaluate(snapshot) {
                Ok(determination) => {
                    determinations.insert(condition.name().to_string(), determination);
                }
                Err(cause) => {
                    determinations.insert(condition.name().to_string(), Determination::Unknown);
                    failures.push(ConditionEvalFailure {
                        condition: condition.name().to_string(),
                        cause,
                    });
                }
            }
        }

        Ok(Self {
            determinations,
            failures,
        })
    }

    /// Build a world state directly from a map of determinations (used by
    /// the planner to construct successor search nodes).
    pub fn from_map(determinations: BTreeMap<String, Determination>) -> Self {
        Self {
            determinations,
            failures: Vec::new(),
        }
    }

    /// The determination of `condition`, defaulting to `Unknown` if it was
    /// never evaluated/set.
    pub fn get(&self, condition: &str) -> Determination {
        self.determinations
            .get(condition)
            .copied()
            .unwrap_or(Determination::Unknown)
    }

    /// Whether every precondition in `preconditions` holds exactly (its
    /// required determination matches what this state has for that name).
    pub fn satisfies(&self, preconditions: &std::collections::BTreeSet<Precondition>) -> bool {
        preconditions
            .iter()
            .all(|p| self.get(&p.condition) == p.required)
    }

    /// Whether any precondition in `preconditions` is definitely contradicted
    /// (this state has a *known*, different determination for that name).
    /// Unknown preconditions are not considered contradicted.
    pub fn contradicts(&self, preconditions: &std::collections::BTreeSet<Precondition>) -> bool {
        preconditions.iter().any(|p| {
            let actual = self.get(&p.condition);
            actual != Determination::Unknown && actual != p.required
        })
    }

    /// Overlay `postconditions` onto this state, producing a successor node.
    pub fn overlay(&self, postconditions: &std::collections::BTreeSet<Precondition>) -> Self {
        let mut determinations = self.determinations.clone();
        for p in postconditions {
            determinations.insert(p.condition.clone(), p.required);
        }
        Self {
            determinations,
            failures: Vec::new(),
        }
    }

    /// The full map, for serialization/inspection (e.g. the `ReadyToPlan` event).
    pub fn determinations(&self) -> &BTreeMap<String, Determination> {
        &self.determinations
    }

    /// Condition evaluator failures recorded during [`WorldState::evaluate`].
    pub fn failures(&self) -> &[ConditionEvalFailure] {
        &self.failures
    }
}

impl PartialEq for WorldState {
    fn eq(&self, other: &Self) -> bool {
        self.determinations == other.determinations
    }
}
impl Eq for WorldState {}

impl std::hash::Hash for WorldState {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        for (k, v) in &self.determinations {
            k.hash(state);
            v.hash(state);
        }
    }
}
