//! The two "special computed conditions" named in spec.md §4.2: "last result
//! of type T" and "object of type T present".

use std::marker::PhantomData;

use super::{Condition, Determination};
use crate::blackboard::BlackboardSnapshot;

/// The canonical condition name for "an object of type `type_name` is
/// present on the blackboard". Shared between [`ObjectOfTypePresent`] and
/// the planner's synthetic-condition machinery so both sides agree on the
/// exact string (spec.md §9's resolved Open Question: `satisfiedBy` is
/// modeled as this condition by name).
pub fn object_present_condition_name(type_name: &str) -> String {
    format!("object-of-type-{type_name}-present")
}

/// "Object of type T present" = true iff the blackboard contains any object
/// assignable to `T` (spec.md §4.2).
pub struct ObjectOfTypePresent<T> {
    name: String,
    type_name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T: 'static> ObjectOfTypePresent<T> {
    pub fn new() -> Self {
        let type_name = std::any::type_name::<T>();
        Self {
            name: object_present_condition_name(type_name),
            type_name,
            _marker: PhantomData,
        }
    }
}

impl<T: 'static> Default for ObjectOfTypePresent<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + Sync + 'static> Condition for ObjectOfTypePresent<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, snapshot: &BlackboardSnapshot) -> Result<Determination, String> {
        Ok(if snapshot.has_type_named(self.type_name) {
            Determination::True
        } else {
            Determination::False
        })
    }
}

/// "Last result of type T" = true iff the most recently appended object on
/// the blackboard is assignable to `T` (spec.md §9's resolved Open Question:
/// two subtly different implementations coexisted in the source; this fixes
/// the semantics to "most recently *appended*", not "most recently bound").
pub struct LastResultOfType<T> {
    name: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T: 'static> LastResultOfType<T> {
    pub fn new() -> Self {
        Self {
            name: format!("last-result-of-type-{}", std::any::type_name::<T>()),
            _marker: PhantomData,
        }
    }
}

impl<T: 'static> Default for LastResultOfType<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + Sync + 'static> Condition for LastResultOfType<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, snapshot: &BlackboardSnapshot) -> Result<Determination, String> {
        Ok(if snapshot.last_is_type::<T>() {
            Determination::True
        } else {
            Determination::False
        })
    }
}
