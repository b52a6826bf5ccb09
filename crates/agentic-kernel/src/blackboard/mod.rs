//! The per-process typed object store and binding map (spec.md §3/§4.1).
//!
//! A [`Blackboard`] is an ordered sequence of typed, never-mutated objects
//! plus a last-write-wins mapping from binding names to objects. Appending
//! preserves a total order (used by "last of type" queries); bindings never
//! remove an object from the append order, they only add a name to it.

mod object;

pub use object::BlackboardObject;

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while constructing or querying a [`Blackboard`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BlackboardError {
    /// `bind_object` was given an object whose sequence number is not on
    /// this blackboard's append list and cannot be attached retroactively.
    #[error("object with sequence {0} does not belong to this blackboard")]
    ForeignObject(u64),
}

/// An immutable, cheaply-clonable view over a blackboard's contents at one
/// instant, handed to condition evaluators so they observe a consistent
/// snapshot even while the live blackboard keeps mutating.
#[derive(Clone, Debug)]
pub struct BlackboardSnapshot {
    objects: Arc<Vec<BlackboardObject>>,
    bindings: Arc<HashMap<String, BlackboardObject>>,
}

impl BlackboardSnapshot {
    /// The most recently appended object, if any.
    pub fn last(&self) -> Option<&BlackboardObject> {
        self.objects.last()
    }

    /// The most recently appended object assignable to `T`.
    pub fn last_of_type<T: 'static>(&self) -> Option<&T> {
        self.objects
            .iter()
            .rev()
            .find_map(|obj| obj.downcast_ref::<T>())
    }

    /// Whether the most recently appended object is assignable to `T`
    /// ("last result of type T", per spec.md §4.2/§9 — fixed semantics).
    pub fn last_is_type<T: 'static>(&self) -> bool {
        self.objects.last().is_some_and(BlackboardObject::is::<T>)
    }

    /// Every object assignable to `T`, oldest first.
    pub fn all_of_type<T: 'static>(&self) -> Vec<&T> {
        self.objects
            .iter()
            .filter_map(|obj| obj.downcast_ref::<T>())
            .collect()
    }

    /// Whether any object assignable to `T` is present.
    pub fn has_type<T: 'static>(&self) -> bool {
        self.objects.iter().any(BlackboardObject::is::<T>)
    }

    /// Whether any object whose runtime type name equals `type_name` is present.
    /// Used by the planner's synthetic `object-of-type-<T>-present` condition,
    /// which only ever has a type *name* (not a compile-time type) to check
    /// against.
    pub fn has_type_named(&self, type_name: &str) -> bool {
        self.objects.iter().any(|o| o.type_name() == type_name)
    }

    /// Look up a bound name.
    pub fn get(&self, name: &str) -> Option<&BlackboardObject> {
        self.bindings.get(name)
    }

    /// All objects, oldest first.
    pub fn objects(&self) -> &[BlackboardObject] {
        &self.objects
    }

    /// All bindings.
    pub fn bindings(&self) -> &HashMap<String, BlackboardObject> {
        &self.bindings
    }
}

/// The per-process typed object store and binding map.
///
/// Objects are never mutated once appended; "updating" a value means
/// appending a new object and optionally re-binding a name to it.
#[derive(Debug, Default)]
pub struct Blackboard {
    objects: Vec<BlackboardObject>,
    bindings: HashMap<String, BlackboardObject>,
    next_seq: u64,
}

impl Blackboard {
    /// An empty blackboard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new object to the end of the sequence. Does not bind it to
    /// any name. Returns the handle so the caller can later `bind_object` it.
    pub fn append<T>(&mut self, value: T) -> BlackboardObject
    where
        T: Any + Send + Sync + 'static,
    {
        let obj = BlackboardObject::new(self.next_seq, value);
        self.next_seq += 1;
        self.objects.push(obj.clone());
        obj
    }

    /// Append a new object and bind it to `name` in one step. Last-write-wins:
    /// a previous binding of the same name is simply replaced.
    pub fn bind<T>(&mut self, name: impl Into<String>, value: T) -> BlackboardObject
    where
        T: Any + Send + Sync + 'static,
    {
        let obj = self.append(value);
        self.bindings.insert(name.into(), obj.clone());
        obj
    }

    /// Bind `name` to an object handle previously returned by [`Blackboard::append`]
    /// or [`Blackboard::bind`]. Appends it to the sequence first if this
    /// blackboard does not already contain it by identity (sequence number).
    ///
    /// Returns [`BlackboardError::ForeignObject`] if `obj` was minted by a
    /// different blackboard (its sequence number collides with, but does not
    /// match, an object already on this one).
    pub fn bind_object(
        &mut self,
        name: impl Into<String>,
        obj: BlackboardObject,
    ) -> Result<(), BlackboardError> {
        if !self.contains(&obj) {
            return Err(BlackboardError::ForeignObject(obj.seq()));
        }
        self.bindings.insert(name.into(), obj);
        Ok(())
    }

    /// Whether `obj` (by identity, i.e. sequence number) is already present.
    pub fn contains(&self, obj: &BlackboardObject) -> bool {
        self.objects.iter().any(|o| o.seq() == obj.seq())
    }

    /// Look up a bound name.
    pub fn get(&self, name: &str) -> Option<&BlackboardObject> {
        self.bindings.get(name)
    }

    /// Look up a bound name and downcast it to `T`.
    pub fn get_as<T: 'static>(&self, name: &str) -> Option<&T> {
        self.bindings.get(name).and_then(BlackboardObject::downcast_ref::<T>)
    }

    /// The most recently appended object assignable to `T`.
    pub fn last_of_type<T: 'static>(&self) -> Option<&T> {
        self.objects
            .iter()
            .rev()
            .find_map(|obj| obj.downcast_ref::<T>())
    }

    /// Every object assignable to `T`, oldest first (property 1, spec.md §8).
    pub fn all_of_type<T: 'static>(&self) -> Vec<&T> {
        self.objects
            .iter()
            .filter_map(|obj| obj.downcast_ref::<T>())
            .collect()
    }

    /// Number of objects appended so far.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether no objects have been appended.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// An immutable, cheap-to-clone view for passing to condition evaluators.
    pub fn snapshot(&self) -> BlackboardSnapshot {
        BlackboardSnapshot {
            objects: Arc::new(self.objects.clone()),
            bindings: Arc::new(self.bindings.clone()),
        }
    }
}
