use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// A single typed value appended to a [`super::Blackboard`].
///
/// Cloning an object is an `Arc` bump, not a deep copy, so
/// [`super::Blackboard::snapshot`] stays cheap even with large payloads.
/// Identity (used by "contains"/"already present" checks) is the
/// append-order sequence number, not the payload's address.
#[derive(Clone)]
pub struct BlackboardObject {
    seq: u64,
    type_id: TypeId,
    type_name: &'static str,
    value: Arc<dyn Any + Send + Sync>,
}

impl BlackboardObject {
    pub(super) fn new<T>(seq: u64, value: T) -> Self
    where
        T: Any + Send + Sync + 'static,
    {
        Self {
            seq,
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            value: Arc::new(value),
        }
    }

    /// The append-order sequence number assigned when this object was created.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// The `std::any::type_name` of the value wrapped by this object.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Whether the wrapped value is assignable to `T`.
    pub fn is<T: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    /// Borrow the wrapped value as `T`, if it is one.
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

}

impl fmt::Debug for BlackboardObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlackboardObject")
            .field("seq", &self.seq)
            .field("type_name", &self.type_name)
            .finish()
    }
}
