use std::any::Any;
use std::fmt;

use super::executor::ActionExecutionError;
use crate::blackboard::Blackboard;

/// A value returned by an action that suspends the process pending external
/// input (spec.md §3/§4.5, outcome (c)). This is a *success* with suspend
/// semantics, not an error (spec.md §7).
pub trait Awaitable: Send + Sync + fmt::Debug {
    /// A short, stable kind tag (e.g. `"confirmation"`, `"form"`) surfaced in
    /// the `ProcessWaiting` error variant and in events.
    fn kind(&self) -> &str;

    /// Apply an external response, writing its effect to the blackboard.
    /// Called by the executor's `resume(response)` before re-entering the
    /// plan/act loop (spec.md §4.5).
    fn apply_response(
        &self,
        response: AwaitableResponse,
        blackboard: &mut Blackboard,
    ) -> Result<(), ActionExecutionError>;
}

/// An opaque, type-erased response to a pending [`Awaitable`], supplied by
/// the caller of `AgentProcess::resume`.
pub struct AwaitableResponse(Box<dyn Any + Send + Sync>);

impl AwaitableResponse {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Box::new(value))
    }

    pub fn downcast<T: Any>(self) -> Result<T, Self> {
        match self.0.downcast::<T>() {
            Ok(boxed) => Ok(*boxed),
            Err(other) => Err(Self(other)),
        }
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }
}

impl fmt::Debug for AwaitableResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AwaitableResponse(..)")
    }
}
