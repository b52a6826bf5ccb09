//! The synchronous, `tokio`-free core of the agent execution runtime: the
//! typed [`blackboard`] object store, the [`world`] state/condition layer,
//! the immutable Action/Goal/Agent [`model`], and the GOAP [`planner`].
//!
//! Nothing here depends on an async runtime — suspension is expressed with
//! [`model::Awaitable`] and cancellation with [`model::CancellationToken`],
//! both plain `Send + Sync` types. The stateful plan/act/replan loop, LLM
//! and tool mediation, and everything else that needs `tokio` lives one
//! layer up, in `agentic-runtime`.

pub mod blackboard;
pub mod error;
pub mod model;
pub mod planner;
pub mod world;

pub use error::{KernelError, KernelResult};
