//! The `tokio`-flavored half of the agent execution runtime: the stateful
//! [`process`] plan/act/replan loop (C5), [`llm`] mediation (C6), the
//! [`ranker`] (C7), [`autonomy`] (C8), and the [`platform`] façade (C9) that
//! registers agents/tools and manufactures processes.
//!
//! Everything here is built on top of `agentic_kernel`'s pure, synchronous
//! Blackboard/WorldState/Planner/Action-Goal-Agent model; nothing in that
//! crate knows this one exists.

pub mod autonomy;
pub mod llm;
pub mod platform;
pub mod process;
pub mod ranker;

/// The binding name both `autonomy`'s entry points and `platform::invoke`'s
/// positional convenience bind a single caller-supplied input under (spec.md
/// §4.8: "under the default binding"; §6: "positional → default binding").
pub(crate) const DEFAULT_BINDING: &str = "input";

/// Crate-level error type aggregating every subsystem's own error enum,
/// mirroring `agentic_kernel::KernelError`'s `#[from]`-composition shape one
/// layer up (spec.md §7's ambient error-handling expansion).
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum RuntimeError {
    #[error("process error: {0}")]
    Process(#[from] process::ProcessError),

    #[error("LLM/tool mediation error: {0}")]
    Llm(#[from] llm::LlmError),

    #[error("ranker error: {0}")]
    Ranker(#[from] ranker::RankerError),

    #[error("autonomy error: {0}")]
    Autonomy(#[from] autonomy::AutonomyError),

    #[error("platform error: {0}")]
    Platform(#[from] platform::PlatformError),
}

/// Convenience result alias using [`error_stack::Report`] for rich,
/// context-carrying propagation across module boundaries, mirroring
/// `agentic_kernel::KernelResult` one layer up.
pub type RuntimeResult<T> = Result<T, error_stack::Report<RuntimeError>>;
