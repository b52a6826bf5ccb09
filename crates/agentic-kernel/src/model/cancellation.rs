use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cheap, `tokio`-free cancellation flag, checked by the executor between
/// actions and by long-running actions at their own suspension points
/// (spec.md §5: "cancellation token"). Kept free of any async runtime so
/// `agentic-kernel` stays usable outside `tokio` entirely; `agentic-runtime`
/// layers its own suspend/resume scheduling on top of the same flag.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
