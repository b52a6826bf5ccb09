//! The Ranker (spec.md §4.7): scores a free-form description against a list
//! of candidates, used by Autonomy to choose a goal and then an agent from
//! natural-language intent.

mod fake;
pub use fake::FakeRanker;

use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by a [`Ranker`] implementation (spec.md §7).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RankerError {
    #[error("cannot rank an empty candidate set")]
    EmptyCandidateSet,

    #[error("ranker backend failed: {0}")]
    BackendFailed(String),
}

/// One candidate's score, `0.0..=1.0` (higher is a better match).
#[derive(Debug, Clone, PartialEq)]
pub struct RankedCandidate {
    pub candidate: String,
    pub score: f64,
}

/// The full result of a [`Ranker::rank`] call, sorted highest score first.
#[derive(Debug, Clone, Default)]
pub struct Rankings {
    scored: Vec<RankedCandidate>,
}

impl Rankings {
    pub fn new(mut scored: Vec<RankedCandidate>) -> Self {
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        Self { scored }
    }

    /// The highest-scoring candidate, if any were supplied.
    pub fn top(&self) -> Option<&RankedCandidate> {
        self.scored.first()
    }

    /// The highest-scoring candidate, if its score meets `cutoff` (spec.md
    /// §4.7: `goalConfidenceCutOff`/`agentConfidenceCutOff`, default `0.6`).
    pub fn top_above(&self, cutoff: f64) -> Option<&RankedCandidate> {
        self.top().filter(|c| c.score >= cutoff)
    }

    pub fn all(&self) -> &[RankedCandidate] {
        &self.scored
    }
}

/// The default confidence cutoff below which a ranking is treated as "no
/// confident match" (spec.md §4.7).
pub const DEFAULT_CONFIDENCE_CUTOFF: f64 = 0.6;

/// Scores `candidates` against `description`/`free_form_text` (spec.md
/// §4.7: `rank(description, freeFormText, candidates)`).
#[async_trait]
pub trait Ranker: Send + Sync {
    async fn rank(
        &self,
        description: &str,
        free_form_text: &str,
        candidates: &[String],
    ) -> Result<Rankings, RankerError>;
}
