//! A deterministic ranker substituted in test mode (spec.md §4.7:
//! "Determinism in test mode": "a deterministic pseudo-random ranker is used
//! to keep plans stable under tests").

use std::collections::BTreeMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;

use super::{RankedCandidate, Ranker, RankerError, Rankings};

/// Scores pinned for specific candidate names take priority; everything else
/// falls back to a hash of `(description, free_form_text, candidate)` folded
/// into `[0, 1)`, so two calls with the same inputs always produce the same
/// score without a real model in the loop.
#[derive(Default)]
pub struct FakeRanker {
    pinned: BTreeMap<String, f64>,
    default_score: Option<f64>,
}

impl FakeRanker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pins `candidate` to always score exactly `score`, regardless of the
    /// description/text passed in.
    pub fn with_score(mut self, candidate: impl Into<String>, score: f64) -> Self {
        self.pinned.insert(candidate.into(), score);
        self
    }

    /// Overrides the hash-based fallback for every candidate not pinned with
    /// [`FakeRanker::with_score`].
    pub fn with_default_score(mut self, score: f64) -> Self {
        self.default_score = Some(score);
        self
    }

    fn score_for(&self, description: &str, free_form_text: &str, candidate: &str) -> f64 {
        if let Some(score) = self.pinned.get(candidate) {
            return *score;
        }
        if let Some(score) = self.default_score {
            return score;
        }
        pseudo_random_unit(description, free_form_text, candidate)
    }
}

/// Folds a hash of the three inputs into `[0, 1)`. Not cryptographic, not
/// uniform in any rigorous sense — just stable across repeated calls with
/// identical arguments, which is all a test-mode ranker needs to guarantee.
fn pseudo_random_unit(description: &str, free_form_text: &str, candidate: &str) -> f64 {
    let mut hasher = DefaultHasher::new();
    description.hash(&mut hasher);
    free_form_text.hash(&mut hasher);
    candidate.hash(&mut hasher);
    let bits = hasher.finish();
    (bits % 1_000_000) as f64 / 1_000_000.0
}

#[async_trait]
impl Ranker for FakeRanker {
    async fn rank(
        &self,
        description: &str,
        free_form_text: &str,
        candidates: &[String],
    ) -> Result<Rankings, RankerError> {
        if candidates.is_empty() {
            return Err(RankerError::EmptyCandidateSet);
        }

        let scored = candidates
            .iter()
            .map(|candidate| RankedCandidate {
                candidate: candidate.clone(),
                score: self.score_for(description, free_form_text, candidate),
            })
            .collect();

        Ok(Rankings::new(scored))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pinned_score_wins_over_the_hash_fallback() {
        let ranker = FakeRanker::new().with_score("StarFinder", 0.9);
        let rankings = ranker
            .rank("select an agent", "Lynda is a scorpio", &["StarFinder".to_string()])
            .await
            .unwrap();
        assert_eq!(rankings.top().unwrap().score, 0.9);
    }

    #[tokio::test]
    async fn unpinned_candidates_are_deterministic_across_calls() {
        let ranker = FakeRanker::new();
        let candidates = vec!["a".to_string(), "b".to_string()];
        let first = ranker.rank("d", "t", &candidates).await.unwrap();
        let second = ranker.rank("d", "t", &candidates).await.unwrap();
        assert_eq!(first.all(), second.all());
    }

    #[tokio::test]
    async fn empty_candidate_set_errs() {
        let ranker = FakeRanker::new();
        let err = ranker.rank("d", "t", &[]).await.unwrap_err();
        assert!(matches!(err, RankerError::EmptyCandidateSet));
    }
}
