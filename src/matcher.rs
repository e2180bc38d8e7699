use std::sync::Arc;

use crate::models::Candidate;
use crate::similarity::SimilarityScorer;

#[derive(Debug, Clone, PartialEq)]
pub struct PlanMatch {
    /// Position of the winning candidate in table order.
    pub index: usize,
    pub plan_name: String,
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    Accepted(PlanMatch),
    /// The best candidate did not clear the threshold.
    Rejected(PlanMatch),
    NoCandidates,
}

impl MatchOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, MatchOutcome::Accepted(_))
    }

    pub fn best(&self) -> Option<&PlanMatch> {
        match self {
            MatchOutcome::Accepted(best) | MatchOutcome::Rejected(best) => Some(best),
            MatchOutcome::NoCandidates => None,
        }
    }
}

impl From<&PlanMatch> for Candidate {
    fn from(value: &PlanMatch) -> Self {
        Candidate {
            plan_name: value.plan_name.clone(),
            score: value.score,
        }
    }
}

#[derive(Clone)]
pub struct PlanMatcher {
    scorer: Arc<dyn SimilarityScorer>,
    threshold: f32,
}

impl PlanMatcher {
    pub fn new(scorer: Arc<dyn SimilarityScorer>, threshold: f32) -> Self {
        Self { scorer, threshold }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Picks the highest-scoring candidate, keeping the first one on ties, and
    /// accepts it only when its score reaches the threshold.
    pub fn best_match(&self, prompt: &str, candidates: &[&str]) -> MatchOutcome {
        let scores = self.scorer.score_all(prompt, candidates);

        let mut best: Option<(usize, f32)> = None;
        for (index, score) in scores.into_iter().take(candidates.len()).enumerate() {
            let score = if score.is_nan() { 0.0 } else { score };
            match best {
                Some((_, best_score)) if score <= best_score => {}
                _ => best = Some((index, score)),
            }
        }

        let Some((index, score)) = best else {
            return MatchOutcome::NoCandidates;
        };

        let plan = PlanMatch {
            index,
            plan_name: candidates[index].to_string(),
            score,
        };

        tracing::debug!(
            plan = %plan.plan_name,
            score = plan.score,
            threshold = self.threshold,
            strategy = self.scorer.name(),
            "best plan candidate"
        );

        if score >= self.threshold {
            MatchOutcome::Accepted(plan)
        } else {
            MatchOutcome::Rejected(plan)
        }
    }
}
