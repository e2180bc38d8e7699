use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::models::JUSTIFICATION_NOT_FOUND;
use crate::similarity::SimilarityScorer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JustificationMode {
    /// First line that mentions the plan name.
    Containment,
    /// Line scoring highest against the plan name.
    Similarity,
}

impl fmt::Display for JustificationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JustificationMode::Containment => f.write_str("containment"),
            JustificationMode::Similarity => f.write_str("similarity"),
        }
    }
}

impl FromStr for JustificationMode {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "containment" | "substring" => Ok(JustificationMode::Containment),
            "similarity" | "scored" => Ok(JustificationMode::Similarity),
            other => Err(anyhow::anyhow!("unknown justification mode: {other}")),
        }
    }
}

#[derive(Clone)]
pub struct JustificationRetriever {
    mode: JustificationMode,
    scorer: Arc<dyn SimilarityScorer>,
}

impl JustificationRetriever {
    pub fn new(mode: JustificationMode, scorer: Arc<dyn SimilarityScorer>) -> Self {
        Self { mode, scorer }
    }

    /// Returns the exclusions line that best explains `plan_name`, or the
    /// not-found sentinel.
    pub fn retrieve(&self, exclusions: &str, plan_name: &str) -> String {
        let found = match self.mode {
            JustificationMode::Containment => first_line_containing(exclusions, plan_name),
            JustificationMode::Similarity => self.most_similar_line(exclusions, plan_name),
        };

        found
            .map(|line| line.trim().to_string())
            .unwrap_or_else(|| JUSTIFICATION_NOT_FOUND.to_string())
    }

    fn most_similar_line<'a>(&self, exclusions: &'a str, plan_name: &str) -> Option<&'a str> {
        let lines: Vec<&str> = exclusions
            .lines()
            .filter(|line| !line.trim().is_empty())
            .collect();

        let scores = self.scorer.score_all(plan_name, &lines);
        let mut best: Option<(&'a str, f32)> = None;
        for (line, score) in lines.iter().copied().zip(scores) {
            if score <= 0.0 || score.is_nan() {
                continue;
            }
            match best {
                Some((_, best_score)) if score <= best_score => {}
                _ => best = Some((line, score)),
            }
        }

        best.map(|(line, _)| line)
    }
}

fn first_line_containing<'a>(exclusions: &'a str, plan_name: &str) -> Option<&'a str> {
    let needle = plan_name.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }

    exclusions
        .lines()
        .find(|line| line.to_lowercase().contains(&needle))
}
