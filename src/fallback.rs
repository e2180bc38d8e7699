use std::time::Instant;

use anyhow::Result;

use crate::config::FallbackConfig;
use crate::models::FallbackAnswer;
use crate::ollama::{OllamaClient, SamplingOptions};

const SAMPLING: SamplingOptions = SamplingOptions {
    num_predict: 400,
    temperature: 0.1,
};

const POSITIVE_MARKERS: [&str; 5] = ["plan", "amount", "sum insured", "covered", "coverage"];
const NEGATIVE_MARKERS: [&str; 6] = [
    "not found",
    "unable to",
    "no plan",
    "cannot determine",
    "could not find",
    "not mentioned",
];

/// Answers a question about a policy document with a language model instead of
/// the table-matching pipeline.
#[derive(Clone)]
pub struct RemoteMatcher {
    ollama: OllamaClient,
    config: FallbackConfig,
}

impl RemoteMatcher {
    pub fn new(ollama: OllamaClient, config: FallbackConfig) -> Self {
        Self { ollama, config }
    }

    pub async fn answer(&self, document: &str, question: &str) -> Result<FallbackAnswer> {
        let started = Instant::now();
        let prompt = build_prompt(
            &truncate_to_word_limit(document, self.config.max_document_words),
            question,
        );

        let answer = self
            .ollama
            .complete(&self.config.answer_model, &prompt, SAMPLING)
            .await?;

        let plan_found = answer_mentions_plan(&answer);
        tracing::info!(
            model = %self.config.answer_model,
            plan_found,
            "remote model answered policy question"
        );

        Ok(FallbackAnswer {
            plan_found,
            answer,
            latency_ms: started.elapsed().as_millis(),
        })
    }
}

fn build_prompt(document: &str, question: &str) -> String {
    format!(
        "You are reading an insurance policy document.\n\
         Identify the benefit plan the user is asking about, state its coverage amount from the \
         table of benefits, and quote the exclusion line that applies to it.\n\
         If the document does not name a matching plan, reply \"Plan not found\".\n\n\
         # Document\n{document}\n\n# Question\n{question}\n"
    )
}

/// Keyword heuristic: the answer names a plan or amount and does not say it
/// failed to find one.
pub fn answer_mentions_plan(answer: &str) -> bool {
    let lower = answer.to_lowercase();
    let positive = POSITIVE_MARKERS.iter().any(|marker| lower.contains(marker));
    let negative = NEGATIVE_MARKERS.iter().any(|marker| lower.contains(marker));
    positive && !negative
}

fn truncate_to_word_limit(text: &str, max_words: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= max_words {
        return text.to_string();
    }
    words[..max_words].join(" ")
}
