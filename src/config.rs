use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Result;

use crate::justification::JustificationMode;
use crate::similarity::StrategyKind;

pub const DEFAULT_THRESHOLD: f32 = 0.3;
pub const DEFAULT_NGRAM_SIZE: usize = 3;

const DEFAULT_DOMESTIC_KEYWORDS: [&str; 3] = ["domestic", "india", "within country"];
const DEFAULT_INTERNATIONAL_KEYWORDS: [&str; 3] = ["international", "abroad", "foreign"];

#[derive(Clone, Debug)]
pub struct FallbackConfig {
    pub answer_model: String,
    pub timeout_secs: u64,
    pub max_document_words: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct KeywordConfig {
    pub domestic: Vec<String>,
    pub international: Vec<String>,
}

impl Default for KeywordConfig {
    fn default() -> Self {
        Self {
            domestic: DEFAULT_DOMESTIC_KEYWORDS
                .iter()
                .map(|k| k.to_string())
                .collect(),
            international: DEFAULT_INTERNATIONAL_KEYWORDS
                .iter()
                .map(|k| k.to_string())
                .collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MatchingConfig {
    pub threshold: f32,
    pub strategy: StrategyKind,
    pub ngram_size: usize,
    pub justification_mode: JustificationMode,
    pub keywords: KeywordConfig,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            strategy: StrategyKind::TfIdf,
            ngram_size: DEFAULT_NGRAM_SIZE,
            justification_mode: JustificationMode::Containment,
            keywords: KeywordConfig::default(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub bind_addr: String,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub ollama_base_url: String,
    pub fallback: FallbackConfig,
    pub matching: MatchingConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let upload_dir = env::var("POLICY_MATCHER_UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./uploads"));

        let defaults = MatchingConfig::default();
        let keywords = KeywordConfig {
            domestic: env::var("DOMESTIC_KEYWORDS")
                .ok()
                .map(|raw| parse_keyword_list(&raw))
                .filter(|list| !list.is_empty())
                .unwrap_or(defaults.keywords.domestic),
            international: env::var("INTERNATIONAL_KEYWORDS")
                .ok()
                .map(|raw| parse_keyword_list(&raw))
                .filter(|list| !list.is_empty())
                .unwrap_or(defaults.keywords.international),
        };

        let threshold = match validate_threshold(parse_env("MATCH_THRESHOLD", defaults.threshold)) {
            Ok(threshold) => threshold,
            Err(err) => {
                tracing::warn!("MATCH_THRESHOLD rejected ({}); using default", err);
                defaults.threshold
            }
        };

        Self {
            bind_addr: env::var("POLICY_MATCHER_BIND")
                .unwrap_or_else(|_| "127.0.0.1:8080".to_string()),
            upload_dir,
            max_upload_bytes: parse_env::<usize>("MAX_UPLOAD_MB", 25).saturating_mul(1024 * 1024),
            ollama_base_url: env::var("OLLAMA_BASE_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:11434".to_string()),
            fallback: FallbackConfig {
                answer_model: env::var("ANSWER_MODEL")
                    .unwrap_or_else(|_| "qwen2.5:7b-instruct".to_string()),
                timeout_secs: parse_env("FALLBACK_TIMEOUT_SECS", 60),
                max_document_words: parse_env("FALLBACK_MAX_WORDS", 3_000),
            },
            matching: MatchingConfig {
                threshold,
                strategy: parse_env("SIMILARITY_STRATEGY", defaults.strategy),
                ngram_size: parse_env("NGRAM_SIZE", defaults.ngram_size).max(1),
                justification_mode: parse_env("JUSTIFICATION_MODE", defaults.justification_mode),
                keywords,
            },
        }
    }
}

fn parse_env<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    match env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(key, value = %raw, "invalid configuration value; using default");
                default
            }
        },
        Err(_) => default,
    }
}

/// Match thresholds are similarity scores and must lie in [0, 1].
pub fn validate_threshold(threshold: f32) -> Result<f32> {
    if (0.0..=1.0).contains(&threshold) {
        Ok(threshold)
    } else {
        anyhow::bail!("threshold {threshold} is outside [0, 1]")
    }
}

pub fn parse_keyword_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect()
}
