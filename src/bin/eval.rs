use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use policy_matcher::config::AppConfig;
use policy_matcher::ingest::extract_text;
use policy_matcher::models::{MatchResult, UnresolvedReason};
use policy_matcher::similarity::StrategyKind;
use policy_matcher::PolicyAnalyzer;

#[derive(Parser, Debug)]
#[command(name = "eval")]
#[command(about = "Run a plan-matching evaluation set")]
struct Cli {
    #[arg(long, default_value = "eval/cases.jsonl")]
    file: String,
    #[arg(long)]
    strategy: Option<StrategyKind>,
    #[arg(long, default_value_t = false)]
    verbose: bool,
}

#[derive(Debug, Deserialize)]
struct EvalCase {
    id: String,
    document: PathBuf,
    prompt: String,
    #[serde(default)]
    expect_plan: Option<String>,
    #[serde(default)]
    expect_reason: Option<UnresolvedReason>,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let mut config = AppConfig::from_env();
    if let Some(strategy) = cli.strategy {
        config.matching.strategy = strategy;
    }
    let analyzer = PolicyAnalyzer::new(&config.matching);

    let cases = load_cases(&cli.file)?;
    if cases.is_empty() {
        anyhow::bail!("no cases found in {}", cli.file);
    }
    let base_dir = Path::new(&cli.file)
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    let mut documents: HashMap<PathBuf, String> = HashMap::new();
    let mut total = 0usize;
    let mut passed = 0usize;
    let mut matched = 0usize;
    let mut confidence_sum = 0.0f32;

    for case in cases {
        total += 1;
        let path = base_dir.join(&case.document);
        if !documents.contains_key(&path) {
            let text = extract_text(&path)
                .await
                .with_context(|| format!("failed extracting document for case {}", case.id))?;
            documents.insert(path.clone(), text);
        }
        let text = documents.get(&path).map(String::as_str).unwrap_or_default();

        let result = analyzer.analyze(text, &case.prompt);
        if result.matched {
            matched += 1;
            confidence_sum += result.confidence;
        }

        let pass = case_passes(&case, &result);
        if pass {
            passed += 1;
        }

        if cli.verbose || !pass {
            println!("--- {} [{}] ---", case.id, if pass { "pass" } else { "FAIL" });
            println!("Q: {}", case.prompt);
            println!(
                "Plan: {} ({:.2})",
                result.plan_name.as_deref().unwrap_or("-"),
                result.confidence
            );
            if let Some(reason) = result.reason {
                println!("Reason: {}", reason.as_str());
            }
            println!();
        }
    }

    println!("Eval cases: {}", total);
    println!("Expectation accuracy: {:.1}%", ratio(passed, total) * 100.0);
    println!("Match rate: {:.1}%", ratio(matched, total) * 100.0);
    if matched > 0 {
        println!("Mean matched confidence: {:.3}", confidence_sum / matched as f32);
    }

    Ok(())
}

fn case_passes(case: &EvalCase, result: &MatchResult) -> bool {
    if let Some(expected) = &case.expect_plan {
        let plan_ok = result
            .plan_name
            .as_deref()
            .is_some_and(|plan| plan.eq_ignore_ascii_case(expected.trim()));
        if !result.matched || !plan_ok {
            return false;
        }
    }

    if let Some(expected) = case.expect_reason {
        if result.reason != Some(expected) {
            return false;
        }
    }

    true
}

fn load_cases(path: &str) -> Result<Vec<EvalCase>> {
    let file = File::open(path).with_context(|| format!("failed opening {}", path))?;
    let reader = BufReader::new(file);
    let mut cases = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let parsed: EvalCase = serde_json::from_str(trimmed)
            .with_context(|| format!("invalid JSON at {} line {}", path, idx + 1))?;
        cases.push(parsed);
    }

    Ok(cases)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn ratio(n: usize, d: usize) -> f32 {
    if d == 0 {
        return 0.0;
    }
    n as f32 / d as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "Table of Benefits for Domestic Cover\n\
        Plan  Amount\n\
        Gold  1000\n\
        Silver  500\n\
        Exclusions - Domestic Cover\n\
        Gold: no dental.\n";

    fn case(line: &str) -> EvalCase {
        serde_json::from_str(line).unwrap()
    }

    #[test]
    fn expected_plan_is_compared_case_insensitively() {
        let analyzer = PolicyAnalyzer::default();
        let result = analyzer.analyze(DOC, "domestic gold");
        let c = case(r#"{"id":"a","document":"x.txt","prompt":"domestic gold","expect_plan":"gold"}"#);
        assert!(case_passes(&c, &result));
    }

    #[test]
    fn expected_reason_must_match() {
        let analyzer = PolicyAnalyzer::default();
        let result = analyzer.analyze(DOC, "gold please");
        let ok = case(
            r#"{"id":"b","document":"x.txt","prompt":"gold please","expect_reason":"classification_failed"}"#,
        );
        let wrong = case(
            r#"{"id":"c","document":"x.txt","prompt":"gold please","expect_reason":"low_confidence_match"}"#,
        );
        assert!(case_passes(&ok, &result));
        assert!(!case_passes(&wrong, &result));
    }

    #[test]
    fn ratio_handles_empty_denominator() {
        assert_eq!(ratio(3, 0), 0.0);
        assert_eq!(ratio(1, 4), 0.25);
    }
}
