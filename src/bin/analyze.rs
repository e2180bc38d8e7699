use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use policy_matcher::config::{validate_threshold, AppConfig};
use policy_matcher::fallback::RemoteMatcher;
use policy_matcher::ingest::extract_text;
use policy_matcher::ollama::OllamaClient;
use policy_matcher::similarity::StrategyKind;
use policy_matcher::PolicyAnalyzer;

#[derive(Parser, Debug)]
#[command(name = "analyze")]
#[command(about = "Match a question to a benefit plan in a policy document")]
struct Cli {
    #[arg(long)]
    file: PathBuf,
    #[arg(long)]
    prompt: String,
    /// Ask the configured language model instead of matching the table.
    #[arg(long, default_value_t = false)]
    llm: bool,
    #[arg(long)]
    strategy: Option<StrategyKind>,
    /// Minimum confidence in [0, 1].
    #[arg(long, value_parser = parse_threshold)]
    threshold: Option<f32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = AppConfig::from_env();
    if let Some(strategy) = cli.strategy {
        config.matching.strategy = strategy;
    }
    if let Some(threshold) = cli.threshold {
        config.matching.threshold = threshold;
    }

    let text = extract_text(&cli.file)
        .await
        .with_context(|| format!("could not extract text from {}", cli.file.display()))?;

    let output = if cli.llm {
        let ollama = OllamaClient::new(
            config.ollama_base_url.clone(),
            Duration::from_secs(config.fallback.timeout_secs),
        )?;
        let answer = RemoteMatcher::new(ollama, config.fallback.clone())
            .answer(&text, &cli.prompt)
            .await?;
        serde_json::to_string_pretty(&answer)?
    } else {
        let result = PolicyAnalyzer::new(&config.matching).analyze(&text, &cli.prompt);
        serde_json::to_string_pretty(&result)?
    };

    println!("{}", output);
    Ok(())
}

fn parse_threshold(raw: &str) -> Result<f32> {
    let threshold: f32 = raw
        .trim()
        .parse()
        .with_context(|| format!("invalid threshold: {raw}"))?;
    validate_threshold(threshold)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
