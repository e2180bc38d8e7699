use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use policy_matcher::fallback::RemoteMatcher;
use policy_matcher::ollama::OllamaClient;
use policy_matcher::{run_server, AppConfig, PolicyAnalyzer};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = AppConfig::from_env();
    tokio::fs::create_dir_all(&config.upload_dir).await?;

    tracing::info!(
        strategy = %config.matching.strategy,
        threshold = config.matching.threshold,
        justification = %config.matching.justification_mode,
        "policy analyzer configured"
    );
    let analyzer = Arc::new(PolicyAnalyzer::new(&config.matching));

    let ollama = OllamaClient::new(
        config.ollama_base_url.clone(),
        Duration::from_secs(config.fallback.timeout_secs),
    )?;
    let remote = RemoteMatcher::new(ollama, config.fallback.clone());

    run_server(config, analyzer, remote).await
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
