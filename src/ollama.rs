use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};

/// Sampling settings forwarded to Ollama as `options`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SamplingOptions {
    pub num_predict: usize,
    pub temperature: f32,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: SamplingOptions,
}

#[derive(Deserialize)]
struct CompletionResponse {
    response: String,
}

/// Thin client for a local Ollama server. Only non-streaming completions are
/// used.
#[derive(Clone)]
pub struct OllamaClient {
    http: Client,
    base_url: String,
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client for ollama")?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub async fn complete(
        &self,
        model: &str,
        prompt: &str,
        options: SamplingOptions,
    ) -> Result<String> {
        let endpoint = format!("{}/api/generate", self.base_url);
        let response = self
            .http
            .post(endpoint)
            .json(&CompletionRequest {
                model,
                prompt,
                stream: false,
                options,
            })
            .send()
            .await
            .with_context(|| format!("could not reach ollama at {}", self.base_url))?;

        let body: CompletionResponse = ensure_success(response, model)
            .await?
            .json()
            .await
            .context("ollama returned an unreadable completion")?;

        Ok(body.response.trim().to_string())
    }
}

async fn ensure_success(response: Response, model: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    anyhow::bail!(
        "ollama completion failed with {status}: {} (is `{model}` pulled?)",
        error_message(&body)
    )
}

/// Ollama reports failures as `{"error": "..."}`; anything else is passed through.
fn error_message(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "<empty body>".to_string();
    }

    serde_json::from_str::<serde_json::Value>(trimmed)
        .ok()
        .and_then(|json| json.get("error")?.as_str().map(str::to_string))
        .unwrap_or_else(|| trimmed.to_string())
}
