//! HTTP label service for Ollama-style `/api/generate` endpoints.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use tally_core::error::LabelError;
use tally_core::labels::{label_prompt, parse_label_response, LabelMap, LabelService};
use tally_core::models::config::LabelingConfig;

/// Label service that asks a text-generation endpoint for JSON labels.
pub struct HttpLabelService {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    format: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: Option<String>,
}

impl HttpLabelService {
    /// Build from configuration. Returns `None` when labeling is disabled
    /// or no endpoint is set.
    pub fn from_config(config: &LabelingConfig) -> Result<Option<Self>, LabelError> {
        if !config.enabled {
            return Ok(None);
        }
        let Some(endpoint) = config.endpoint.clone() else {
            return Ok(None);
        };

        let client = Client::builder()
            .timeout(config.timeout() + Duration::from_secs(1))
            .build()
            .map_err(|e| LabelError::Unavailable(e.to_string()))?;

        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.is_empty());

        Ok(Some(Self {
            client,
            endpoint,
            model: config.model.clone(),
            api_key,
        }))
    }
}

#[async_trait]
impl LabelService for HttpLabelService {
    fn name(&self) -> &str {
        "http"
    }

    async fn label_values(&self, text: &str, values: &[f64]) -> Result<LabelMap, LabelError> {
        let body = GenerateRequest {
            model: &self.model,
            prompt: label_prompt(text, values),
            stream: false,
            format: "json",
        };

        debug!(model = %self.model, "Requesting labels for {} values", values.len());

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| LabelError::Transport(e.to_string()))?;

        let status = response.status();
        let raw = response
            .text()
            .await
            .map_err(|e| LabelError::Transport(e.to_string()))?;
        if !status.is_success() {
            return Err(LabelError::Unavailable(format!("endpoint returned {}", status)));
        }

        // Ollama wraps the generated text in `response`; anything else is
        // parsed as-is.
        let answer = serde_json::from_str::<GenerateResponse>(&raw)
            .ok()
            .and_then(|r| r.response)
            .unwrap_or(raw);

        parse_label_response(&answer)
    }
}
