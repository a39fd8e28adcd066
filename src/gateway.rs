//! Text-Generation Gateway
//!
//! The only component that talks to the network. One call = one round trip
//! to the inference service under a fixed deadline. No retries: callers own
//! their fallback behavior.

use crate::config::{GatewayConfig, GATEWAY_TIMEOUT};
use crate::error::{GatewayError, GatewayResult};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// A single call-and-parse round trip to an inference service.
///
/// Injected into every component so tests can substitute a scripted fake.
#[async_trait]
pub trait TextGateway: Send + Sync {
    async fn call(&self, system_prompt: &str, user_prompt: &str) -> GatewayResult<String>;
}

/// Call the gateway and parse the reply as a JSON object.
///
/// Parse failures are gateway failures (`MalformedResponse`).
pub async fn call_json<T: DeserializeOwned>(
    gateway: &dyn TextGateway,
    system_prompt: &str,
    user_prompt: &str,
) -> GatewayResult<T> {
    let text = gateway.call(system_prompt, user_prompt).await?;
    let json = extract_json_object(&text)?;
    Ok(serde_json::from_str(json)?)
}

/// Pull the outermost JSON object out of a model reply.
///
/// Models like to wrap JSON in ```json fences or a sentence of prose.
pub fn extract_json_object(text: &str) -> GatewayResult<&str> {
    let start = text
        .find('{')
        .ok_or_else(|| GatewayError::malformed("no JSON object in reply"))?;
    let end = text
        .rfind('}')
        .ok_or_else(|| GatewayError::malformed("unterminated JSON object in reply"))?;
    if end < start {
        return Err(GatewayError::malformed("unterminated JSON object in reply"));
    }
    Ok(&text[start..=end])
}

/// Gateway backed by the Anthropic messages API
pub struct AnthropicGateway {
    client: reqwest::Client,
    config: GatewayConfig,
    timeout: Duration,
}

impl AnthropicGateway {
    pub fn new(config: GatewayConfig) -> GatewayResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(GATEWAY_TIMEOUT)
            .build()
            .map_err(|e| GatewayError::network(e.to_string()))?;
        Ok(Self {
            client,
            config,
            timeout: GATEWAY_TIMEOUT,
        })
    }

    async fn round_trip(&self, system_prompt: &str, user_prompt: &str) -> GatewayResult<String> {
        let request_body = serde_json::json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "system": system_prompt,
            "messages": [
                {
                    "role": "user",
                    "content": user_prompt
                }
            ]
        });

        let api_response = self
            .client
            .post(&self.config.api_url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = api_response.status();
        if !status.is_success() {
            let body = api_response.text().await.unwrap_or_default();
            return Err(GatewayError::Service {
                status: status.as_u16(),
                body,
            });
        }

        let response_json: serde_json::Value = api_response
            .json()
            .await
            .map_err(|e| GatewayError::malformed(e.to_string()))?;

        let content = response_json["content"][0]["text"].as_str().unwrap_or("");
        if content.trim().is_empty() {
            return Err(GatewayError::malformed("empty completion"));
        }
        Ok(content.to_string())
    }

    fn transport_error(&self, err: reqwest::Error) -> GatewayError {
        if err.is_timeout() {
            GatewayError::Timeout(self.timeout.as_secs())
        } else {
            GatewayError::network(err.to_string())
        }
    }
}

#[async_trait]
impl TextGateway for AnthropicGateway {
    async fn call(&self, system_prompt: &str, user_prompt: &str) -> GatewayResult<String> {
        if self.config.api_key.is_empty() {
            return Err(GatewayError::network("ANTHROPIC_API_KEY not set"));
        }
        debug!(model = %self.config.model, "gateway call");
        match tokio::time::timeout(self.timeout, self.round_trip(system_prompt, user_prompt)).await
        {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout(self.timeout.as_secs())),
        }
    }
}
