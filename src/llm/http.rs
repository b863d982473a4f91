//! HTTP inference backend for llama.cpp-style completion servers.
//!
//! Speaks the plain completion protocol: `POST /completion` with a prompt
//! and sampling parameters, JSON `{content}` back. A `/health` probe maps
//! server state to [`InferenceAvailability`] at startup.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Inference, InferenceAvailability, InferenceError};

const MAX_COMPLETION_TOKENS: u32 = 160;
const TEMPERATURE: f32 = 0.2;

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    prompt: &'a str,
    n_predict: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    content: String,
}

pub struct HttpInference {
    base_url: String,
    client: reqwest::blocking::Client,
    timeout: Duration,
}

impl HttpInference {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, InferenceError> {
        let base_url: String = base_url.into();
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| InferenceError::Failed(format!("http client: {e}")))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout,
        })
    }

    /// Probe the server's health endpoint.
    pub fn probe(&self) -> InferenceAvailability {
        let url = format!("{}/health", self.base_url);
        match self.client.get(&url).send() {
            Ok(resp) if resp.status().is_success() => InferenceAvailability::Ready {
                backend: self.base_url.clone(),
            },
            Ok(resp) => InferenceAvailability::Unreachable {
                url,
                error: format!("health returned {}", resp.status()),
            },
            Err(e) => InferenceAvailability::Unreachable {
                url,
                error: e.to_string(),
            },
        }
    }
}

impl Inference for HttpInference {
    fn id(&self) -> &str {
        "http"
    }

    fn complete(&self, prompt: &str) -> Result<String, InferenceError> {
        let url = format!("{}/completion", self.base_url);
        let request = CompletionRequest {
            prompt,
            n_predict: MAX_COMPLETION_TOKENS,
            temperature: TEMPERATURE,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    InferenceError::Timeout(self.timeout)
                } else if e.is_connect() {
                    InferenceError::Unavailable {
                        reason: e.to_string(),
                    }
                } else {
                    InferenceError::Failed(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(InferenceError::Failed(format!(
                "completion returned {status}"
            )));
        }

        let body: CompletionResponse = response
            .json()
            .map_err(|e| InferenceError::Failed(format!("malformed completion body: {e}")))?;
        debug!(chars = body.content.len(), "completion received");
        Ok(body.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_stripped_from_base_url() {
        let backend =
            HttpInference::new("http://localhost:8080/", Duration::from_secs(1)).unwrap();
        assert_eq!(backend.base_url, "http://localhost:8080");
    }

    #[test]
    fn unreachable_server_probes_as_unreachable() {
        // Reserved TEST-NET-1 address; nothing listens there.
        let backend =
            HttpInference::new("http://192.0.2.1:1", Duration::from_millis(100)).unwrap();
        let availability = backend.probe();
        assert!(!availability.is_ready());
        assert!(matches!(
            availability,
            InferenceAvailability::Unreachable { .. }
        ));
    }

    #[test]
    fn completion_request_serializes_prompt() {
        let request = CompletionRequest {
            prompt: "Query: top 5",
            n_predict: MAX_COMPLETION_TOKENS,
            temperature: TEMPERATURE,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["prompt"], "Query: top 5");
        assert_eq!(json["n_predict"], 160);
    }
}
