//! Ollama HTTP client: blocking and streamed completions against a local
//! Ollama server.

use std::time::Duration;

use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};

use crate::config::OllamaConfig;
use crate::error::{RagError, Result};

/// Capacity of the token channel backing [`OllamaClient::complete_stream`].
const STREAM_CHANNEL_CAPACITY: usize = 32;

/// Request body for `/api/generate`.
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

/// One NDJSON line of a generate response. Non-streamed responses use the
/// same shape with the full text in `response`.
#[derive(Debug, Deserialize)]
struct GenerateChunk {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Debug, Deserialize)]
struct ModelTag {
    name: String,
}

/// Client for one Ollama server. Cheap to clone-free share behind a reference;
/// the inner `reqwest::Client` pools connections.
pub struct OllamaClient {
    client: reqwest::Client,
    host: String,
    model: String,
    temperature: f32,
}

impl OllamaClient {
    pub fn new(config: &OllamaConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RagError::Generation(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            host: config.host.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }

    /// Run a completion and return the full response text.
    pub async fn complete(
        &self,
        prompt: &str,
        system: Option<&str>,
        max_tokens: Option<u32>,
    ) -> Result<String> {
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            system,
            stream: false,
            options: GenerateOptions {
                temperature: self.temperature,
                num_predict: max_tokens,
            },
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.host))
            .json(&body)
            .send()
            .await
            .map_err(|e| RagError::Generation(format!("request to Ollama failed: {e}")))?;

        if !response.status().is_success() {
            return Err(RagError::Generation(format!(
                "Ollama returned status {}",
                response.status()
            )));
        }

        let chunk: GenerateChunk = response
            .json()
            .await
            .map_err(|e| RagError::Generation(format!("invalid Ollama response: {e}")))?;

        Ok(chunk.response)
    }

    /// Run a streamed completion, yielding tokens as they arrive.
    ///
    /// The producer reads NDJSON lines from the response body and forwards
    /// each `response` fragment over a bounded channel. Dropping the returned
    /// stream closes the channel, which ends the producer and drops the HTTP
    /// response, aborting generation server-side.
    pub async fn complete_stream(
        &self,
        prompt: &str,
        system: Option<&str>,
        max_tokens: Option<u32>,
    ) -> Result<ReceiverStream<Result<String>>> {
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            system,
            stream: true,
            options: GenerateOptions {
                temperature: self.temperature,
                num_predict: max_tokens,
            },
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.host))
            .json(&body)
            .send()
            .await
            .map_err(|e| RagError::Generation(format!("request to Ollama failed: {e}")))?;

        if !response.status().is_success() {
            return Err(RagError::Generation(format!(
                "Ollama returned status {}",
                response.status()
            )));
        }

        let (tx, rx) = mpsc::channel::<Result<String>>(STREAM_CHANNEL_CAPACITY);

        tokio::spawn(async move {
            let mut body = response.bytes_stream();
            let mut buffer = Vec::new();

            'read: while let Some(bytes) = body.next().await {
                let bytes = match bytes {
                    Ok(b) => b,
                    Err(e) => {
                        let _ = tx
                            .send(Err(RagError::Generation(format!(
                                "stream interrupted: {e}"
                            ))))
                            .await;
                        return;
                    }
                };
                buffer.extend_from_slice(&bytes);

                // NDJSON: complete lines only, keep the remainder buffered.
                while let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
                    let line: Vec<u8> = buffer.drain(..=pos).collect();
                    let line = String::from_utf8_lossy(&line);
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }

                    let chunk: GenerateChunk = match serde_json::from_str(line) {
                        Ok(c) => c,
                        Err(e) => {
                            warn!("skipping malformed stream line: {e}");
                            continue;
                        }
                    };

                    if !chunk.response.is_empty()
                        && tx.send(Ok(chunk.response)).await.is_err()
                    {
                        // Receiver gone, stop reading to cancel generation.
                        debug!("stream consumer dropped, aborting generation");
                        break 'read;
                    }

                    if chunk.done {
                        break 'read;
                    }
                }
            }
        });

        Ok(ReceiverStream::new(rx))
    }

    /// Check that the server answers `/api/tags` within a short deadline.
    pub async fn health_check(&self) -> bool {
        let result = self
            .client
            .get(format!("{}/api/tags", self.host))
            .timeout(Duration::from_secs(5))
            .send()
            .await;

        match result {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                warn!("Ollama health check failed: {e}");
                false
            }
        }
    }

    /// List models available on the server.
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.host))
            .send()
            .await
            .map_err(|e| RagError::Generation(format!("request to Ollama failed: {e}")))?;

        if !response.status().is_success() {
            return Err(RagError::Generation(format!(
                "Ollama returned status {}",
                response.status()
            )));
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| RagError::Generation(format!("invalid Ollama response: {e}")))?;

        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_trailing_slash_trimmed() {
        let config = OllamaConfig {
            host: "http://localhost:11434/".to_string(),
            model: "mistral:7b-instruct-q4_0".to_string(),
            temperature: 0.7,
            timeout_secs: 120,
        };
        let client = OllamaClient::new(&config).unwrap();
        assert_eq!(client.host, "http://localhost:11434");
    }

    #[test]
    fn test_generate_request_serialization() {
        let body = GenerateRequest {
            model: "mistral:7b-instruct-q4_0",
            prompt: "Hello",
            system: None,
            stream: true,
            options: GenerateOptions {
                temperature: 0.7,
                num_predict: None,
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "mistral:7b-instruct-q4_0");
        assert_eq!(json["stream"], true);
        assert!(json.get("system").is_none());
        assert!(json["options"].get("num_predict").is_none());
    }

    #[test]
    fn test_chunk_parsing_defaults() {
        let chunk: GenerateChunk = serde_json::from_str(r#"{"response":"Hi"}"#).unwrap();
        assert_eq!(chunk.response, "Hi");
        assert!(!chunk.done);

        let done: GenerateChunk = serde_json::from_str(r#"{"done":true}"#).unwrap();
        assert!(done.response.is_empty());
        assert!(done.done);
    }

    #[tokio::test]
    async fn test_health_check_unreachable_host() {
        let config = OllamaConfig {
            host: "http://127.0.0.1:1".to_string(),
            model: "mistral:7b-instruct-q4_0".to_string(),
            temperature: 0.7,
            timeout_secs: 1,
        };
        let client = OllamaClient::new(&config).unwrap();
        assert!(!client.health_check().await);
    }
}
