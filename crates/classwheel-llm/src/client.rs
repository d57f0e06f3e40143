// Gemini streaming client using reqwest-eventsource.
//
// Posts to `models/{model}:streamGenerateContent?alt=sse` and turns each SSE
// chunk into `LlmEvent` variants sent over an mpsc channel for the app loop.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest_eventsource::{Error as EventSourceError, Event, RequestBuilderExt};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use classwheel_core::config::LlmConfig;

use crate::prompt::GenerationRequest;
use crate::LlmEvent;

// ---------------------------------------------------------------------------
// Backend seam
// ---------------------------------------------------------------------------

/// Something that can run a generation request and stream its output.
///
/// Implementations must send exactly one terminal event (`Complete` or
/// `Error`) unless the receiver goes away first.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn stream_generation(
        &self,
        request: &GenerationRequest,
        tx: mpsc::Sender<LlmEvent>,
        generation: u64,
    ) -> anyhow::Result<()>;
}

// ---------------------------------------------------------------------------
// GeminiClient
// ---------------------------------------------------------------------------

pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String, base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            model,
            base_url,
        }
    }

    fn stream_url(&self) -> String {
        format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[async_trait]
impl GenerationBackend for GeminiClient {
    async fn stream_generation(
        &self,
        request: &GenerationRequest,
        tx: mpsc::Sender<LlmEvent>,
        generation: u64,
    ) -> anyhow::Result<()> {
        if self.api_key.is_empty() {
            let _ = tx
                .send(LlmEvent::Error {
                    message: "API key not configured".to_string(),
                    generation,
                })
                .await;
            return Ok(());
        }

        let builder = self
            .http
            .post(self.stream_url())
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(&request.to_body());

        let mut es = match builder.eventsource() {
            Ok(es) => es,
            Err(e) => {
                let _ = tx
                    .send(LlmEvent::Error {
                        message: format!("Failed to create event source: {e}"),
                        generation,
                    })
                    .await;
                return Ok(());
            }
        };

        let mut full_text = String::new();

        while let Some(event) = es.next().await {
            match event {
                Ok(Event::Open) => {
                    debug!("SSE connection opened");
                }
                Ok(Event::Message(msg)) => {
                    if let Some(message) = parse_chunk_error(&msg.data) {
                        warn!(%message, "error chunk in stream");
                        let _ = tx.send(LlmEvent::Error { message, generation }).await;
                        es.close();
                        return Ok(());
                    }
                    let Some(text) = parse_chunk_text(&msg.data) else {
                        debug!("chunk without text");
                        continue;
                    };
                    full_text.push_str(&text);
                    if tx.send(LlmEvent::Token { text, generation }).await.is_err() {
                        // Receiver dropped; abort stream.
                        es.close();
                        return Ok(());
                    }
                }
                Err(EventSourceError::StreamEnded) => {
                    break;
                }
                Err(err) => {
                    warn!(?err, "SSE stream error");
                    let message = extract_error_message(err).await;
                    let _ = tx.send(LlmEvent::Error { message, generation }).await;
                    es.close();
                    return Ok(());
                }
            }
        }

        es.close();
        info!(chars = full_text.len(), generation, "generation stream complete");
        let _ = tx
            .send(LlmEvent::Complete {
                full_text,
                generation,
            })
            .await;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// LlmClient wrapper
// ---------------------------------------------------------------------------

/// Either a configured backend or disabled (no API key).
#[derive(Clone)]
pub enum LlmClient {
    Active(Arc<dyn GenerationBackend>),
    Disabled,
}

impl LlmClient {
    /// `Active` with a Gemini client when a non-empty key is given.
    pub fn from_settings(settings: &LlmConfig, api_key: Option<&str>) -> Self {
        match api_key.map(str::trim) {
            Some(key) if !key.is_empty() => LlmClient::Active(Arc::new(GeminiClient::new(
                key.to_string(),
                settings.model.clone(),
                settings.base_url.clone(),
            ))),
            _ => LlmClient::Disabled,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, LlmClient::Active(_))
    }

    pub async fn stream_generation(
        &self,
        request: &GenerationRequest,
        tx: mpsc::Sender<LlmEvent>,
        generation: u64,
    ) -> anyhow::Result<()> {
        match self {
            LlmClient::Active(backend) => backend.stream_generation(request, tx, generation).await,
            LlmClient::Disabled => {
                let _ = tx
                    .send(LlmEvent::Error {
                        message: "LLM not configured".to_string(),
                        generation,
                    })
                    .await;
                Ok(())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// SSE JSON parsing helpers
// ---------------------------------------------------------------------------

/// Concatenated text of every part of the first candidate.
///
/// Expected shape: `{ "candidates": [{ "content": { "parts": [{ "text": "..." }] } }] }`
pub(crate) fn parse_chunk_text(data: &str) -> Option<String> {
    let v: Value = serde_json::from_str(data).ok()?;
    let parts = v.pointer("/candidates/0/content/parts")?.as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .collect();
    Some(text)
}

/// `code status: message` from an in-stream `{ "error": { ... } }` chunk.
pub(crate) fn parse_chunk_error(data: &str) -> Option<String> {
    let v: Value = serde_json::from_str(data).ok()?;
    let error = v.get("error")?;
    let code = error.get("code").and_then(Value::as_i64).unwrap_or_default();
    let status = error.get("status").and_then(Value::as_str).unwrap_or_default();
    let message = error.get("message").and_then(Value::as_str).unwrap_or_default();
    Some(format!("{code} {status}: {message}"))
}

async fn extract_error_message(err: EventSourceError) -> String {
    match err {
        EventSourceError::InvalidStatusCode(status, response) => {
            let body = response.text().await.unwrap_or_default();
            if body.trim().is_empty() {
                format!("API returned status {status}")
            } else {
                format!("API returned status {status}: {}", body.trim())
            }
        }
        EventSourceError::Transport(e) => format!("Network error: {e}"),
        other => format!("Stream error: {other}"),
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
