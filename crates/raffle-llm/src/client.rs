// Claude API streaming client using reqwest-eventsource.
//
// Sends messages to the Anthropic Messages API with `stream: true` and parses
// the Server-Sent Events into `LlmEvent` variants forwarded over an mpsc
// channel. `LlmClient::complete` folds a stream back into the full reply.

use anyhow::anyhow;
use futures_util::StreamExt;
use reqwest_eventsource::{Event, RequestBuilderExt};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use raffle_core::config::Config;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Buffer between the SSE reader and whoever consumes its events.
const EVENT_BUFFER: usize = 64;

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// One step of a streamed model reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmEvent {
    Token { text: String },
    Complete { full_text: String },
    Error { message: String },
}

/// Text gathered so far from one streamed reply.
#[derive(Debug, Default)]
struct ReplyBuffer {
    text: String,
}

/// What a single SSE message means for the reply.
#[derive(Debug, PartialEq, Eq)]
enum Step {
    Token(String),
    Stop,
    Skip,
}

impl ReplyBuffer {
    fn on_message(&mut self, event_type: &str, data: &str) -> Step {
        match event_type {
            "content_block_delta" => match parse_delta_text(data) {
                Some(text) => {
                    self.text.push_str(&text);
                    Step::Token(text)
                }
                None => Step::Skip,
            },
            "message_stop" => Step::Stop,
            other => {
                debug!(event_type = other, "ignoring SSE event");
                Step::Skip
            }
        }
    }

    /// The closing event. A stream cut off before `message_stop` still
    /// completes if it produced any text.
    fn into_event(self, stopped: bool) -> LlmEvent {
        if stopped || !self.text.is_empty() {
            LlmEvent::Complete {
                full_text: self.text,
            }
        } else {
            LlmEvent::Error {
                message: "Stream ended unexpectedly without any content".to_string(),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// ClaudeClient
// ---------------------------------------------------------------------------

/// Low-level Claude API streaming client.
pub struct ClaudeClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl ClaudeClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            model,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Stream one reply as `Token` events followed by a single `Complete` or
    /// `Error`. Returns once that last event is sent or the receiver is gone.
    pub async fn stream_message(
        &self,
        system: &str,
        user_content: &str,
        max_tokens: u32,
        tx: mpsc::Sender<LlmEvent>,
    ) -> anyhow::Result<()> {
        if self.api_key.is_empty() {
            send_error(&tx, "API key not configured".to_string()).await;
            return Ok(());
        }

        let request = self
            .http
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&serde_json::json!({
                "model": self.model,
                "max_tokens": max_tokens,
                "stream": true,
                "system": system,
                "messages": [{ "role": "user", "content": user_content }]
            }));

        let mut es = match request.eventsource() {
            Ok(es) => es,
            Err(e) => {
                send_error(&tx, format!("Failed to create event source: {e}")).await;
                return Ok(());
            }
        };

        let mut reply = ReplyBuffer::default();
        let mut stopped = false;
        while let Some(event) = es.next().await {
            let msg = match event {
                Ok(Event::Open) => continue,
                Ok(Event::Message(msg)) => msg,
                Err(err) => {
                    warn!(?err, "SSE stream error");
                    es.close();
                    send_error(&tx, extract_error_message(&err)).await;
                    return Ok(());
                }
            };
            match reply.on_message(&msg.event, &msg.data) {
                Step::Token(text) => {
                    if tx.send(LlmEvent::Token { text }).await.is_err() {
                        es.close();
                        return Ok(());
                    }
                }
                Step::Stop => {
                    stopped = true;
                    break;
                }
                Step::Skip => {}
            }
        }
        es.close();

        debug!(stopped, reply_len = reply.text.len(), "SSE stream finished");
        let _ = tx.send(reply.into_event(stopped)).await;
        Ok(())
    }
}

async fn send_error(tx: &mpsc::Sender<LlmEvent>, message: String) {
    let _ = tx.send(LlmEvent::Error { message }).await;
}

// ---------------------------------------------------------------------------
// LlmClient wrapper
// ---------------------------------------------------------------------------

/// Either an active Claude client or disabled (no API key configured).
pub enum LlmClient {
    Active(ClaudeClient),
    Disabled,
}

impl LlmClient {
    /// Returns `Active` if an API key is present in credentials, otherwise
    /// `Disabled`.
    pub fn from_config(config: &Config) -> Self {
        match &config.credentials.anthropic_api_key {
            Some(key) if !key.is_empty() => {
                LlmClient::Active(ClaudeClient::new(key.clone(), config.llm.model.clone()))
            }
            _ => LlmClient::Disabled,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, LlmClient::Active(_))
    }

    /// Stream a message, or immediately send an error if disabled.
    pub async fn stream_message(
        &self,
        system: &str,
        user_content: &str,
        max_tokens: u32,
        tx: mpsc::Sender<LlmEvent>,
    ) -> anyhow::Result<()> {
        match self {
            LlmClient::Active(client) => {
                client
                    .stream_message(system, user_content, max_tokens, tx)
                    .await
            }
            LlmClient::Disabled => {
                let _ = tx
                    .send(LlmEvent::Error {
                        message: "LLM not configured".to_string(),
                    })
                    .await;
                Ok(())
            }
        }
    }

    /// Run a message to completion and return the full reply text.
    pub async fn complete(
        &self,
        system: &str,
        user_content: &str,
        max_tokens: u32,
    ) -> anyhow::Result<String> {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let (streamed, reply) = tokio::join!(
            self.stream_message(system, user_content, max_tokens, tx),
            collect_reply(rx),
        );
        streamed?;
        reply
    }
}

/// Drain events until the stream completes or fails.
pub async fn collect_reply(mut rx: mpsc::Receiver<LlmEvent>) -> anyhow::Result<String> {
    while let Some(event) = rx.recv().await {
        match event {
            LlmEvent::Token { .. } => {}
            LlmEvent::Complete { full_text } => return Ok(full_text),
            LlmEvent::Error { message } => return Err(anyhow!(message)),
        }
    }
    Err(anyhow!("LLM stream closed without a reply"))
}

// ---------------------------------------------------------------------------
// SSE JSON parsing helpers
// ---------------------------------------------------------------------------

/// Extract `delta.text` from a `content_block_delta` event.
fn parse_delta_text(data: &str) -> Option<String> {
    let v: Value = serde_json::from_str(data).ok()?;
    v.get("delta")?
        .get("text")?
        .as_str()
        .map(|s| s.to_string())
}

fn extract_error_message(err: &reqwest_eventsource::Error) -> String {
    match err {
        reqwest_eventsource::Error::InvalidStatusCode(status, _response) => {
            format!("API returned status {status}")
        }
        reqwest_eventsource::Error::Transport(e) => format!("Network error: {e}"),
        other => format!("Stream error: {other}"),
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
