//! Generation Request
//!
//! The single outbound message of a streaming session.
//!
//! ```json
//! {
//!   "header":    {"app_id": "...", "uid": "a1B2c3D4e5"},
//!   "parameter": {"chat": {"domain": "x1", "temperature": 0.7, "max_tokens": 100, ...}},
//!   "payload":   {"message": {"text": [{"role": "user", "content": "..."}]}}
//! }
//! ```

use rand::Rng;
use rand::distr::Alphanumeric;
use serde::{Deserialize, Serialize};

use crate::domain::quote::QuoteStyle;

/// Length of the per-call session uid.
pub const SESSION_UID_LEN: usize = 10;

const TEMPERATURE: f64 = 0.7;
const MAX_TOKENS: u32 = 100;
const PRESENCE_PENALTY: f64 = 1.0;
const FREQUENCY_PENALTY: f64 = 0.02;
const TOP_K: u32 = 5;

// =============================================================================
// Wire Types
// =============================================================================

/// Outbound generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Caller identification.
    pub header: RequestHeader,
    /// Model parameters.
    pub parameter: RequestParameter,
    /// Conversation to answer.
    pub payload: RequestPayload,
}

/// Request header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestHeader {
    /// Application id issued with the credentials.
    pub app_id: String,
    /// Random per-call session id, only used to correlate logs.
    pub uid: String,
}

/// Parameter envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestParameter {
    /// Chat model parameters.
    pub chat: ChatParameters,
}

/// Chat model parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatParameters {
    /// Model name.
    pub domain: String,
    /// Sampling temperature.
    pub temperature: f64,
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
    /// Penalty for repeating topics.
    pub presence_penalty: f64,
    /// Penalty for repeating tokens.
    pub frequency_penalty: f64,
    /// Candidate pool size.
    pub top_k: u32,
    /// Auxiliary capabilities.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Tool>,
}

/// Auxiliary capability offered to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tool {
    /// Tool kind, always `web_search` today.
    #[serde(rename = "type")]
    pub kind: String,
    /// Web search switch.
    pub web_search: WebSearch,
}

/// Web search settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebSearch {
    /// Whether the model may search.
    pub enable: bool,
    /// Search depth.
    pub search_mode: String,
}

impl Tool {
    /// Web search in normal mode.
    #[must_use]
    pub fn web_search() -> Self {
        Self {
            kind: "web_search".to_string(),
            web_search: WebSearch {
                enable: true,
                search_mode: "normal".to_string(),
            },
        }
    }
}

/// Payload envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestPayload {
    /// Message envelope.
    pub message: MessageText,
}

/// Ordered conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageText {
    /// Turns, oldest first.
    pub text: Vec<ChatMessage>,
}

/// One conversation turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Speaker role.
    pub role: String,
    /// Turn text.
    pub content: String,
}

// =============================================================================
// Builder
// =============================================================================

impl GenerationRequest {
    /// Build the request for one quote in `style`.
    #[must_use]
    pub fn build(style: QuoteStyle, app_id: &str, model: &str) -> Self {
        Self {
            header: RequestHeader {
                app_id: app_id.to_string(),
                uid: session_uid(),
            },
            parameter: RequestParameter {
                chat: ChatParameters {
                    domain: model.to_string(),
                    temperature: TEMPERATURE,
                    max_tokens: MAX_TOKENS,
                    presence_penalty: PRESENCE_PENALTY,
                    frequency_penalty: FREQUENCY_PENALTY,
                    top_k: TOP_K,
                    tools: vec![Tool::web_search()],
                },
            },
            payload: RequestPayload {
                message: MessageText {
                    text: vec![ChatMessage {
                        role: "user".to_string(),
                        content: style.prompt().to_string(),
                    }],
                },
            },
        }
    }

    /// Drop the web search capability.
    #[must_use]
    pub fn without_web_search(mut self) -> Self {
        self.parameter.chat.tools.clear();
        self
    }

    /// Session uid, for log correlation.
    #[must_use]
    pub fn uid(&self) -> &str {
        &self.header.uid
    }

    /// Prompt of the single user turn.
    #[must_use]
    pub fn prompt(&self) -> Option<&str> {
        self.payload
            .message
            .text
            .iter()
            .find(|m| m.role == "user")
            .map(|m| m.content.as_str())
    }
}

/// Random alphanumeric session id.
fn session_uid() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(SESSION_UID_LEN)
        .map(char::from)
        .collect()
}
