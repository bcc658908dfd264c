//! Frame Codec
//!
//! JSON encoding of the outbound request and decoding of inbound frames.
//!
//! Inbound frames are decoded in two stages. The header is read first and
//! loosely, so a non-zero `header.code` always surfaces as an error frame no
//! matter what else the message carries. The payload is only parsed for
//! successful frames; when it does not fit, the frame is kept without it and
//! the payload error is reported next to it.

use serde_json::{Map, Value};

use super::messages::{ResponseFrame, ResponseHeader, ResponsePayload, SUCCESS_CODE};
use super::request::GenerationRequest;

/// Codec errors.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// JSON encoding/decoding failed.
    #[error("JSON codec error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid message format.
    #[error("invalid message format: {0}")]
    InvalidFormat(String),

    /// The payload of an otherwise valid frame has the wrong shape.
    #[error("unusable payload: {0}")]
    InvalidPayload(#[source] serde_json::Error),
}

/// One decoded inbound message.
#[derive(Debug)]
pub struct DecodedFrame {
    /// The frame, without payload if the payload was unusable.
    pub frame: ResponseFrame,
    /// Why the payload was discarded, if it was.
    pub payload_error: Option<CodecError>,
}

/// JSON codec for the inference stream.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl JsonCodec {
    /// Create a new JSON codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Decode one inbound text message.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a JSON object or `header.code` is
    /// not an integer. A payload of the wrong shape is not an error here; see
    /// [`DecodedFrame::payload_error`].
    pub fn decode(&self, text: &str) -> Result<DecodedFrame, CodecError> {
        let trimmed = text.trim();

        if !trimmed.starts_with('{') {
            return Err(CodecError::InvalidFormat(format!(
                "expected JSON object, got: {}...",
                trimmed.chars().take(50).collect::<String>()
            )));
        }

        let mut object: Map<String, Value> = serde_json::from_str(trimmed)?;
        let header = decode_header(object.get("header"))?;

        if header.code != SUCCESS_CODE {
            return Ok(DecodedFrame {
                frame: ResponseFrame {
                    header,
                    payload: None,
                },
                payload_error: None,
            });
        }

        let (payload, payload_error) = match object.remove("payload") {
            None | Some(Value::Null) => (None, None),
            Some(raw) => match serde_json::from_value::<ResponsePayload>(raw) {
                Ok(payload) => (Some(payload), None),
                Err(e) => (None, Some(CodecError::InvalidPayload(e))),
            },
        };

        Ok(DecodedFrame {
            frame: ResponseFrame { header, payload },
            payload_error,
        })
    }

    /// Encode the outbound request.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn encode(&self, request: &GenerationRequest) -> Result<String, CodecError> {
        Ok(serde_json::to_string(request)?)
    }
}

/// Read `code`, `message` and `status`, tolerating anything else.
fn decode_header(raw: Option<&Value>) -> Result<ResponseHeader, CodecError> {
    let Some(raw) = raw.filter(|v| !v.is_null()) else {
        return Ok(ResponseHeader::default());
    };

    let code = match raw.get("code") {
        None | Some(Value::Null) => SUCCESS_CODE,
        Some(code) => code
            .as_i64()
            .or_else(|| code.as_str().and_then(|s| s.trim().parse().ok()))
            .ok_or_else(|| {
                CodecError::InvalidFormat(format!("header.code is not an integer: {code}"))
            })?,
    };

    let message = match raw.get("message") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(message)) => message.clone(),
        Some(other) => other.to_string(),
    };

    Ok(ResponseHeader {
        code,
        message,
        status: raw.get("status").and_then(Value::as_i64),
    })
}
