//! Inbound Frame Types
//!
//! Wire format of the messages streamed back by the inference endpoint.
//!
//! ```json
//! {"header": {"code": 0, "message": "Success", "sid": "...", "status": 1},
//!  "payload": {"choices": {"status": 1, "seq": 0,
//!                          "text": [{"role": "assistant", "content": "Good", "index": 0}]}}}
//! ```
//!
//! Error frames carry a non-zero `header.code` and a `header.message`. The end
//! of the answer is flagged by `payload.choices.is_end == 1`; endpoints that
//! instead report session status signal it with `header.status == 2`.
//!
//! Only the fields above and the first fragment's `content` are modelled.
//! Everything else on the wire (`sid`, `seq`, `role`, `index`) is ignored.

use serde::{Deserialize, Serialize};

/// `header.code` of a successful frame.
pub const SUCCESS_CODE: i64 = 0;

/// `header.status` of the last frame of a session.
pub const LAST_FRAME_STATUS: i64 = 2;

/// One inbound frame.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseFrame {
    /// Status header.
    #[serde(default)]
    pub header: ResponseHeader,
    /// Generated content, absent on error frames.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<ResponsePayload>,
}

/// Frame status header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseHeader {
    /// `0` on success.
    #[serde(default)]
    pub code: i64,
    /// Human-readable status, meaningful on error.
    #[serde(default)]
    pub message: String,
    /// Session status (`2` on the last frame).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<i64>,
}

/// Frame payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponsePayload {
    /// Choice block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Choices>,
}

/// Choice block carrying the fragment and the end flag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choices {
    /// `1` on the final fragment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_end: Option<i64>,
    /// Fragments; only the first is used.
    #[serde(default)]
    pub text: Vec<ChoiceText>,
}

/// One generated fragment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceText {
    /// Fragment text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl ResponseFrame {
    /// Whether the peer reported an error.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        self.header.code != SUCCESS_CODE
    }

    /// Error message carried by the header.
    #[must_use]
    pub fn error_message(&self) -> &str {
        &self.header.message
    }

    /// Non-empty content of the first fragment.
    #[must_use]
    pub fn content(&self) -> Option<&str> {
        self.choices()?
            .text
            .first()?
            .content
            .as_deref()
            .filter(|c| !c.is_empty())
    }

    /// Whether this frame ends the answer.
    #[must_use]
    pub fn is_final(&self) -> bool {
        let is_end = self.choices().and_then(|c| c.is_end) == Some(1);
        is_end || self.header.status == Some(LAST_FRAME_STATUS)
    }

    fn choices(&self) -> Option<&Choices> {
        self.payload.as_ref()?.choices.as_ref()
    }

    /// A content fragment.
    #[must_use]
    pub fn fragment(content: impl Into<String>) -> Self {
        Self {
            payload: Some(ResponsePayload {
                choices: Some(Choices {
                    text: vec![ChoiceText {
                        content: Some(content.into()),
                    }],
                    ..Choices::default()
                }),
            }),
            ..Self::default()
        }
    }

    /// A frame flagging the end of the answer.
    #[must_use]
    pub fn end() -> Self {
        Self {
            payload: Some(ResponsePayload {
                choices: Some(Choices {
                    is_end: Some(1),
                    ..Choices::default()
                }),
            }),
            ..Self::default()
        }
    }

    /// An error frame.
    #[must_use]
    pub fn error(code: i64, message: impl Into<String>) -> Self {
        Self {
            header: ResponseHeader {
                code,
                message: message.into(),
                ..ResponseHeader::default()
            },
            payload: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_content_frame() {
        let json = r#"{"header":{"code":0,"message":"Success","sid":"cht0001","status":1},
            "payload":{"choices":{"status":1,"seq":0,"text":[{"content":"Good","role":"assistant","index":0}]}}}"#;
        let frame: ResponseFrame = serde_json::from_str(json).unwrap();
        assert!(!frame.is_error());
        assert_eq!(frame.content(), Some("Good"));
        assert!(!frame.is_final());
        assert_eq!(frame.header.status, Some(1));
    }

    #[test]
    fn deserializes_error_frame() {
        let json = r#"{"header":{"code":10013,"message":"input content audit failed"}}"#;
        let frame: ResponseFrame = serde_json::from_str(json).unwrap();
        assert!(frame.is_error());
        assert_eq!(frame.error_message(), "input content audit failed");
        assert_eq!(frame.content(), None);
    }

    #[test]
    fn is_end_flag_marks_final() {
        let json = r#"{"header":{"code":0},"payload":{"choices":{"is_end":1,"text":[]}}}"#;
        let frame: ResponseFrame = serde_json::from_str(json).unwrap();
        assert!(frame.is_final());
    }

    #[test]
    fn last_session_status_marks_final() {
        let json = r#"{"header":{"code":0,"status":2},"payload":{"choices":{"text":[{"content":"!"}]}}}"#;
        let frame: ResponseFrame = serde_json::from_str(json).unwrap();
        assert!(frame.is_final());
        assert_eq!(frame.content(), Some("!"));
    }

    #[test]
    fn empty_content_is_no_content() {
        let frame = ResponseFrame::fragment("");
        assert_eq!(frame.content(), None);
    }

    #[test]
    fn missing_header_defaults_to_success() {
        let frame: ResponseFrame =
            serde_json::from_str(r#"{"payload":{"choices":{"text":[{"content":"A"}]}}}"#).unwrap();
        assert!(!frame.is_error());
        assert_eq!(frame.content(), Some("A"));
    }

    #[test]
    fn helper_frames_round_trip_through_json() {
        let frames = [
            ResponseFrame::fragment("A"),
            ResponseFrame::end(),
            ResponseFrame::error(1, "bad"),
        ];
        for frame in frames {
            let json = serde_json::to_string(&frame).unwrap();
            let back: ResponseFrame = serde_json::from_str(&json).unwrap();
            assert_eq!(back, frame);
        }
    }
}
