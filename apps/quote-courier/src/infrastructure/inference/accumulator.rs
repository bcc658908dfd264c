//! Response Accumulator
//!
//! Folds the inbound frames of one session into a single answer.
//!
//! # Transition Rules
//!
//! Applied per frame, in arrival order, while the state is `Pending`:
//!
//! 1. `header.code != 0` fails the answer with `header.message`, ignoring any
//!    content in the same frame
//! 2. a non-empty fragment is appended to the buffer
//! 3. a final flag completes the answer (after appending its fragment, if any)
//!
//! Terminal states ignore everything. Messages that do not decode are dropped
//! and counted. A successful frame whose payload does not fit keeps its header
//! (so a final status still completes) and the payload is counted as dropped.

use crate::domain::generation::AnswerState;

use super::codec::{DecodedFrame, JsonCodec};
use super::messages::ResponseFrame;

/// Accumulates one answer. One instance per generation call.
#[derive(Debug, Default)]
pub struct ResponseAccumulator {
    codec: JsonCodec,
    buffer: String,
    state: AnswerState,
    frames: u64,
    dropped: u64,
}

impl ResponseAccumulator {
    /// Create an empty, pending accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode and apply one raw inbound message.
    ///
    /// Messages that fail to decode leave the state untouched.
    pub fn on_message(&mut self, text: &str) -> &AnswerState {
        match self.codec.decode(text) {
            Ok(DecodedFrame {
                frame,
                payload_error,
            }) => {
                if let Some(e) = payload_error {
                    self.dropped += 1;
                    tracing::debug!(error = %e, "Dropping unusable frame payload");
                }
                self.on_frame(&frame)
            }
            Err(e) => {
                self.dropped += 1;
                tracing::debug!(error = %e, "Dropping malformed frame");
                &self.state
            }
        }
    }

    /// Apply one decoded frame.
    pub fn on_frame(&mut self, frame: &ResponseFrame) -> &AnswerState {
        self.frames += 1;

        if self.state.is_terminal() {
            tracing::trace!("Ignoring frame after terminal state");
            return &self.state;
        }

        if frame.is_error() {
            tracing::warn!(
                code = frame.header.code,
                message = %frame.error_message(),
                "Inference endpoint reported an error"
            );
            let reason = if frame.error_message().is_empty() {
                format!("inference error code {}", frame.header.code)
            } else {
                frame.error_message().to_string()
            };
            self.state = AnswerState::Failed(reason);
            return &self.state;
        }

        if let Some(fragment) = frame.content() {
            self.buffer.push_str(fragment);
        }

        if frame.is_final() {
            self.state = AnswerState::Completed;
        }

        &self.state
    }

    /// Text accumulated so far. Valid at any time.
    #[must_use]
    pub fn current_text(&self) -> &str {
        &self.buffer
    }

    /// Whether the answer reached `Completed` or `Failed`.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> &AnswerState {
        &self.state
    }

    /// Decoded frames applied (including ignored ones).
    #[must_use]
    pub const fn frames(&self) -> u64 {
        self.frames
    }

    /// Messages and payloads dropped as malformed.
    #[must_use]
    pub const fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Consume the accumulator, yielding the final state and text.
    #[must_use]
    pub fn into_parts(self) -> (AnswerState, String) {
        (self.state, self.buffer)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn json(frame: &ResponseFrame) -> String {
        serde_json::to_string(frame).unwrap()
    }

    #[test]
    fn starts_pending_and_empty() {
        let acc = ResponseAccumulator::new();
        assert_eq!(acc.state(), &AnswerState::Pending);
        assert!(!acc.is_terminal());
        assert_eq!(acc.current_text(), "");
    }

    #[test]
    fn fragments_then_end_complete_in_order() {
        let mut acc = ResponseAccumulator::new();
        acc.on_message(&json(&ResponseFrame::fragment("A")));
        acc.on_message(&json(&ResponseFrame::fragment("B")));
        let state = acc.on_message(&json(&ResponseFrame::end()));

        assert_eq!(state, &AnswerState::Completed);
        assert_eq!(acc.current_text(), "AB");
    }

    #[test]
    fn error_frame_fails_and_absorbs_the_rest() {
        let mut acc = ResponseAccumulator::new();
        acc.on_message(&json(&ResponseFrame::error(1, "bad")));
        acc.on_message(&json(&ResponseFrame::fragment("late")));
        acc.on_message(&json(&ResponseFrame::end()));

        assert_eq!(acc.state(), &AnswerState::Failed("bad".to_string()));
        assert_eq!(acc.current_text(), "");
    }

    #[test]
    fn error_takes_priority_over_content_in_same_frame() {
        let mut frame = ResponseFrame::fragment("ignored");
        frame.header.code = 10013;
        frame.header.message = "audit failed".to_string();

        let mut acc = ResponseAccumulator::new();
        acc.on_frame(&frame);

        assert_eq!(acc.state(), &AnswerState::Failed("audit failed".to_string()));
        assert_eq!(acc.current_text(), "");
    }

    #[test]
    fn error_code_wins_over_mistyped_payload() {
        let mut acc = ResponseAccumulator::new();
        acc.on_message(
            r#"{"header":{"code":10013,"message":"audit failed"},"payload":{"choices":{"text":"oops"}}}"#,
        );

        assert_eq!(acc.state(), &AnswerState::Failed("audit failed".to_string()));
        assert_eq!(acc.dropped(), 0);
    }

    #[test]
    fn error_frame_with_unexpected_header_field_types_fails() {
        let mut acc = ResponseAccumulator::new();
        acc.on_message(r#"{"header":{"code":11200,"message":"quota","sid":12345}}"#);

        assert_eq!(acc.state(), &AnswerState::Failed("quota".to_string()));
        assert_eq!(acc.dropped(), 0);
    }

    #[test]
    fn error_frame_without_message_names_the_code() {
        let mut acc = ResponseAccumulator::new();
        acc.on_message(r#"{"header":{"code":10163}}"#);

        assert_eq!(
            acc.state(),
            &AnswerState::Failed("inference error code 10163".to_string())
        );
    }

    #[test]
    fn mistyped_payload_drops_only_the_payload() {
        let mut acc = ResponseAccumulator::new();
        acc.on_message(&json(&ResponseFrame::fragment("A")));
        acc.on_message(r#"{"header":{"code":0,"status":2},"payload":{"choices":{"text":"oops"}}}"#);

        assert_eq!(acc.state(), &AnswerState::Completed);
        assert_eq!(acc.current_text(), "A");
        assert_eq!(acc.dropped(), 1);
        assert_eq!(acc.frames(), 2);
    }

    #[test]
    fn malformed_frame_between_fragments_is_dropped() {
        let mut acc = ResponseAccumulator::new();
        acc.on_message(&json(&ResponseFrame::fragment("A")));
        acc.on_message("{\"header\": oops");
        acc.on_message(&json(&ResponseFrame::fragment("B")));
        acc.on_message(&json(&ResponseFrame::end()));

        assert_eq!(acc.state(), &AnswerState::Completed);
        assert_eq!(acc.current_text(), "AB");
        assert_eq!(acc.dropped(), 1);
        assert_eq!(acc.frames(), 3);
    }

    #[test]
    fn empty_frame_leaves_state_unchanged() {
        let mut acc = ResponseAccumulator::new();
        acc.on_message(r#"{"header":{"code":0,"message":"Success"}}"#);
        assert_eq!(acc.state(), &AnswerState::Pending);
        assert_eq!(acc.current_text(), "");
    }

    #[test]
    fn final_frame_with_content_appends_before_completing() {
        let mut frame = ResponseFrame::fragment("C");
        frame.header.status = Some(2);

        let mut acc = ResponseAccumulator::new();
        acc.on_frame(&ResponseFrame::fragment("AB"));
        acc.on_frame(&frame);

        assert_eq!(acc.state(), &AnswerState::Completed);
        assert_eq!(acc.current_text(), "ABC");
    }

    #[test]
    fn completed_state_ignores_further_errors() {
        let mut acc = ResponseAccumulator::new();
        acc.on_frame(&ResponseFrame::fragment("done"));
        acc.on_frame(&ResponseFrame::end());
        acc.on_frame(&ResponseFrame::error(500, "late error"));

        let (state, text) = acc.into_parts();
        assert_eq!(state, AnswerState::Completed);
        assert_eq!(text, "done");
    }

    proptest! {
        #[test]
        fn fragments_concatenate_in_arrival_order(
            fragments in proptest::collection::vec("[a-zA-Z0-9 ,.!]{1,12}", 0..20)
        ) {
            let mut acc = ResponseAccumulator::new();
            for fragment in &fragments {
                acc.on_message(&json(&ResponseFrame::fragment(fragment.clone())));
                prop_assert!(!acc.is_terminal());
            }
            acc.on_message(&json(&ResponseFrame::end()));

            prop_assert_eq!(acc.state(), &AnswerState::Completed);
            prop_assert_eq!(acc.current_text(), fragments.concat());
        }
    }
}
