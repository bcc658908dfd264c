//! Streaming Session
//!
//! One request/response exchange over one duplex connection:
//!
//! ```text
//! open ──► send request ──► recv frame ─┬─► terminal state ──┐
//!                              ▲        │                    │
//!                              └────────┤   peer close ──────┤
//!                                       │   deadline ────────┼──► close ──► result
//!                                       └── transport error ─┘
//! ```
//!
//! The deadline covers the whole exchange, connection opening included. The
//! connection is closed on every exit path before `run` returns; the close
//! handshake itself gets [`CLOSE_GRACE`] and is abandoned after that.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::application::ports::{DuplexConnection, DuplexConnector, TransportError};
use crate::domain::generation::{AnswerState, QuoteError};
use crate::infrastructure::metrics;

use super::accumulator::ResponseAccumulator;
use super::codec::JsonCodec;
use super::request::GenerationRequest;
use super::signer::SignedRequestUrl;

/// Upper bound on the close handshake.
pub const CLOSE_GRACE: Duration = Duration::from_secs(2);

impl From<TransportError> for QuoteError {
    fn from(err: TransportError) -> Self {
        Self::Connection(err.to_string())
    }
}

/// Why the receive loop stopped without a transport error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopExit {
    /// The accumulator reached `Completed` or `Failed`.
    Terminal,
    /// The peer closed the connection first.
    PeerClosed,
}

/// Runs single-shot streaming sessions.
#[derive(Clone)]
pub struct StreamingSession {
    connector: Arc<dyn DuplexConnector>,
    codec: JsonCodec,
}

impl StreamingSession {
    /// Create a session runner over `connector`.
    #[must_use]
    pub fn new(connector: Arc<dyn DuplexConnector>) -> Self {
        Self {
            connector,
            codec: JsonCodec::new(),
        }
    }

    /// Open a connection to `url`, send `request` once and collect the answer.
    ///
    /// # Errors
    ///
    /// - `QuoteError::Generation` if the peer sent an error frame
    /// - `QuoteError::Timeout` if no terminal frame arrived within `timeout`
    /// - `QuoteError::Connection` if the transport failed or the peer closed
    ///   before a terminal frame
    #[tracing::instrument(skip_all, fields(uid = %request.uid(), host = %url.host()))]
    pub async fn run(
        &self,
        url: &SignedRequestUrl,
        request: &GenerationRequest,
        timeout: Duration,
    ) -> Result<String, QuoteError> {
        let payload = self
            .codec
            .encode(request)
            .map_err(|e| QuoteError::Connection(format!("failed to serialize request: {e}")))?;

        let deadline = Instant::now() + timeout;

        let mut connection =
            match tokio::time::timeout_at(deadline, self.connector.open(&url.as_url())).await {
                Ok(Ok(connection)) => connection,
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, "Failed to open streaming session");
                    return Err(e.into());
                }
                Err(_) => {
                    tracing::warn!(timeout_ms = timeout.as_millis(), "Timed out opening session");
                    return Err(QuoteError::Timeout(timeout));
                }
            };
        tracing::debug!("Streaming session open");

        let mut accumulator = ResponseAccumulator::new();
        let exchange = tokio::time::timeout_at(
            deadline,
            Self::exchange(connection.as_mut(), payload, &mut accumulator),
        )
        .await;

        close(connection.as_mut()).await;
        metrics::record_frames(accumulator.frames(), accumulator.dropped());

        let exit = match exchange {
            Ok(Ok(exit)) => exit,
            Ok(Err(e)) => {
                tracing::warn!(
                    error = %e,
                    partial_chars = accumulator.current_text().chars().count(),
                    "Streaming session failed"
                );
                return Err(e.into());
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = timeout.as_millis(),
                    partial_chars = accumulator.current_text().chars().count(),
                    "No final frame before deadline"
                );
                return Err(QuoteError::Timeout(timeout));
            }
        };

        match accumulator.into_parts() {
            (AnswerState::Completed, text) if text.is_empty() => Err(QuoteError::Generation {
                reason: "answer completed without content".to_string(),
            }),
            (AnswerState::Completed, text) => Ok(text),
            (AnswerState::Failed(reason), _) => Err(QuoteError::Generation { reason }),
            (AnswerState::Pending, partial) => {
                debug_assert_eq!(exit, LoopExit::PeerClosed);
                tracing::warn!(
                    partial_chars = partial.chars().count(),
                    "Peer closed before the final frame"
                );
                Err(QuoteError::Connection(
                    "peer closed the connection before the final frame".to_string(),
                ))
            }
        }
    }

    /// Send the request and feed frames until a stop condition.
    async fn exchange(
        connection: &mut dyn DuplexConnection,
        payload: String,
        accumulator: &mut ResponseAccumulator,
    ) -> Result<LoopExit, TransportError> {
        connection.send_text(payload).await?;

        while let Some(message) = connection.next_text().await {
            accumulator.on_message(&message?);
            if accumulator.is_terminal() {
                return Ok(LoopExit::Terminal);
            }
        }

        Ok(LoopExit::PeerClosed)
    }
}

impl std::fmt::Debug for StreamingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingSession").finish_non_exhaustive()
    }
}

/// Close `connection`, giving up after [`CLOSE_GRACE`].
async fn close(connection: &mut dyn DuplexConnection) {
    if tokio::time::timeout(CLOSE_GRACE, connection.close())
        .await
        .is_err()
    {
        tracing::debug!("Close handshake did not finish within grace period");
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::domain::quote::QuoteStyle;
    use crate::infrastructure::inference::messages::ResponseFrame;
    use crate::infrastructure::inference::signer::RequestSigner;
    use crate::infrastructure::inference::testing::{ScriptedConnector, Step};

    const TIMEOUT: Duration = Duration::from_millis(200);

    fn signed_url() -> SignedRequestUrl {
        RequestSigner::new("key", "secret")
            .sign_at(
                "ws://127.0.0.1:1/v1/x1",
                chrono::Utc.with_ymd_and_hms(2026, 10, 17, 8, 0, 0).unwrap(),
            )
            .unwrap()
    }

    fn request() -> GenerationRequest {
        GenerationRequest::build(QuoteStyle::Upbeat, "app", "x1")
    }

    async fn run(connector: &ScriptedConnector) -> Result<String, QuoteError> {
        StreamingSession::new(Arc::new(connector.clone()))
            .run(&signed_url(), &request(), TIMEOUT)
            .await
    }

    #[tokio::test]
    async fn completes_with_accumulated_text() {
        let connector = ScriptedConnector::new(vec![
            Step::frame(&ResponseFrame::fragment("Good ")),
            Step::frame(&ResponseFrame::fragment("morning")),
            Step::frame(&ResponseFrame::end()),
        ]);

        assert_eq!(run(&connector).await.unwrap(), "Good morning");
        assert!(connector.is_closed());
        assert_eq!(connector.opened(), 1);
    }

    #[tokio::test]
    async fn sends_request_exactly_once() {
        let connector = ScriptedConnector::new(vec![
            Step::frame(&ResponseFrame::fragment("x")),
            Step::frame(&ResponseFrame::end()),
        ]);
        run(&connector).await.unwrap();

        let sent = connector.sent();
        assert_eq!(sent.len(), 1);
        let json: serde_json::Value = serde_json::from_str(&sent[0]).unwrap();
        assert_eq!(json["header"]["app_id"], "app");
    }

    #[tokio::test]
    async fn connects_to_signed_url() {
        let connector = ScriptedConnector::new(vec![Step::frame(&ResponseFrame::end())]);
        let _ = run(&connector).await;

        let url = connector.last_url().unwrap();
        assert!(url.starts_with("ws://127.0.0.1:1/v1/x1?authorization="));
        assert!(url.contains("&date="));
        assert!(url.ends_with("&host=127.0.0.1"));
    }

    #[tokio::test]
    async fn error_frame_becomes_generation_error() {
        let connector = ScriptedConnector::new(vec![
            Step::frame(&ResponseFrame::fragment("partial")),
            Step::frame(&ResponseFrame::error(10013, "audit failed")),
            Step::Hang,
        ]);

        let err = run(&connector).await.unwrap_err();
        assert_eq!(
            err,
            QuoteError::Generation {
                reason: "audit failed".to_string()
            }
        );
        assert!(connector.is_closed());
    }

    #[tokio::test]
    async fn silence_times_out_and_closes() {
        let connector = ScriptedConnector::new(vec![Step::Hang]);

        let started = Instant::now();
        let err = run(&connector).await.unwrap_err();

        assert_eq!(err, QuoteError::Timeout(TIMEOUT));
        assert!(started.elapsed() >= TIMEOUT);
        assert!(connector.is_closed());
    }

    #[tokio::test]
    async fn partial_text_is_discarded_on_timeout() {
        let connector = ScriptedConnector::new(vec![
            Step::frame(&ResponseFrame::fragment("half a quo")),
            Step::Hang,
        ]);

        let err = run(&connector).await.unwrap_err();
        assert!(matches!(err, QuoteError::Timeout(_)));
        assert!(connector.is_closed());
    }

    #[tokio::test]
    async fn slow_open_counts_against_deadline() {
        let connector = ScriptedConnector::new(vec![Step::frame(&ResponseFrame::end())])
            .with_open_delay(Duration::from_secs(5));

        let err = run(&connector).await.unwrap_err();
        assert_eq!(err, QuoteError::Timeout(TIMEOUT));
    }

    #[tokio::test]
    async fn silent_peer_close_is_connection_error() {
        let connector = ScriptedConnector::new(vec![Step::Close]);

        let err = run(&connector).await.unwrap_err();
        assert!(matches!(err, QuoteError::Connection(_)));
        assert!(connector.is_closed());
    }

    #[tokio::test]
    async fn peer_close_after_partial_content_is_connection_error() {
        let connector = ScriptedConnector::new(vec![
            Step::frame(&ResponseFrame::fragment("Almost ")),
            Step::frame(&ResponseFrame::fragment("there")),
            Step::Close,
        ]);

        let err = run(&connector).await.unwrap_err();
        assert!(matches!(err, QuoteError::Connection(_)));
    }

    #[tokio::test]
    async fn receive_error_is_connection_error() {
        let connector = ScriptedConnector::new(vec![
            Step::frame(&ResponseFrame::fragment("A")),
            Step::Fail("connection reset".to_string()),
        ]);

        let err = run(&connector).await.unwrap_err();
        assert_eq!(
            err,
            QuoteError::Connection("receive failed: connection reset".to_string())
        );
        assert!(connector.is_closed());
    }

    #[tokio::test]
    async fn send_failure_is_connection_error_and_still_closes() {
        let connector =
            ScriptedConnector::new(vec![Step::frame(&ResponseFrame::end())]).failing_send();

        let err = run(&connector).await.unwrap_err();
        assert!(matches!(err, QuoteError::Connection(msg) if msg.starts_with("send failed")));
        assert!(connector.is_closed());
    }

    #[tokio::test]
    async fn open_failure_is_connection_error() {
        let connector = ScriptedConnector::new(vec![]).failing_open();

        let err = run(&connector).await.unwrap_err();
        assert!(matches!(err, QuoteError::Connection(msg) if msg.starts_with("connect failed")));
    }

    #[tokio::test]
    async fn malformed_frames_do_not_break_the_session() {
        let connector = ScriptedConnector::new(vec![
            Step::frame(&ResponseFrame::fragment("A")),
            Step::Text("<html>502 Bad Gateway</html>".to_string()),
            Step::frame(&ResponseFrame::fragment("B")),
            Step::frame(&ResponseFrame::end()),
        ]);

        assert_eq!(run(&connector).await.unwrap(), "AB");
    }

    #[tokio::test]
    async fn completed_without_content_is_generation_error() {
        let connector = ScriptedConnector::new(vec![Step::frame(&ResponseFrame::end())]);

        let err = run(&connector).await.unwrap_err();
        assert!(matches!(err, QuoteError::Generation { .. }));
    }

    #[tokio::test]
    async fn frames_after_terminal_state_are_not_read() {
        let connector = ScriptedConnector::new(vec![
            Step::frame(&ResponseFrame::fragment("done")),
            Step::frame(&ResponseFrame::end()),
            Step::frame(&ResponseFrame::fragment(" and more")),
        ]);

        assert_eq!(run(&connector).await.unwrap(), "done");
        assert_eq!(connector.remaining_steps(), 1);
    }
}
