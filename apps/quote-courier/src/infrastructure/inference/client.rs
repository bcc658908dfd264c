//! Quote Client
//!
//! The generation boundary: sign, build, stream, and fold every failure into
//! the fallback quote.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use crate::application::ports::{DuplexConnector, QuoteGenerator};
use crate::domain::generation::{GeneratedQuote, QuoteError};
use crate::domain::quote::QuoteStyle;
use crate::infrastructure::config::InferenceSettings;
use crate::infrastructure::metrics;

use super::request::GenerationRequest;
use super::session::StreamingSession;
use super::signer::RequestSigner;
use super::websocket::WebSocketConnector;

/// Generates quotes against the streaming inference endpoint.
///
/// Holds only immutable settings; concurrent calls share nothing mutable.
#[derive(Debug, Clone)]
pub struct QuoteClient {
    settings: InferenceSettings,
    signer: RequestSigner,
    session: StreamingSession,
}

impl QuoteClient {
    /// Create a client over `connector`.
    #[must_use]
    pub fn new(settings: InferenceSettings, connector: Arc<dyn DuplexConnector>) -> Self {
        let signer = RequestSigner::new(
            settings.credentials.api_key(),
            settings.credentials.api_secret(),
        );
        Self {
            settings,
            signer,
            session: StreamingSession::new(connector),
        }
    }

    /// Create a client over WebSocket.
    #[must_use]
    pub fn websocket(settings: InferenceSettings) -> Self {
        Self::new(settings, Arc::new(WebSocketConnector::new()))
    }

    /// Generate a quote, surfacing the failure instead of falling back.
    ///
    /// # Errors
    ///
    /// Returns `QuoteError` if signing fails or the session ends without a
    /// completed answer.
    pub async fn try_generate(&self, style: QuoteStyle) -> Result<String, QuoteError> {
        let url = self.signer.sign(&self.settings.endpoint_url)?;

        let mut request = GenerationRequest::build(
            style,
            self.settings.credentials.app_id(),
            &self.settings.model,
        );
        if !self.settings.web_search {
            request = request.without_web_search();
        }

        self.session
            .run(&url, &request, self.settings.timeout)
            .await
    }
}

#[async_trait]
impl QuoteGenerator for QuoteClient {
    #[tracing::instrument(skip(self), fields(style = %style))]
    async fn generate_quote(&self, style: QuoteStyle) -> GeneratedQuote {
        let started = Instant::now();

        let quote = match self.try_generate(style).await {
            Ok(text) => {
                tracing::info!(chars = text.chars().count(), "Quote generated");
                GeneratedQuote::generated(style, text)
            }
            Err(e) => {
                tracing::warn!(error = %e, kind = e.kind(), "Quote generation failed, using fallback");
                GeneratedQuote::fallback(style, e)
            }
        };

        metrics::record_generation(style, quote.outcome(), started.elapsed());
        quote
    }
}
