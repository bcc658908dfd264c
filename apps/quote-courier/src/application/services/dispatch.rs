//! Quote Dispatch
//!
//! Generate one quote, render it into a letter and hand the letter to the
//! mail transport. Generation never fails outright, so a letter always goes
//! out; only rendering and delivery can fail a dispatch.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use thiserror::Error;

use crate::application::ports::{Letter, MailError, MailTransport, QuoteGenerator};
use crate::domain::generation::GeneratedQuote;
use crate::domain::quote::QuoteStyle;
use crate::infrastructure::metrics::{self, DeliveryOutcome};

// =============================================================================
// Rendering Seam
// =============================================================================

/// Rendering failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to render letter: {0}")]
pub struct RenderError(pub String);

/// Turns a generated quote into the HTML body of a letter.
pub trait LetterRenderer: Send + Sync {
    /// Render `quote`.
    ///
    /// # Errors
    ///
    /// Returns `RenderError` if the template fails to evaluate.
    fn render(&self, quote: &GeneratedQuote) -> Result<String, RenderError>;
}

// =============================================================================
// Dispatch Errors
// =============================================================================

/// Why a dispatch did not deliver a letter.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The letter body could not be rendered.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// The mail transport refused the letter.
    #[error("delivery failed: {0}")]
    Delivery(#[from] MailError),
}

// =============================================================================
// Dispatch Log
// =============================================================================

/// Outcome of one dispatch, as reported by the health endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchRecord {
    /// Style dispatched.
    pub style: QuoteStyle,
    /// When the dispatch finished.
    pub finished_at: DateTime<Utc>,
    /// Whether the letter carried the fallback text.
    pub fallback: bool,
    /// Whether the transport accepted the letter.
    pub delivered: bool,
    /// Generation or delivery error, if any.
    pub error: Option<String>,
}

/// Last dispatch per style.
#[derive(Debug, Default)]
pub struct DispatchLog {
    upbeat: RwLock<Option<DispatchRecord>>,
    somber: RwLock<Option<DispatchRecord>>,
}

impl DispatchLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember `record` as the latest for its style.
    pub fn record(&self, record: DispatchRecord) {
        let style = record.style;
        *self.slot(style).write() = Some(record);
    }

    /// Latest record for `style`.
    #[must_use]
    pub fn last(&self, style: QuoteStyle) -> Option<DispatchRecord> {
        self.slot(style).read().clone()
    }

    const fn slot(&self, style: QuoteStyle) -> &RwLock<Option<DispatchRecord>> {
        match style {
            QuoteStyle::Upbeat => &self.upbeat,
            QuoteStyle::Somber => &self.somber,
        }
    }
}

// =============================================================================
// Dispatcher
// =============================================================================

/// Generates, renders and delivers letters.
pub struct QuoteDispatcher {
    generator: Arc<dyn QuoteGenerator>,
    renderer: Arc<dyn LetterRenderer>,
    transport: Arc<dyn MailTransport>,
    from: String,
    to: String,
    log: Arc<DispatchLog>,
}

impl QuoteDispatcher {
    /// Create a dispatcher sending from `from` to `to`.
    #[must_use]
    pub fn new(
        generator: Arc<dyn QuoteGenerator>,
        renderer: Arc<dyn LetterRenderer>,
        transport: Arc<dyn MailTransport>,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        Self {
            generator,
            renderer,
            transport,
            from: from.into(),
            to: to.into(),
            log: Arc::new(DispatchLog::new()),
        }
    }

    /// Shared log of the latest dispatches.
    #[must_use]
    pub fn log(&self) -> Arc<DispatchLog> {
        Arc::clone(&self.log)
    }

    /// Dispatch one letter in `style`.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError` if rendering or delivery failed. The failure is
    /// also logged, counted and recorded in the dispatch log.
    #[tracing::instrument(skip(self), fields(style = %style))]
    pub async fn dispatch(&self, style: QuoteStyle) -> Result<DispatchRecord, DispatchError> {
        let quote = self.generator.generate_quote(style).await;
        let generation_error = quote.error.as_ref().map(ToString::to_string);

        let result = self.deliver(&quote).await;

        let record = DispatchRecord {
            style,
            finished_at: Utc::now(),
            fallback: quote.is_fallback(),
            delivered: result.is_ok(),
            error: result
                .as_ref()
                .err()
                .map(ToString::to_string)
                .or(generation_error),
        };
        self.log.record(record.clone());

        match result {
            Ok(()) => {
                metrics::record_delivery(DeliveryOutcome::Delivered);
                tracing::info!(fallback = record.fallback, to = %self.to, "Letter dispatched");
                Ok(record)
            }
            Err(e) => {
                metrics::record_delivery(DeliveryOutcome::Failed);
                tracing::error!(error = %e, "Letter dispatch failed");
                Err(e)
            }
        }
    }

    async fn deliver(&self, quote: &GeneratedQuote) -> Result<(), DispatchError> {
        let html = self.renderer.render(quote)?;
        let letter = Letter {
            from: self.from.clone(),
            to: self.to.clone(),
            subject: quote.style.subject().to_string(),
            html,
        };
        self.transport.deliver(&letter).await?;
        Ok(())
    }
}

impl std::fmt::Debug for QuoteDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuoteDispatcher")
            .field("from", &self.from)
            .field("to", &self.to)
            .finish_non_exhaustive()
    }
}
