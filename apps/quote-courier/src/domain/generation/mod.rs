//! Answer Lifecycle
//!
//! One generation call moves its answer from `Pending` to exactly one terminal
//! state. Terminal states absorb all further input.
//!
//! ```text
//!            content fragment
//!              ┌─────┐
//!              ▼     │
//!           ┌─────────┐   final flag   ┌───────────┐
//!  start ──►│ Pending ├───────────────►│ Completed │
//!           └────┬────┘                └───────────┘
//!                │ header.code != 0    ┌───────────┐
//!                └────────────────────►│  Failed   │
//!                                      └───────────┘
//! ```

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use super::quote::{FALLBACK_QUOTE, QuoteStyle};

// =============================================================================
// Answer State
// =============================================================================

/// State of the answer being accumulated for one call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AnswerState {
    /// Still waiting for the final frame.
    #[default]
    Pending,
    /// The peer marked the answer complete.
    Completed,
    /// The peer reported an error.
    Failed(String),
}

impl AnswerState {
    /// Whether no further frame can change this state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Everything that can go wrong while generating one quote.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuoteError {
    /// The endpoint URL could not be signed.
    #[error("signing failed: {0}")]
    Signing(String),

    /// A style selector outside the supported set.
    #[error("invalid quote style: {0:?}")]
    InvalidStyle(String),

    /// The transport failed or the peer went away before a terminal frame.
    #[error("connection error: {0}")]
    Connection(String),

    /// The peer answered with a non-zero status code.
    #[error("generation failed: {reason}")]
    Generation {
        /// Message carried by the failing frame.
        reason: String,
    },

    /// No terminal frame arrived within the bound.
    #[error("no answer within {0:?}")]
    Timeout(Duration),
}

impl QuoteError {
    /// Short label for metrics and structured logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Signing(_) => "signing",
            Self::InvalidStyle(_) => "invalid_style",
            Self::Connection(_) => "connection",
            Self::Generation { .. } => "generation",
            Self::Timeout(_) => "timeout",
        }
    }
}

// =============================================================================
// Generated Quote
// =============================================================================

/// Result of one generation call. Always carries text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedQuote {
    /// Requested style.
    pub style: QuoteStyle,
    /// Generated text, or [`FALLBACK_QUOTE`] when `error` is set.
    pub text: String,
    /// Cause of the fallback, if any.
    #[serde(serialize_with = "serialize_error")]
    pub error: Option<QuoteError>,
}

impl GeneratedQuote {
    /// A successfully generated quote.
    #[must_use]
    pub const fn generated(style: QuoteStyle, text: String) -> Self {
        Self {
            style,
            text,
            error: None,
        }
    }

    /// The fallback quote, remembering why it was needed.
    #[must_use]
    pub fn fallback(style: QuoteStyle, error: QuoteError) -> Self {
        Self {
            style,
            text: FALLBACK_QUOTE.to_string(),
            error: Some(error),
        }
    }

    /// Whether this is the fallback text.
    #[must_use]
    pub const fn is_fallback(&self) -> bool {
        self.error.is_some()
    }

    /// Outcome label for metrics.
    #[must_use]
    pub fn outcome(&self) -> &'static str {
        self.error.as_ref().map_or("generated", QuoteError::kind)
    }
}

fn serialize_error<S>(error: &Option<QuoteError>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match error {
        Some(e) => serializer.serialize_some(&e.to_string()),
        None => serializer.serialize_none(),
    }
}
