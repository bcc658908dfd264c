#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::items_after_statements,
        missing_docs
    )
)]

//! Quote Courier - Streaming Inference Quote Mailer
//!
//! Asks a streaming LLM inference endpoint for one short quote, folds the
//! streamed fragments into a single answer, and mails it as a styled HTML
//! letter on a daily schedule.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Quote styles, answer states and the error taxonomy
//!   - `quote`: Styles and their fixed prompts
//!   - `generation`: Answer lifecycle, `QuoteError`, `GeneratedQuote`
//!
//! - **Application**: Use cases and port definitions
//!   - `ports`: Duplex transport, quote generator, mail transport
//!   - `services`: Dispatching and daily scheduling
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `inference`: Signed WebSocket streaming client
//!   - `mail`: Letter template, MIME building, outbox and SMTP transports
//!   - `config`: Configuration loading
//!   - `health`: Health check HTTP endpoint
//!
//! # Data Flow
//!
//! ```text
//!  DailyTrigger ──► QuoteDispatcher ──► QuoteClient ──► inference endpoint (wss)
//!                        │                   │
//!                        │         fragments ▼
//!                        │          ResponseAccumulator ──► quote | fallback
//!                        ▼
//!                  LetterTemplate ──► build_message ──► OutboxTransport ──► outbox/*.eml
//!                                                   └──► SmtpTransport ──► SMTP relay
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Quote types with no external dependencies.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::generation::{AnswerState, GeneratedQuote, QuoteError};
pub use domain::quote::{FALLBACK_QUOTE, QuoteStyle};

// Ports and services
pub use application::ports::{
    DuplexConnection, DuplexConnector, Letter, MailError, MailTransport, QuoteGenerator,
    TransportError,
};
pub use application::services::{
    DailyTrigger, DispatchError, DispatchLog, DispatchRecord, LetterRenderer, QuoteDispatcher,
    RenderError, run_daily,
};

// Inference client
pub use infrastructure::inference::{
    GenerationRequest, QuoteClient, RequestSigner, ResponseAccumulator, ResponseFrame,
    SignedRequestUrl, SigningError, StreamingSession, WebSocketConnector,
};

// Mail
pub use infrastructure::mail::{
    LetterTemplate, OutboxTransport, SmtpTransport, TemplateError, build_message, transport_for,
};

// Infrastructure config
pub use infrastructure::config::{
    ConfigError, CourierConfig, Credentials, InferenceSettings, MailDelivery, MailSettings,
    ScheduleSettings, ServerSettings, SmtpAuth, SmtpSecurity, SmtpSettings,
};

// Health server
pub use infrastructure::health::{HealthServer, HealthServerError, HealthServerState};

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
