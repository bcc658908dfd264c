//! Port Interfaces
//!
//! Defines the interfaces (ports) for external systems following
//! the Hexagonal Architecture pattern. These are the contracts that
//! infrastructure adapters must implement.
//!
//! ## Driven Ports (Outbound)
//!
//! - `DuplexConnector` / `DuplexConnection`: one streaming session to the
//!   inference endpoint
//! - `MailTransport`: hands a rendered letter to the mail system
//!
//! ## Driver Ports (Inbound)
//!
//! - `QuoteGenerator`: the single call the scheduler makes into the core

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::generation::GeneratedQuote;
use crate::domain::quote::QuoteStyle;

// =============================================================================
// Duplex Transport
// =============================================================================

/// Errors raised by a duplex transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The connection could not be opened.
    #[error("connect failed: {0}")]
    Connect(String),

    /// Writing a message failed.
    #[error("send failed: {0}")]
    Send(String),

    /// Reading from the connection failed.
    #[error("receive failed: {0}")]
    Receive(String),
}

/// Opens duplex streaming connections.
#[async_trait]
pub trait DuplexConnector: Send + Sync {
    /// Open a connection to `url`.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Connect` if the handshake fails.
    async fn open(&self, url: &str) -> Result<Box<dyn DuplexConnection>, TransportError>;
}

/// One open duplex connection.
///
/// Owned by a single task for its whole life. `close` must be safe to call
/// after the peer has already gone away.
#[async_trait]
pub trait DuplexConnection: Send {
    /// Send one text message.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Send` if the write fails.
    async fn send_text(&mut self, text: String) -> Result<(), TransportError>;

    /// Wait for the next inbound text message.
    ///
    /// Returns `None` once the peer has closed the connection.
    async fn next_text(&mut self) -> Option<Result<String, TransportError>>;

    /// Close the connection, releasing the socket.
    async fn close(&mut self);
}

// =============================================================================
// Quote Generation
// =============================================================================

/// Produces one quote per call, never failing outright.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuoteGenerator: Send + Sync {
    /// Generate a quote in `style`.
    ///
    /// Errors are folded into the returned value: the text falls back to a
    /// fixed string and `error` records the cause.
    async fn generate_quote(&self, style: QuoteStyle) -> GeneratedQuote;
}

// =============================================================================
// Mail
// =============================================================================

/// A rendered letter ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Letter {
    /// Sender address.
    pub from: String,
    /// Recipient address.
    pub to: String,
    /// Subject line.
    pub subject: String,
    /// HTML body.
    pub html: String,
}

/// Errors raised while handing a letter to the mail system.
#[derive(Debug, Error)]
pub enum MailError {
    /// The letter could not be written.
    #[error("failed to write letter: {0}")]
    Io(#[from] std::io::Error),

    /// The letter is not deliverable as given.
    #[error("invalid letter: {0}")]
    Invalid(String),

    /// The mail transport refused or failed to take the letter.
    #[error("mail transport failed: {0}")]
    Transport(String),
}

/// Delivers rendered letters.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Deliver `letter`.
    ///
    /// # Errors
    ///
    /// Returns `MailError` if the letter could not be handed over.
    async fn deliver(&self, letter: &Letter) -> Result<(), MailError>;
}
