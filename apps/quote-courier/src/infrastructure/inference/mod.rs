//! Streaming Inference Client
//!
//! Generates one short quote per call over a signed, single-use streaming
//! session.
//!
//! # Flow
//!
//! ```text
//! QuoteClient ──► RequestSigner ──► signed URL
//!      │
//!      ├────────► GenerationRequest ──► JSON text
//!      │
//!      └────────► StreamingSession ──► DuplexConnector (WebSocket)
//!                       │
//!                       └──► ResponseAccumulator ──► answer | QuoteError
//! ```
//!
//! # Modules
//!
//! - `signer`: HMAC-SHA256 URL signing
//! - `request`: Outbound request builder
//! - `messages`: Inbound frame types
//! - `codec`: JSON framing
//! - `accumulator`: Frame-by-frame answer state machine
//! - `session`: One bounded request/response exchange
//! - `websocket`: `tokio-tungstenite` transport
//! - `client`: Fallback boundary implementing `QuoteGenerator`

pub mod accumulator;
pub mod client;
pub mod codec;
pub mod messages;
pub mod request;
pub mod session;
pub mod signer;
pub mod websocket;

#[cfg(test)]
pub(crate) mod testing;

pub use accumulator::ResponseAccumulator;
pub use client::QuoteClient;
pub use codec::{CodecError, DecodedFrame, JsonCodec};
pub use messages::ResponseFrame;
pub use request::GenerationRequest;
pub use session::StreamingSession;
pub use signer::{RequestSigner, SignedRequestUrl, SigningError};
pub use websocket::{WebSocketConnection, WebSocketConnector};
