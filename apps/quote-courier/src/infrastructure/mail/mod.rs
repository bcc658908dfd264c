//! Mail Adapters
//!
//! Letter rendering, MIME building and the two delivery routes: a spool
//! directory of `.eml` files or an SMTP relay.

pub mod message;
pub mod outbox;
pub mod smtp;
pub mod template;

use std::sync::Arc;

use crate::application::ports::{MailError, MailTransport};
use crate::infrastructure::config::MailDelivery;

pub use message::build_message;
pub use outbox::OutboxTransport;
pub use smtp::SmtpTransport;
pub use template::{LetterTemplate, TemplateError};

/// Pick the transport configured by `delivery`.
///
/// # Errors
///
/// Returns `MailError::Transport` if the SMTP relay cannot be set up.
pub fn transport_for(delivery: &MailDelivery) -> Result<Arc<dyn MailTransport>, MailError> {
    Ok(match delivery {
        MailDelivery::Outbox(dir) => Arc::new(OutboxTransport::new(dir.clone())),
        MailDelivery::Smtp(settings) => Arc::new(SmtpTransport::new(settings)?),
    })
}
