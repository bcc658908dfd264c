//! MIME Message Building
//!
//! Turns a rendered [`Letter`] into a `lettre` message: one `text/html` part,
//! base64 transfer encoding, RFC 2047 subject and a `Message-ID` on the
//! sender's domain. Addresses are parsed by `lettre`, which rejects anything
//! that could smuggle extra headers in.

use lettre::Message;
use lettre::message::header::{ContentTransferEncoding, ContentType};
use lettre::message::{Mailbox, SinglePart};
use uuid::Uuid;

use crate::application::ports::{Letter, MailError};

/// Build the MIME message for `letter`.
///
/// # Errors
///
/// Returns `MailError::Invalid` if an address does not parse.
pub fn build_message(letter: &Letter) -> Result<Message, MailError> {
    let from = parse_mailbox("from", &letter.from)?;
    let to = parse_mailbox("to", &letter.to)?;
    let message_id = format!("<{}@{}>", Uuid::new_v4(), from.email.domain());

    let body = SinglePart::builder()
        .header(ContentType::TEXT_HTML)
        .header(ContentTransferEncoding::Base64)
        .body(letter.html.clone());

    Message::builder()
        .message_id(Some(message_id))
        .from(from)
        .to(to)
        .subject(letter.subject.as_str())
        .singlepart(body)
        .map_err(|e| MailError::Invalid(e.to_string()))
}

fn parse_mailbox(field: &str, address: &str) -> Result<Mailbox, MailError> {
    address
        .parse::<Mailbox>()
        .map_err(|e| MailError::Invalid(format!("{field} address {address:?}: {e}")))
}
