//! SMTP Transport
//!
//! Submits letters to an SMTP relay with `lettre`'s async transport. One
//! connection per letter; the relay sees `EHLO`, optional `AUTH`, the
//! envelope and `QUIT`.

use async_trait::async_trait;
use lettre::transport::smtp::authentication::Credentials as SmtpCredentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};

use crate::application::ports::{Letter, MailError, MailTransport};
use crate::infrastructure::config::{SmtpSecurity, SmtpSettings};

use super::message::build_message;

/// SMTP relay mail transport.
pub struct SmtpTransport {
    relay: AsyncSmtpTransport<Tokio1Executor>,
    host: String,
    port: u16,
}

impl SmtpTransport {
    /// Build a transport for `settings`. Does not connect yet.
    ///
    /// # Errors
    ///
    /// Returns `MailError::Transport` if TLS cannot be set up for the host.
    pub fn new(settings: &SmtpSettings) -> Result<Self, MailError> {
        let host = settings.host.as_str();
        let builder = match settings.security {
            SmtpSecurity::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(host)
                .map_err(|e| MailError::Transport(e.to_string()))?,
            SmtpSecurity::StartTls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                .map_err(|e| MailError::Transport(e.to_string()))?,
            SmtpSecurity::Plain => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host),
        };

        let mut builder = builder
            .port(settings.port)
            .timeout(Some(settings.timeout));
        if let Some(auth) = &settings.auth {
            builder = builder.credentials(SmtpCredentials::new(
                auth.username().to_string(),
                auth.password().to_string(),
            ));
        }

        Ok(Self {
            relay: builder.build(),
            host: settings.host.clone(),
            port: settings.port,
        })
    }
}

impl std::fmt::Debug for SmtpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpTransport")
            .field("host", &self.host)
            .field("port", &self.port)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl MailTransport for SmtpTransport {
    async fn deliver(&self, letter: &Letter) -> Result<(), MailError> {
        let message = build_message(letter)?;

        let response = self.relay.send(message).await.map_err(|e| {
            tracing::warn!(host = %self.host, port = self.port, error = %e, "SMTP submission failed");
            MailError::Transport(e.to_string())
        })?;

        tracing::info!(
            host = %self.host,
            code = %response.code(),
            "Letter accepted by SMTP relay"
        );
        Ok(())
    }
}
