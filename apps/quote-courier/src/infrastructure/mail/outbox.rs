//! Outbox Transport
//!
//! Writes each letter as one `.eml` file into a spool directory, through
//! `lettre`'s file transport. Useful when a local mail transfer agent picks
//! messages up from disk, and for dry runs without an SMTP relay.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use lettre::{AsyncFileTransport, AsyncTransport, Tokio1Executor};

use crate::application::ports::{Letter, MailError, MailTransport};

use super::message::build_message;

/// Spool-directory mail transport.
pub struct OutboxTransport {
    dir: PathBuf,
    files: AsyncFileTransport<Tokio1Executor>,
}

impl OutboxTransport {
    /// Write letters into `dir`, creating it on first delivery.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            files: AsyncFileTransport::new(&dir),
            dir,
        }
    }

    /// Spool directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl std::fmt::Debug for OutboxTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutboxTransport")
            .field("dir", &self.dir)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl MailTransport for OutboxTransport {
    async fn deliver(&self, letter: &Letter) -> Result<(), MailError> {
        let message = build_message(letter)?;

        tokio::fs::create_dir_all(&self.dir).await?;

        let id = self
            .files
            .send(message)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        let path = self.dir.join(format!("{id}.eml"));
        tracing::info!(path = %path.display(), "Letter written to outbox");
        Ok(())
    }
}
