//! Outreach error taxonomy.

use thiserror::Error;

/// Errors surfaced by the outreach crates.
#[derive(Debug, Error)]
pub enum OutreachError {
    /// External service unreachable, timed out or refused credentials.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Malformed contact or template data. Skips the affected contact only.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A uniqueness constraint rejected an insert: another actor already
    /// recorded this email.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The people finder produced no contact with a usable address.
    #[error("No contacts found for campaign {campaign_id}")]
    NoContactsFound { campaign_id: i64 },

    #[error("Not found: {0}")]
    NotFound(String),

    /// The store itself failed (open, lock, query).
    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl OutreachError {
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// True when the error means "someone else already did it".
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    /// Errors that only concern a single contact and must not abort a batch.
    pub fn is_per_contact(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Validation(_) | Self::Conflict(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, OutreachError>;
