//! Error types for sheetledger operations

use thiserror::Error;

pub type Result<T> = std::result::Result<T, LedgerError>;

/// Exit status for a run that finished without error
pub const EXIT_SUCCESS: i32 = 0;

/// Exit status for transient failures that survived every retry
pub const EXIT_FAILURE: i32 = 1;

/// Exit status for structurally wrong input (missing tab or metadata)
pub const EXIT_CONFIG: i32 = 2;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Remote service error ({status}): {message}")]
    Remote { status: u16, message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Tab not found: {tab}")]
    TabMissing { tab: String },

    #[error("Master meta missing for tab: {tab}")]
    MetadataMissing { tab: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Giving up after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        last: Box<LedgerError>,
    },

    #[error("Generic error: {0}")]
    Generic(#[from] anyhow::Error),
}

impl LedgerError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn remote(status: u16, msg: impl Into<String>) -> Self {
        Self::Remote {
            status,
            message: msg.into(),
        }
    }

    pub fn tab_missing(tab: impl Into<String>) -> Self {
        Self::TabMissing { tab: tab.into() }
    }

    pub fn metadata_missing(tab: impl Into<String>) -> Self {
        Self::MetadataMissing { tab: tab.into() }
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: msg.into(),
        }
    }

    /// Whether re-running the whole job could plausibly succeed.
    ///
    /// Configuration problems are structural: the same input fails the same
    /// way on every attempt.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Self::Config { .. }
                | Self::TabMissing { .. }
                | Self::MetadataMissing { .. }
                | Self::InvalidInput { .. }
                | Self::RetriesExhausted { .. }
        )
    }

    /// Process exit status for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config { .. }
            | Self::TabMissing { .. }
            | Self::MetadataMissing { .. }
            | Self::InvalidInput { .. } => EXIT_CONFIG,
            _ => EXIT_FAILURE,
        }
    }
}
