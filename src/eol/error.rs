use crate::azure::AzureApiError;
use crate::retry::RetryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EolError {
    #[error("No EOL definition source is available: {0}")]
    DefinitionsUnavailable(String),

    #[error("Failed to download {url}: {source}")]
    Download {
        url: String,
        source: RetryError<AzureApiError>,
    },

    #[error("Invalid EOL dataset: {0}")]
    InvalidDataset(String),

    #[error("Resource query failed: {0}")]
    Query(RetryError<AzureApiError>),

    #[error("Could not list subscriptions: {0}")]
    Subscriptions(RetryError<AzureApiError>),

    #[error("No subscriptions to scan")]
    NoSubscriptions,

    #[error("Scan cancelled")]
    Cancelled,

    #[error("Cache IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EolError {
    pub fn is_cancelled(&self) -> bool {
        match self {
            EolError::Cancelled => true,
            EolError::Download { source, .. } => source.is_cancelled(),
            EolError::Query(e) | EolError::Subscriptions(e) => e.is_cancelled(),
            _ => false,
        }
    }
}
