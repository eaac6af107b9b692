use thiserror::Error;

/// Failures that abort a reconciliation.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Transport error, or a non-success status on a read.
    #[error("remote unavailable: {url}: {reason}")]
    RemoteUnavailable { url: String, reason: String },

    /// The content host answered something other than 200 for a file.
    #[error("content fetch failed for {filename}: status {status}")]
    ContentFetchFailed { filename: String, status: u16 },

    /// The experiment platform rejected a variation update.
    #[error("failed to update variation {id}: status {status}")]
    VariationUpdateFailed { id: u64, status: u16 },

    /// The commit batch does not name an experiment.
    #[error("reconciliation error: {0}")]
    Reconciliation(String),

    /// A response body did not match the expected shape.
    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, SyncError>;
