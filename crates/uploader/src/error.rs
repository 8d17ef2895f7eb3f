//! Upload error types.

/// Detail reported when no HTTP response was received for a chunk.
pub const NETWORK_FAILURE_MESSAGE: &str = "Network error during upload.";

/// Batch-level rejection, raised before any file is read or sent.
///
/// The display text is what the user is shown.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("File {file_name} exceeds the maximum allowed.")]
    FileTooLarge {
        file_name: String,
        size_bytes: u64,
        limit_bytes: u64,
    },

    #[error("Total upload size exceeds the maximum allowed.")]
    BatchTooLarge { total_bytes: u64, limit_bytes: u64 },

    #[error("Invalid destination directory: {0}")]
    InvalidDirectory(String),
}

/// Failure of a single chunk request. Fatal to that file only.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransmitError {
    /// The server answered with a non-200 status.
    #[error("{detail}")]
    ServerRejected { status: u16, detail: String },

    /// No response was received (connect failure, reset, timeout).
    #[error("{0}")]
    NetworkFailure(String),
}

impl TransmitError {
    /// The user-facing detail message.
    pub fn detail(&self) -> &str {
        match self {
            Self::ServerRejected { detail, .. } => detail,
            Self::NetworkFailure(detail) => detail,
        }
    }
}

/// Errors raised while setting up the uploader.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid server URL: {0}")]
    InvalidServerUrl(String),

    #[error("invalid CSRF token header value")]
    InvalidCsrfToken,
}
