//! Error types for the client library.

use thiserror::Error;

/// Errors that can occur when talking to the Selling Partner API.
///
/// Every failure aborts the remaining workflow steps; the client performs no
/// retries of its own apart from the job status poll.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClientError {
    /// Network or HTTP transport failure.
    ///
    /// Indicates issues like DNS resolution, connection failures, or socket errors.
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// Non-success HTTP response whose body could not be decoded.
    #[error("HTTP {status}: {body}")]
    HttpStatus {
        /// Response status code.
        status: u16,
        /// Raw response body, lossily decoded.
        body: String,
    },

    /// JSON serialization or deserialization error.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Malformed XML in a response or decrypted document.
    #[error("XML error: {0}")]
    XmlError(String),

    /// Client configuration issue, such as a missing region or access token.
    ///
    /// Fatal and never retried.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// A refresh was requested but no refresh token is configured.
    #[error("Missing refresh token")]
    MissingRefreshToken,

    /// The identity endpoint rejected a grant.
    ///
    /// The message is the endpoint's `error_description` verbatim.
    #[error("{0}")]
    AuthenticationError(String),

    /// The API reported an error, or a response lacked a required field.
    ///
    /// The message is the first reported error's message verbatim.
    #[error("{0}")]
    ApiError(String),

    /// A feed or report reached `CANCELLED`, `FATAL` or an unrecognized status.
    #[error("The {kind} {id} could not be completed (status: {status})")]
    JobFailed {
        /// `feed` or `report`.
        kind: &'static str,
        /// Job identifier.
        id: String,
        /// Observed status; `<missing>` when the server sent none.
        status: String,
    },

    /// Uploading an encrypted document failed.
    #[error("Upload failed ({}): {message}", upload_status(.status))]
    UploadError {
        /// HTTP status, when a response was received.
        status: Option<u16>,
        /// Server or transport message.
        message: String,
    },

    /// A decrypted processing report encodes an application-level error.
    ///
    /// The message is the report's `ResultDescription` verbatim.
    #[error("{0}")]
    ProcessingReportError(String),

    /// Invalid key material or undecryptable document content.
    #[error("Crypto error: {0}")]
    CryptoError(String),

    /// Unexpected or malformed API response.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Polling exceeded the configured deadline.
    #[error("Timeout error")]
    TimeoutError,
}

#[allow(clippy::ref_option)]
fn upload_status(status: &Option<u16>) -> String {
    status.map_or_else(|| "no response".to_string(), |code| code.to_string())
}

impl ClientError {
    /// Check if this error is potentially retryable by the caller.
    ///
    /// Returns `true` for network errors, timeouts and 5xx/429 responses.
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::NetworkError(_) | Self::TimeoutError => true,
            Self::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            Self::UploadError {
                status: Some(status),
                ..
            } => *status >= 500,
            _ => false,
        }
    }

    /// Check if this is an authentication error.
    pub const fn is_authentication_error(&self) -> bool {
        matches!(
            self,
            Self::AuthenticationError(_) | Self::MissingRefreshToken
        )
    }

    /// Check if this is a terminal job failure.
    pub const fn is_job_failure(&self) -> bool {
        matches!(self, Self::JobFailed { .. })
    }
}
