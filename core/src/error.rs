//! Transport failure taxonomy for the QR-code API client.
//!
//! # Design
//! Every way a request can fail is converted once, at the transport
//! boundary, into one of these variants. Classification in `classify` then
//! matches on the variant instead of probing the shape of the failure.
//! HTTP failures keep the raw status and body for diagnostics.

/// Errors produced while building, executing, or parsing a request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// No response reached the client (DNS, refused connection, IO).
    #[error("no response from server: {reason}")]
    NoResponse { reason: String },

    /// The server answered with a 4xx status.
    #[error("HTTP {status}: {body}")]
    ClientError { status: u16, body: String },

    /// The server answered with a 5xx status.
    #[error("HTTP {status}: {body}")]
    ServerError { status: u16, body: String },

    /// The server answered with a non-2xx status outside 4xx/5xx.
    #[error("unexpected HTTP {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    /// The request was rejected before any I/O happened.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Anything that is not an HTTP failure: payload encoding, body decoding,
    /// or a failed blocking task.
    #[error("{0}")]
    Unclassified(String),
}

impl ApiError {
    /// Sort a non-2xx status into its failure variant.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            400..=499 => ApiError::ClientError { status, body },
            500..=599 => ApiError::ServerError { status, body },
            _ => ApiError::UnexpectedStatus { status, body },
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::ClientError { status, .. }
            | ApiError::ServerError { status, .. }
            | ApiError::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn body(&self) -> Option<&str> {
        match self {
            ApiError::ClientError { body, .. }
            | ApiError::ServerError { body, .. }
            | ApiError::UnexpectedStatus { body, .. } => Some(body),
            _ => None,
        }
    }
}
