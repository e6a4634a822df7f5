//! Error taxonomy shared by both planes and the client.
//!
//! Every failure a caller can see is one of these variants; each carries the
//! human-readable detail while the variant itself is the machine-readable
//! kind. On the wire the kind travels as [`ErrorBody::code`], so the client
//! can rebuild the same variant from a non-2xx response.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type FsResult<T> = Result<T, FsError>;

#[derive(Error, Debug)]
pub enum FsError {
    /// A path or block that was asked for does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The request is malformed or internally inconsistent.
    #[error("{0}")]
    InvalidArgument(String),

    /// A durable read or write failed. Never retried internally: retrying a
    /// failed durable write could mask a real loss of durability.
    #[error("{0}")]
    IoFailure(String),

    /// The journal holds damage that replay cannot safely skip.
    #[error("{0}")]
    Corrupt(String),

    /// A remote call's outcome is unknown; it may have succeeded remotely.
    #[error("{0}")]
    Ambiguous(String),

    /// Metadata references content that can no longer be retrieved intact.
    #[error("{0}")]
    CorruptedRead(String),
}

impl FsError {
    pub fn code(&self) -> &'static str {
        match self {
            FsError::NotFound(_) => "NOT_FOUND",
            FsError::InvalidArgument(_) => "INVALID_ARGUMENT",
            FsError::IoFailure(_) => "IO_FAILURE",
            FsError::Corrupt(_) => "CORRUPT",
            FsError::Ambiguous(_) => "AMBIGUOUS",
            FsError::CorruptedRead(_) => "CORRUPTED_READ",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            FsError::NotFound(_) => StatusCode::NOT_FOUND,
            FsError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            FsError::IoFailure(_) | FsError::Corrupt(_) => StatusCode::INTERNAL_SERVER_ERROR,
            FsError::Ambiguous(_) => StatusCode::GATEWAY_TIMEOUT,
            FsError::CorruptedRead(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Rebuilds the error a server reported. Falls back to the HTTP status
    /// when the body is missing or carries an unknown code.
    pub fn from_wire(status: u16, body: Option<ErrorBody>) -> FsError {
        if let Some(body) = body {
            match body.code.as_str() {
                "NOT_FOUND" => return FsError::NotFound(body.message),
                "INVALID_ARGUMENT" => return FsError::InvalidArgument(body.message),
                "IO_FAILURE" => return FsError::IoFailure(body.message),
                "CORRUPT" => return FsError::Corrupt(body.message),
                "AMBIGUOUS" => return FsError::Ambiguous(body.message),
                "CORRUPTED_READ" => return FsError::CorruptedRead(body.message),
                _ => {}
            }
        }
        let message = format!("server responded with status {status}");
        match status {
            404 => FsError::NotFound(message),
            400 => FsError::InvalidArgument(message),
            504 => FsError::Ambiguous(message),
            502 => FsError::CorruptedRead(message),
            _ => FsError::IoFailure(message),
        }
    }
}

impl From<std::io::Error> for FsError {
    fn from(err: std::io::Error) -> Self {
        FsError::IoFailure(err.to_string())
    }
}

/// JSON body of every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl IntoResponse for FsError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = self.code(), "request failed: {self}");
        } else {
            tracing::debug!(code = self.code(), "request rejected: {self}");
        }
        let body = ErrorBody {
            code: self.code().to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
