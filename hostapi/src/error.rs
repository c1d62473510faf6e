//! Host-side error type for capability implementations.
//!
//! `ExternsError` is what every capability method returns. The dispatch
//! layer flattens it into a [`StatusCode`] via
//! [`to_status_code`](ExternsError::to_status_code); nothing else about the
//! error crosses the boundary.

use extbridge_primitives::StatusCode;

/// Error returned by `Externs` and `Blockstore` methods.
#[derive(Debug, thiserror::Error)]
pub enum ExternsError {
    /// The requested value does not exist. An expected, non-fatal miss.
    #[error("not found")]
    NotFound,

    /// The call context was cancelled before or during the operation.
    #[error("call cancelled")]
    Cancelled,

    /// The call context's deadline passed.
    #[error("call deadline exceeded")]
    DeadlineExceeded,

    /// The implementation rejected its input.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Any other failure of the underlying service.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ExternsError {
    /// Convert to the status code reported to the native engine.
    ///
    /// Only a miss keeps its own code. Everything else, including input a
    /// service rejects, is `Io`: `InvalidArgument` is reserved for input the
    /// dispatcher itself fails to decode.
    pub fn to_status_code(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NotFound,
            Self::InvalidArgument(_)
            | Self::Cancelled
            | Self::DeadlineExceeded
            | Self::Other(_) => StatusCode::Io,
        }
    }

    /// Wrap an arbitrary message as an `Other` error.
    pub fn other(msg: impl std::fmt::Display) -> Self {
        Self::Other(anyhow::anyhow!("{}", msg))
    }

    /// Returns true for the `NotFound` variant.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}
