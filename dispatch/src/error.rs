//! Dispatch error types.
//!
//! `BridgeError` is the internal error of one boundary call. It is flattened
//! to a [`StatusCode`] exactly once, at the edge of the entry point.

use extbridge_hostapi::ExternsError;
use extbridge_primitives::{AddressError, CodecError, FaultReport, StatusCode};

/// Error raised while servicing one boundary call.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The handle is unknown or already unregistered.
    #[error("invalid handle {0}")]
    InvalidHandle(u64),

    /// Malformed, oversized, or inconsistent input from the native side.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A boundary buffer failed to decode.
    #[error("decode error: {0}")]
    Codec(#[from] CodecError),

    /// The capability implementation returned an error.
    #[error("externs error: {0}")]
    Externs(#[from] ExternsError),

    /// A fault was verified but its target could not be resolved to an
    /// actor id. `report` carries the fault type and gas already billed.
    #[error("cannot resolve consensus fault target: {source}")]
    UnresolvedTarget {
        report: FaultReport,
        source: AddressError,
    },

    /// A panic was caught at the boundary.
    #[error("panic in {op}: {message}")]
    Panic { op: &'static str, message: String },
}

impl BridgeError {
    /// Convert to the status code returned to the native engine.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidHandle(_) => StatusCode::InvalidHandle,
            Self::InvalidArgument(_) | Self::Codec(_) => StatusCode::InvalidArgument,
            Self::Externs(e) => e.to_status_code(),
            Self::UnresolvedTarget { .. } => StatusCode::Io,
            Self::Panic { .. } => StatusCode::Panic,
        }
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

/// Result type for dispatch operations.
pub type BridgeResult<T> = Result<T, BridgeError>;
