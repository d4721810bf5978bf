//! Error types for the DeltaStream facade.

use deltastream_core::{PatchError, SchemaError};
use deltastream_protocol::ProtocolError;
use thiserror::Error;

/// Errors that can occur through the facade.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Schema construction failed.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Diffing, applying, or converting a record failed.
    #[error("patch error: {0}")]
    Patch(#[from] PatchError),

    /// Encoder, decoder, or wire mapping failed.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Result type for facade operations.
pub type Result<T> = std::result::Result<T, Error>;
