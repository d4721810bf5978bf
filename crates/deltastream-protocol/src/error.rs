//! Error types for the protocol layer.

use thiserror::Error;

use deltastream_core::PatchError;

use crate::stream::StreamId;

/// Errors returned by the encoder, decoder, and wire mapping.
///
/// The stream consumer never returns these; it absorbs them into its
/// rejection counter.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProtocolError {
    /// The frame was produced by a different stream than the baseline.
    #[error("stream mismatch: expected {expected}, got {got}")]
    StreamMismatch { expected: StreamId, got: StreamId },

    /// The frame is older than the decoder's baseline.
    #[error("stale frame: version {version} is below baseline {baseline}")]
    StaleFrame { version: u64, baseline: u64 },

    /// Diffing or applying a patch failed.
    #[error(transparent)]
    Patch(#[from] PatchError),

    /// A structured value does not have the expected frame layout.
    #[error("malformed wire value: {0}")]
    Wire(String),

    /// The serializer failed to produce bytes.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// The serializer failed to read bytes.
    #[error("decoding error: {0}")]
    Decoding(String),

    /// The encoder has emitted `u64::MAX` and cannot advance.
    #[error("version counter exhausted")]
    VersionExhausted,
}

/// Result type for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;
