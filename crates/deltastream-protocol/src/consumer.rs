//! Stream consumer: a decoder guarded against an unreliable channel.
//!
//! Frames may arrive dropped, duplicated, reordered, or from the wrong
//! producer. The consumer never fails on them. Each frame is either applied
//! or rejected, and rejections that leave the local state behind the
//! producer raise `needs_recovery` until a key frame arrives.
//!
//! ```text
//!                key frame
//!  Uninitialized ----------> Synced <------------+
//!    |    ^                    |                 |
//!    |    |   reset()          | delta gap       | key frame
//!    |    +--------------------+                 |
//!    | delta                   v                 |
//!    +-----> (flag) ------> NeedsRecovery -------+
//! ```

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use deltastream_core::{Record, SchemaRef};

use crate::decoder::Decoder;
use crate::error::{ProtocolError, Result};
use crate::frame::{Frame, KeyFrame};
use crate::stream::StreamId;

/// Coarse consumer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    /// No key frame seen since creation or the last reset.
    Uninitialized,
    /// Applying frames in order.
    Synced,
    /// A gap was detected; a key frame is required to resynchronize.
    NeedsRecovery,
}

/// Why a frame was not applied.
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    /// A delta arrived before any key frame.
    MissingKeyFrame,
    /// The frame belongs to another producer.
    ForeignStream { expected: StreamId, got: StreamId },
    /// Duplicate or out-of-date frame.
    Stale { version: u64, current: u64 },
    /// A delta skipped one or more versions.
    Gap { expected: u64, got: u64 },
    /// The frame passed the sequence checks but the decoder refused it.
    Decode(ProtocolError),
}

impl Rejection {
    /// Whether this rejection leaves the consumer needing a key frame.
    pub fn requires_recovery(&self) -> bool {
        matches!(
            self,
            Rejection::MissingKeyFrame | Rejection::Gap { .. } | Rejection::Decode(_)
        )
    }
}

/// Result of [`StreamConsumer::apply_frame`].
#[derive(Debug, Clone, PartialEq)]
pub enum ApplyOutcome {
    Applied,
    Rejected(Rejection),
}

impl ApplyOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, ApplyOutcome::Applied)
    }
}

/// Applies frames from one producer, tolerating loss and duplication.
///
/// Every frame passed to [`apply_frame`](Self::apply_frame) increments
/// exactly one of `frames_applied` or `frames_rejected`.
#[derive(Debug, Clone)]
pub struct StreamConsumer {
    schema: SchemaRef,
    decoder: Option<Decoder>,
    expected_stream_id: Option<StreamId>,
    current_version: u64,
    frames_applied: u64,
    frames_rejected: u64,
    needs_recovery: bool,
}

impl StreamConsumer {
    pub fn new(schema: SchemaRef) -> Self {
        Self {
            schema,
            decoder: None,
            expected_stream_id: None,
            current_version: 0,
            frames_applied: 0,
            frames_rejected: 0,
            needs_recovery: false,
        }
    }

    /// Evaluate one frame.
    pub fn apply_frame(&mut self, frame: &Frame) -> ApplyOutcome {
        let result = if let Some(decoder) = self.decoder.as_mut() {
            Self::advance(decoder, self.expected_stream_id, self.current_version, frame)
        } else {
            Self::bootstrap(&self.schema, frame).map(|decoder| {
                self.expected_stream_id = Some(decoder.stream_id());
                self.decoder = Some(decoder);
            })
        };

        match result {
            Ok(()) => {
                self.current_version = frame.version();
                self.frames_applied += 1;
                self.needs_recovery = false;
                ApplyOutcome::Applied
            }
            Err(rejection) => {
                self.log_rejection(frame, &rejection);
                self.frames_rejected += 1;
                if rejection.requires_recovery() {
                    self.needs_recovery = true;
                }
                ApplyOutcome::Rejected(rejection)
            }
        }
    }

    fn bootstrap(schema: &SchemaRef, frame: &Frame) -> std::result::Result<Decoder, Rejection> {
        match frame {
            Frame::Key(key) => {
                Decoder::new(schema.clone(), key.clone()).map_err(Rejection::Decode)
            }
            Frame::Delta(_) => Err(Rejection::MissingKeyFrame),
        }
    }

    fn advance(
        decoder: &mut Decoder,
        expected: Option<StreamId>,
        current: u64,
        frame: &Frame,
    ) -> std::result::Result<(), Rejection> {
        let got = frame.stream_id();
        if expected != Some(got) {
            return Err(Rejection::ForeignStream {
                expected: decoder.stream_id(),
                got,
            });
        }

        let version = frame.version();
        if version <= current {
            return Err(Rejection::Stale { version, current });
        }
        if let Frame::Delta(_) = frame {
            let next = current.saturating_add(1);
            if version != next {
                return Err(Rejection::Gap {
                    expected: next,
                    got: version,
                });
            }
        }

        decoder
            .decode_frame(frame)
            .map(|_| ())
            .map_err(Rejection::Decode)
    }

    fn log_rejection(&self, frame: &Frame, rejection: &Rejection) {
        let stream = frame.stream_id();
        let version = frame.version();
        let current = self.current_version;
        match rejection {
            Rejection::MissingKeyFrame => {
                warn!(%stream, version, "delta frame before key frame; recovery required")
            }
            Rejection::ForeignStream { expected, .. } => {
                debug!(%stream, %expected, version, "ignoring frame from foreign stream")
            }
            Rejection::Stale { .. } => {
                debug!(%stream, version, current, "ignoring stale or duplicate frame")
            }
            Rejection::Gap { expected, .. } => {
                warn!(%stream, version, current, expected, "version gap; recovery required")
            }
            Rejection::Decode(error) => {
                warn!(%stream, version, current, %error, "frame could not be decoded; recovery required")
            }
        }
    }

    /// Forget the producer and return to `Uninitialized`.
    ///
    /// Counters are kept.
    pub fn reset(&mut self) {
        debug!(
            stream = ?self.expected_stream_id,
            version = self.current_version,
            "consumer reset"
        );
        self.decoder = None;
        self.expected_stream_id = None;
        self.current_version = 0;
        self.needs_recovery = false;
    }

    pub fn state(&self) -> ConsumerState {
        match (&self.decoder, self.needs_recovery) {
            (None, _) => ConsumerState::Uninitialized,
            (Some(_), true) => ConsumerState::NeedsRecovery,
            (Some(_), false) => ConsumerState::Synced,
        }
    }

    pub fn current_value(&self) -> Option<&Record> {
        self.decoder.as_ref().map(Decoder::value)
    }

    /// Typed view of the current value, if any.
    pub fn current_value_as<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        self.decoder.as_ref().map(Decoder::value_as).transpose()
    }

    /// Last applied key frame state, if any.
    pub fn baseline(&self) -> Option<&KeyFrame> {
        self.decoder.as_ref().map(Decoder::baseline)
    }

    pub fn current_version(&self) -> u64 {
        self.current_version
    }

    pub fn expected_stream_id(&self) -> Option<StreamId> {
        self.expected_stream_id
    }

    pub fn frames_applied(&self) -> u64 {
        self.frames_applied
    }

    pub fn frames_rejected(&self) -> u64 {
        self.frames_rejected
    }

    pub fn needs_recovery(&self) -> bool {
        self.needs_recovery
    }

    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }
}
