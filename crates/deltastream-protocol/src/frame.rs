//! Frames: the envelopes of a stream.
//!
//! A [`KeyFrame`] carries the full state at a version; a [`DeltaFrame`]
//! carries the patch from the previous version. [`Frame`] is the closed union
//! of the two.

use deltastream_core::{Record, RecordPatch};

use crate::stream::StreamId;

/// Discriminator carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FrameKind {
    Key = 0,
    Delta = 1,
}

impl FrameKind {
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(FrameKind::Key),
            1 => Some(FrameKind::Delta),
            _ => None,
        }
    }
}

/// Full state of a stream at `version`.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyFrame {
    pub stream_id: StreamId,
    pub version: u64,
    /// Unix milliseconds.
    pub timestamp: i64,
    pub value: Record,
}

/// Changes from `version - 1` to `version`.
#[derive(Debug, Clone, PartialEq)]
pub struct DeltaFrame {
    pub stream_id: StreamId,
    pub version: u64,
    /// Unix milliseconds.
    pub timestamp: i64,
    pub patch: RecordPatch,
}

/// A frame of either kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Key(KeyFrame),
    Delta(DeltaFrame),
}

impl Frame {
    pub fn kind(&self) -> FrameKind {
        match self {
            Frame::Key(_) => FrameKind::Key,
            Frame::Delta(_) => FrameKind::Delta,
        }
    }

    pub fn stream_id(&self) -> StreamId {
        match self {
            Frame::Key(f) => f.stream_id,
            Frame::Delta(f) => f.stream_id,
        }
    }

    pub fn version(&self) -> u64 {
        match self {
            Frame::Key(f) => f.version,
            Frame::Delta(f) => f.version,
        }
    }

    pub fn timestamp(&self) -> i64 {
        match self {
            Frame::Key(f) => f.timestamp,
            Frame::Delta(f) => f.timestamp,
        }
    }

    pub fn is_key(&self) -> bool {
        matches!(self, Frame::Key(_))
    }
}

impl From<KeyFrame> for Frame {
    fn from(frame: KeyFrame) -> Self {
        Frame::Key(frame)
    }
}

impl From<DeltaFrame> for Frame {
    fn from(frame: DeltaFrame) -> Self {
        Frame::Delta(frame)
    }
}
