//! Single-writer encoder.
//!
//! An [`Encoder`] owns the last snapshot it emitted and turns each new full
//! state into a [`DeltaFrame`] one version later. Versions start at 0 with
//! the initial state and advance by exactly one per call, even when nothing
//! changed.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tracing::trace;

use deltastream_core::{diff, Record, SchemaRef};

use crate::error::{ProtocolError, Result};
use crate::frame::{DeltaFrame, KeyFrame};
use crate::stream::StreamId;

/// Source of frame timestamps, in unix milliseconds.
pub trait Clock {
    fn now_millis(&self) -> i64;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or_default()
    }
}

/// Encoder configuration.
#[derive(Debug, Clone, Default)]
pub struct EncoderConfig {
    /// Fixed producer identity. A random one is drawn when `None`.
    pub stream_id: Option<StreamId>,
}

/// Turns successive full states into versioned frames.
///
/// Not synchronized: exactly one writer per encoder.
#[derive(Debug)]
pub struct Encoder<C: Clock = SystemClock> {
    schema: SchemaRef,
    stream_id: StreamId,
    last_snapshot: Record,
    last_version: u64,
    last_timestamp: i64,
    clock: C,
}

impl Encoder<SystemClock> {
    /// Start a new stream at version 0 with a random identity.
    pub fn new(schema: SchemaRef, initial: Record) -> Result<Self> {
        Self::with_config(schema, initial, EncoderConfig::default(), SystemClock)
    }

    /// Start a new stream from a typed value.
    pub fn from_value<T: Serialize + ?Sized>(schema: SchemaRef, initial: &T) -> Result<Self> {
        let record = Record::from_serialize(&schema, initial)?;
        Self::new(schema, record)
    }
}

impl<C: Clock> Encoder<C> {
    /// Start a new stream with explicit configuration and clock.
    pub fn with_config(
        schema: SchemaRef,
        initial: Record,
        config: EncoderConfig,
        clock: C,
    ) -> Result<Self> {
        initial.conform(&schema)?;
        let stream_id = config.stream_id.unwrap_or_else(StreamId::random);
        let last_timestamp = clock.now_millis();

        Ok(Self {
            schema,
            stream_id,
            last_snapshot: initial,
            last_version: 0,
            last_timestamp,
            clock,
        })
    }

    /// The current state as a key frame at the current version.
    pub fn main_frame(&self) -> KeyFrame {
        KeyFrame {
            stream_id: self.stream_id,
            version: self.last_version,
            timestamp: self.last_timestamp,
            value: self.last_snapshot.clone(),
        }
    }

    /// Emit the delta from the last state to `next` and advance one version.
    pub fn encode_changes(&mut self, next: Record) -> Result<DeltaFrame> {
        next.conform(&self.schema)?;
        let patch = diff(&self.schema, &self.last_snapshot, &next)?;
        let version = self
            .last_version
            .checked_add(1)
            .ok_or(ProtocolError::VersionExhausted)?;
        let timestamp = self.clock.now_millis();

        trace!(
            stream = %self.stream_id,
            version,
            slots = patch.len(),
            changed = patch.has_changes(),
            "encoded delta frame"
        );

        self.last_snapshot = next;
        self.last_version = version;
        self.last_timestamp = timestamp;

        Ok(DeltaFrame {
            stream_id: self.stream_id,
            version,
            timestamp,
            patch,
        })
    }

    /// Typed form of [`encode_changes`](Self::encode_changes).
    pub fn encode_value<T: Serialize + ?Sized>(&mut self, next: &T) -> Result<DeltaFrame> {
        let record = Record::from_serialize(&self.schema, next)?;
        self.encode_changes(record)
    }

    pub fn stream_id(&self) -> StreamId {
        self.stream_id
    }

    /// Version of the last emitted state.
    pub fn version(&self) -> u64 {
        self.last_version
    }

    pub fn current(&self) -> &Record {
        &self.last_snapshot
    }

    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }
}
