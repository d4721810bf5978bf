//! # DeltaStream Protocol
//!
//! Versioned frame stream on top of [`deltastream_core`] patches.
//!
//! ## Overview
//!
//! One [`Encoder`] per producer turns successive full states into frames.
//! Version 0 is the initial state; each call to
//! [`Encoder::encode_changes`] emits a [`DeltaFrame`] one version later.
//! [`Encoder::main_frame`] returns the current state as a [`KeyFrame`] for
//! late joiners and recovery.
//!
//! A [`StreamConsumer`] on the receiving side wraps a [`Decoder`] and
//! tolerates an unreliable channel: duplicates and foreign frames are
//! ignored, gaps raise `needs_recovery` until a key frame arrives.
//!
//! ## Usage
//!
//! ```rust
//! use deltastream_core::{Record, Schema};
//! use deltastream_protocol::{Encoder, Frame, StreamConsumer};
//!
//! let schema = Schema::builder("Person")
//!     .scalar("Name")
//!     .scalar("Score")
//!     .build()
//!     .unwrap();
//!
//! let person = |score: i64| Record::new().with("Name", "Alice").with("Score", score);
//!
//! let mut encoder = Encoder::new(schema.clone(), person(100)).unwrap();
//! let mut consumer = StreamConsumer::new(schema);
//!
//! consumer.apply_frame(&Frame::Key(encoder.main_frame()));
//! let delta = encoder.encode_changes(person(200)).unwrap();
//! consumer.apply_frame(&Frame::Delta(delta));
//!
//! assert_eq!(consumer.current_value(), Some(&person(200)));
//! assert_eq!(consumer.current_version(), 1);
//! ```
//!
//! ## Message Flow
//!
//! ```text
//! Encoder                             StreamConsumer
//!   |-------- KeyFrame v0 ------------->|  Uninitialized -> Synced
//!   |-------- DeltaFrame v1 ----------->|  applied
//!   |-------- DeltaFrame v2 ---X        |  (lost)
//!   |-------- DeltaFrame v3 ----------->|  gap: needs_recovery
//!   |<------- (caller asks for key) ----|
//!   |-------- KeyFrame v3 ------------->|  Synced
//! ```

pub mod consumer;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod frame;
pub mod stream;
pub mod wire;

pub use consumer::{ApplyOutcome, ConsumerState, Rejection, StreamConsumer};
pub use decoder::Decoder;
pub use encoder::{Clock, Encoder, EncoderConfig, SystemClock};
pub use error::{ProtocolError, Result};
pub use frame::{DeltaFrame, Frame, FrameKind, KeyFrame};
pub use stream::StreamId;
pub use wire::{decode_frame, encode_frame, frame_from_value, frame_to_value};
