//! # DeltaStream
//!
//! The unified API for DeltaStream: schema-driven change streams.
//!
//! ## Overview
//!
//! A [`Schema`] describes a record type once. From it, DeltaStream derives
//! a full snapshot form and a sparse patch form, diffs nested records field
//! by field, and reconciles keyed collections element by element. On top of
//! that sits a single-writer frame stream with gap detection and recovery.
//!
//! - **Patches**: only changed fields travel; unchanged slots stay absent
//! - **Keyed collections**: per-element additions, deletions, modifications
//! - **Frames**: key frames carry full state, delta frames carry patches
//! - **Consumers**: drop duplicates, ignore foreign producers, flag gaps
//!
//! ## Usage
//!
//! ```rust
//! use deltastream::{Publisher, Schema, Subscriber};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, PartialEq, Serialize, Deserialize)]
//! #[serde(rename_all = "PascalCase")]
//! struct Person {
//!     name: String,
//!     score: i64,
//! }
//!
//! let schema = Schema::builder("Person")
//!     .scalar("Name")
//!     .scalar("Score")
//!     .build()
//!     .unwrap();
//!
//! let alice = |score| Person { name: "Alice".into(), score };
//!
//! let mut publisher = Publisher::new(schema.clone(), &alice(100)).unwrap();
//! let mut subscriber = Subscriber::<Person>::new(schema);
//!
//! subscriber.receive(&publisher.key_frame());
//! subscriber.receive(&publisher.publish(&alice(200)).unwrap());
//!
//! assert_eq!(subscriber.current().unwrap(), Some(alice(200)));
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `deltastream::core` - Schemas, records, patches, keyed collections
//! - `deltastream::protocol` - Frames, encoder, decoder, consumer, wire mapping

pub mod error;
pub mod typed;

// Re-export component crates
pub use deltastream_core as core;
pub use deltastream_protocol as protocol;

// Re-export main types for convenience
pub use error::{Error, Result};
pub use typed::{Publisher, Subscriber};

// Re-export commonly used types
pub use deltastream_core::{
    apply, diff, CollectionDelta, FieldKind, FieldValue, Record, RecordPatch, Schema,
    SchemaBuilder, SchemaOptions, SchemaRef, Slot,
};
pub use deltastream_protocol::{
    ApplyOutcome, ConsumerState, Decoder, DeltaFrame, Encoder, EncoderConfig, Frame, KeyFrame,
    Rejection, StreamConsumer, StreamId,
};
