//! # DeltaStream Testkit
//!
//! Testing utilities for DeltaStream.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: Schemas, serde types, and record builders for common shapes
//! - **Generators**: Proptest strategies for records and delivery plans
//! - **Transport**: A simulated broker with a replayable log
//!
//! ## Property Testing
//!
//! Use the generators with proptest:
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use deltastream_core::{apply, diff};
//! use deltastream_testkit::fixtures::market_board_schema;
//! use deltastream_testkit::generators::market_board;
//!
//! proptest! {
//!     #[test]
//!     fn roundtrip(a in market_board(), b in market_board()) {
//!         let schema = market_board_schema();
//!         let patch = diff(&schema, &a, &b).unwrap();
//!         prop_assert_eq!(apply(&schema, &patch, &a).unwrap(), b);
//!     }
//! }
//! ```
//!
//! ## Simulated Transport
//!
//! ```rust
//! use deltastream_protocol::{Encoder, Frame, StreamConsumer};
//! use deltastream_testkit::fixtures::{person, person_schema};
//! use deltastream_testkit::SimulatedTransport;
//!
//! let schema = person_schema();
//! let mut encoder = Encoder::new(schema.clone(), person("Alice", 0)).unwrap();
//! let mut transport = SimulatedTransport::new();
//!
//! transport.publish_frame(&schema, &Frame::Key(encoder.main_frame())).unwrap();
//! let delta = encoder.encode_changes(person("Alice", 1)).unwrap();
//! transport.publish_frame(&schema, &Frame::Delta(delta)).unwrap();
//!
//! let mut consumer = StreamConsumer::new(schema.clone());
//! for frame in transport.drain_frames(&schema).unwrap() {
//!     consumer.apply_frame(&frame);
//! }
//! assert_eq!(consumer.current_value(), Some(&person("Alice", 1)));
//! ```

pub mod fixtures;
pub mod generators;
pub mod transport;

pub use fixtures::ManualClock;
pub use generators::Delivery;
pub use transport::SimulatedTransport;
