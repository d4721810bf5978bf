//! # DeltaStream Core
//!
//! Pure primitives for DeltaStream: schemas, short wire names, patches, and
//! keyed collection reconciliation.
//!
//! This crate contains no I/O and no clocks. Everything here is a function
//! of a [`Schema`] and the records it describes.
//!
//! ## Key Types
//!
//! - [`Schema`] - Immutable description of a record type
//! - [`Record`] - Full-state snapshot of one instance
//! - [`RecordPatch`] - Sparse "changed fields only" view between two records
//! - [`CollectionDelta`] - Per-element changes to a keyed list
//!
//! ## Diff and apply
//!
//! ```
//! use deltastream_core::{apply, diff, Record, Schema};
//!
//! let person = Schema::builder("Person")
//!     .scalar("Name")
//!     .scalar("Score")
//!     .build()
//!     .unwrap();
//!
//! let before = Record::new().with("Name", "Alice").with("Score", 100i64);
//! let after = Record::new().with("Name", "Alice").with("Score", 200i64);
//!
//! let patch = diff(&person, &before, &after).unwrap();
//! assert!(patch.get("Name").is_none());
//! assert_eq!(apply(&person, &patch, &before).unwrap(), after);
//! ```

pub mod collection;
pub mod error;
pub mod names;
pub mod patch;
pub mod schema;
pub mod value;

pub use collection::{CollectionDelta, Modification};
pub use error::{PatchError, Result, SchemaError};
pub use names::{allocate_short_names, find_collisions};
pub use patch::{apply, diff, RecordPatch, Slot};
pub use schema::{Field, FieldKind, Schema, SchemaBuilder, SchemaOptions, SchemaRef};
pub use value::{FieldValue, Record, Scalar};
