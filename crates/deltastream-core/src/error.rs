//! Error types for DeltaStream Core.

use thiserror::Error;

/// Errors raised while building a [`Schema`](crate::Schema).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("schema {schema}: field name must not be empty")]
    EmptyFieldName { schema: String },

    #[error("schema {schema}: duplicate field {field}")]
    DuplicateField { schema: String, field: String },

    #[error("schema {schema}: more than one key field ({first}, {second})")]
    MultipleKeys {
        schema: String,
        first: String,
        second: String,
    },

    #[error("schema {schema}: collection field {field} uses element schema {element}, which has no key field")]
    ElementWithoutKey {
        schema: String,
        field: String,
        element: String,
    },

    #[error("schema {schema}: rename targets unknown field {field}")]
    UnknownRenameTarget { schema: String, field: String },

    #[error("schema {schema}: wire name {wire_name:?} is shared by {first} and {second}")]
    WireNameCollision {
        schema: String,
        wire_name: String,
        first: String,
        second: String,
    },
}

/// Errors raised while computing or applying patches.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PatchError {
    /// A keyed-collection modification or order entry references a key that
    /// is not present in the reconciled map.
    #[error("consistency violation: {0}")]
    ConsistencyViolation(String),

    /// The same key appears twice in one collection.
    #[error("duplicate key {key} in keyed collection of {schema}")]
    DuplicateKey { schema: String, key: String },

    /// A keyed collection was reconciled against a schema without a key.
    #[error("schema {0} has no key field")]
    NoKeyField(String),

    #[error("record is missing field {field}")]
    MissingField { field: String },

    #[error("unknown field {field}")]
    UnknownField { field: String },

    #[error("field {field}: expected {expected}")]
    ShapeMismatch { field: String, expected: &'static str },

    /// Failure converting between a typed value and a record.
    #[error("conversion error: {0}")]
    Conversion(String),
}

/// Result type for patch operations.
pub type Result<T> = std::result::Result<T, PatchError>;
