//! Patch compilation: sparse "changed fields only" records.
//!
//! [`diff`] walks a schema in field order and keeps a slot only for fields
//! that changed. [`apply`] rebuilds the full record from a baseline. For any
//! two conforming records `a` and `b`:
//!
//! ```text
//! apply(s, diff(s, a, b), a) == b
//! diff(s, a, a).has_changes() == false
//! ```

use std::collections::BTreeMap;

use crate::collection::CollectionDelta;
use crate::error::{PatchError, Result};
use crate::schema::{FieldKind, Schema};
use crate::value::{
    expect_collection, expect_record, expect_scalar, same_scalar, shape_mismatch, FieldValue,
    Record, Scalar,
};

/// A present patch slot.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    /// New value of a scalar field.
    Scalar(Scalar),
    /// Changes inside a nested record.
    Record(RecordPatch),
    /// Changes to a keyed collection.
    Collection(CollectionDelta),
}

impl Slot {
    pub fn has_changes(&self) -> bool {
        match self {
            Slot::Scalar(_) => true,
            Slot::Record(patch) => patch.has_changes(),
            Slot::Collection(delta) => delta.has_changes(),
        }
    }
}

/// One optional slot per field; absent slots mean "unchanged".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordPatch {
    slots: BTreeMap<String, Slot>,
}

impl RecordPatch {
    /// Create a patch with no slots.
    pub fn new() -> Self {
        Self::default()
    }

    /// True if any slot is present, recursively. Never transmitted.
    pub fn has_changes(&self) -> bool {
        self.slots.values().any(Slot::has_changes)
    }

    pub fn insert(&mut self, name: impl Into<String>, slot: Slot) -> Option<Slot> {
        self.slots.insert(name.into(), slot)
    }

    pub fn get(&self, name: &str) -> Option<&Slot> {
        self.slots.get(name)
    }

    pub fn scalar(&self, name: &str) -> Option<&Scalar> {
        match self.get(name) {
            Some(Slot::Scalar(v)) => Some(v),
            _ => None,
        }
    }

    pub fn record(&self, name: &str) -> Option<&RecordPatch> {
        match self.get(name) {
            Some(Slot::Record(p)) => Some(p),
            _ => None,
        }
    }

    pub fn collection(&self, name: &str) -> Option<&CollectionDelta> {
        match self.get(name) {
            Some(Slot::Collection(d)) => Some(d),
            _ => None,
        }
    }

    /// Iterate present slots in field name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Slot)> {
        self.slots.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Compute the patch that turns `previous` into `current`.
pub fn diff(schema: &Schema, previous: &Record, current: &Record) -> Result<RecordPatch> {
    let mut patch = RecordPatch::new();

    for field in schema.fields() {
        let before = previous.require(field.name())?;
        let after = current.require(field.name())?;

        match field.kind() {
            FieldKind::Scalar => {
                let after = expect_scalar(field, after)?;
                if !same_scalar(expect_scalar(field, before)?, after)? {
                    patch.insert(field.name(), Slot::Scalar(after.clone()));
                }
            }
            FieldKind::Record(sub) => {
                let nested = diff(sub, expect_record(field, before)?, expect_record(field, after)?)?;
                if nested.has_changes() {
                    patch.insert(field.name(), Slot::Record(nested));
                }
            }
            FieldKind::KeyedCollection { element, .. } => {
                let delta = CollectionDelta::create(
                    element,
                    Some(expect_collection(field, before)?),
                    expect_collection(field, after)?,
                )?;
                if delta.has_changes() {
                    patch.insert(field.name(), Slot::Collection(delta));
                }
            }
        }
    }

    Ok(patch)
}

/// Apply `patch` to `baseline`, producing the updated record.
pub fn apply(schema: &Schema, patch: &RecordPatch, baseline: &Record) -> Result<Record> {
    if let Some((name, _)) = patch.iter().find(|(name, _)| schema.field(name).is_none()) {
        return Err(PatchError::UnknownField {
            field: name.to_string(),
        });
    }

    let mut record = Record::new();

    for field in schema.fields() {
        let base = baseline.require(field.name())?;

        let value = match (field.kind(), patch.get(field.name())) {
            (_, None) => base.clone(),
            (FieldKind::Scalar, Some(Slot::Scalar(v))) => FieldValue::Scalar(v.clone()),
            (FieldKind::Record(sub), Some(Slot::Record(nested))) => {
                FieldValue::Record(apply(sub, nested, expect_record(field, base)?)?)
            }
            (FieldKind::KeyedCollection { element, .. }, Some(Slot::Collection(delta))) => {
                FieldValue::Collection(delta.apply(element, Some(expect_collection(field, base)?))?)
            }
            (_, Some(_)) => return Err(shape_mismatch(field)),
        };

        record.insert(field.name(), value);
    }

    Ok(record)
}
