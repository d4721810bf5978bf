//! Keyed collection reconciliation.
//!
//! Lists of records whose schema designates a key field are diffed per
//! element instead of being re-sent whole. A [`CollectionDelta`] carries
//! four independent pieces of bookkeeping:
//!
//! - `deletions`: keys present before and gone now
//! - `additions`: full snapshots of elements that are new
//! - `modifications`: element patches for keys present on both sides
//! - `order`: the complete key sequence of the current list
//!
//! Keys are compared by their CBOR encoding. A list that repeats a key is
//! rejected rather than silently collapsed.

use std::collections::HashMap;

use crate::error::{PatchError, Result};
use crate::patch::{apply, diff, RecordPatch};
use crate::schema::{Field, Schema};
use crate::value::{expect_scalar, same_scalar, scalar_bytes, Record, Scalar};

/// Patch for one element that survived from the baseline.
#[derive(Debug, Clone, PartialEq)]
pub struct Modification {
    pub key: Scalar,
    pub patch: RecordPatch,
}

/// Delta between two keyed lists.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionDelta {
    pub modifications: Vec<Modification>,
    pub additions: Vec<Record>,
    pub deletions: Vec<Scalar>,
    pub order: Vec<Scalar>,
    /// Only the key sequence changed: the three lists above are empty but
    /// `order` differs from the baseline. Derived, never transmitted.
    pub reordered: bool,
}

impl CollectionDelta {
    /// Diff two lists of `schema` elements. `None` is an empty list.
    pub fn create(schema: &Schema, previous: Option<&[Record]>, current: &[Record]) -> Result<Self> {
        let key_field = key_field(schema)?;
        let previous = previous.unwrap_or_default();

        let prev_index = index(schema, key_field, previous)?;
        let curr_index = index(schema, key_field, current)?;
        let prev_keys = previous
            .iter()
            .map(|item| key_of(key_field, item))
            .collect::<Result<Vec<_>>>()?;

        let mut delta = CollectionDelta::default();

        for key in &prev_keys {
            if !curr_index.contains_key(&scalar_bytes(key)?) {
                delta.deletions.push((*key).clone());
            }
        }

        for item in current {
            let key = key_of(key_field, item)?;
            match prev_index.get(&scalar_bytes(key)?) {
                None => delta.additions.push(item.clone()),
                Some(before) => {
                    let patch = diff(schema, before, item)?;
                    if patch.has_changes() {
                        delta.modifications.push(Modification {
                            key: key.clone(),
                            patch,
                        });
                    }
                }
            }
            delta.order.push(key.clone());
        }

        let mut moved = false;
        for (before, after) in prev_keys.iter().zip(&delta.order) {
            if !same_scalar(before, after)? {
                moved = true;
                break;
            }
        }
        delta.reordered = delta.modifications.is_empty()
            && delta.additions.is_empty()
            && delta.deletions.is_empty()
            && moved;

        Ok(delta)
    }

    /// True if the delta changes the list in any way.
    pub fn has_changes(&self) -> bool {
        !self.modifications.is_empty()
            || !self.additions.is_empty()
            || !self.deletions.is_empty()
            || self.reordered
    }

    /// Rebuild the current list from `previous`. `None` is an empty list.
    pub fn apply(&self, schema: &Schema, previous: Option<&[Record]>) -> Result<Vec<Record>> {
        let key_field = key_field(schema)?;
        let previous = previous.unwrap_or_default();

        let mut working: HashMap<Vec<u8>, Record> = HashMap::with_capacity(previous.len());
        for item in previous {
            let key = key_of(key_field, item)?;
            if working.insert(scalar_bytes(key)?, item.clone()).is_some() {
                return Err(duplicate(schema, key));
            }
        }

        for key in &self.deletions {
            working.remove(&scalar_bytes(key)?);
        }

        for modification in &self.modifications {
            let encoded = scalar_bytes(&modification.key)?;
            let existing = working.get(&encoded).ok_or_else(|| {
                PatchError::ConsistencyViolation(format!(
                    "modification targets key {} absent from {} baseline",
                    describe_key(&modification.key),
                    schema.name()
                ))
            })?;
            let updated = apply(schema, &modification.patch, existing)?;
            working.insert(encoded, updated);
        }

        for item in &self.additions {
            let key = key_of(key_field, item)?;
            working.insert(scalar_bytes(key)?, item.clone());
        }

        self.order
            .iter()
            .map(|key| {
                working.remove(&scalar_bytes(key)?).ok_or_else(|| {
                    PatchError::ConsistencyViolation(format!(
                        "order lists key {} absent from reconciled {}",
                        describe_key(key),
                        schema.name()
                    ))
                })
            })
            .collect()
    }
}

fn key_field(schema: &Schema) -> Result<&Field> {
    schema
        .key_field()
        .ok_or_else(|| PatchError::NoKeyField(schema.name().to_string()))
}

fn key_of<'a>(key_field: &Field, item: &'a Record) -> Result<&'a Scalar> {
    expect_scalar(key_field, item.require(key_field.name())?)
}

fn index<'a>(
    schema: &Schema,
    key_field: &Field,
    items: &'a [Record],
) -> Result<HashMap<Vec<u8>, &'a Record>> {
    let mut map = HashMap::with_capacity(items.len());
    for item in items {
        let key = key_of(key_field, item)?;
        if map.insert(scalar_bytes(key)?, item).is_some() {
            return Err(duplicate(schema, key));
        }
    }
    Ok(map)
}

fn duplicate(schema: &Schema, key: &Scalar) -> PatchError {
    PatchError::DuplicateKey {
        schema: schema.name().to_string(),
        key: describe_key(key),
    }
}

/// Human-readable rendering of a key for error messages.
pub(crate) fn describe_key(key: &Scalar) -> String {
    match key {
        Scalar::Text(s) => s.clone(),
        Scalar::Integer(i) => i128::from(*i).to_string(),
        other => format!("{other:?}"),
    }
}
