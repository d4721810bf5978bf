//! Record values: the full-state snapshot of an instance.
//!
//! A [`Record`] holds one [`FieldValue`] per schema field, keyed by field
//! name. Scalars are opaque CBOR values; nested records and keyed collections
//! keep their structure so they can be diffed.
//!
//! Typed values enter and leave through serde: [`Record::from_serialize`]
//! serializes into a CBOR value and classifies each field against the schema,
//! [`Record::deserialize`] goes the other way.

use std::collections::BTreeMap;

use ciborium::value::{Integer, Value};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{PatchError, Result};
use crate::schema::{Field, FieldKind, Schema};

/// An opaque scalar, compared by its CBOR encoding.
pub type Scalar = Value;

/// The value of one field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Scalar(Scalar),
    Record(Record),
    Collection(Vec<Record>),
}

impl FieldValue {
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            FieldValue::Scalar(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            FieldValue::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_collection(&self) -> Option<&[Record]> {
        match self {
            FieldValue::Collection(items) => Some(items),
            _ => None,
        }
    }

    fn to_cbor(&self) -> Value {
        match self {
            FieldValue::Scalar(v) => v.clone(),
            FieldValue::Record(r) => r.to_cbor(),
            FieldValue::Collection(items) => Value::Array(items.iter().map(Record::to_cbor).collect()),
        }
    }
}

impl From<Value> for FieldValue {
    fn from(v: Value) -> Self {
        FieldValue::Scalar(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Scalar(Value::Text(v.to_string()))
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Scalar(Value::Text(v))
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Scalar(Value::Bool(v))
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        FieldValue::Scalar(Value::Integer(Integer::from(v)))
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Scalar(Value::Integer(Integer::from(v)))
    }
}

impl From<u64> for FieldValue {
    fn from(v: u64) -> Self {
        FieldValue::Scalar(Value::Integer(Integer::from(v)))
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Scalar(Value::Float(v))
    }
}

impl From<Record> for FieldValue {
    fn from(v: Record) -> Self {
        FieldValue::Record(v)
    }
}

impl From<Vec<Record>> for FieldValue {
    fn from(v: Vec<Record>) -> Self {
        FieldValue::Collection(v)
    }
}

/// Full state of one record instance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: BTreeMap<String, FieldValue>,
}

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Set a field, returning its previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Option<FieldValue> {
        self.fields.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn scalar(&self, name: &str) -> Option<&Scalar> {
        self.get(name).and_then(FieldValue::as_scalar)
    }

    pub fn record(&self, name: &str) -> Option<&Record> {
        self.get(name).and_then(FieldValue::as_record)
    }

    pub fn collection(&self, name: &str) -> Option<&[Record]> {
        self.get(name).and_then(FieldValue::as_collection)
    }

    /// Iterate fields in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Look up a field that the schema says must be present.
    pub(crate) fn require(&self, name: &str) -> Result<&FieldValue> {
        self.fields.get(name).ok_or_else(|| PatchError::MissingField {
            field: name.to_string(),
        })
    }

    /// Check that this record has exactly the schema's fields, each with the
    /// right shape, recursively.
    pub fn conform(&self, schema: &Schema) -> Result<()> {
        if let Some(name) = self.fields.keys().find(|k| schema.field(k).is_none()) {
            return Err(PatchError::UnknownField { field: name.clone() });
        }
        for field in schema.fields() {
            let value = self.require(field.name())?;
            match field.kind() {
                FieldKind::Scalar => {
                    expect_scalar(field, value)?;
                }
                FieldKind::Record(sub) => expect_record(field, value)?.conform(sub)?,
                FieldKind::KeyedCollection { element, .. } => {
                    for item in expect_collection(field, value)? {
                        item.conform(element)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Project a serde value onto `schema`.
    pub fn from_serialize<T: Serialize + ?Sized>(schema: &Schema, value: &T) -> Result<Self> {
        let cbor = Value::serialized(value).map_err(|e| PatchError::Conversion(e.to_string()))?;
        Self::from_cbor(schema, &cbor)
    }

    /// Classify a CBOR map (keyed by field name) against `schema`.
    pub fn from_cbor(schema: &Schema, value: &Value) -> Result<Self> {
        let entries = match value {
            Value::Map(entries) => entries,
            _ => {
                return Err(PatchError::Conversion(format!(
                    "{} must be a map",
                    schema.name()
                )))
            }
        };

        let mut fields = BTreeMap::new();
        for (k, v) in entries {
            let name = match k {
                Value::Text(name) => name,
                other => {
                    return Err(PatchError::Conversion(format!(
                        "{}: non-text field name {:?}",
                        schema.name(),
                        other
                    )))
                }
            };
            let field = schema.field(name).ok_or_else(|| PatchError::UnknownField {
                field: name.clone(),
            })?;
            fields.insert(name.clone(), classify(field, v)?);
        }

        let record = Self { fields };
        for field in schema.fields() {
            record.require(field.name())?;
        }
        Ok(record)
    }

    /// Render as a CBOR map keyed by field name.
    pub fn to_cbor(&self) -> Value {
        Value::Map(
            self.fields
                .iter()
                .map(|(k, v)| (Value::Text(k.clone()), v.to_cbor()))
                .collect(),
        )
    }

    /// Convert back into a typed value.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        self.to_cbor()
            .deserialized()
            .map_err(|e| PatchError::Conversion(e.to_string()))
    }
}

fn classify(field: &Field, value: &Value) -> Result<FieldValue> {
    match field.kind() {
        FieldKind::Scalar => Ok(FieldValue::Scalar(value.clone())),
        FieldKind::Record(sub) => Ok(FieldValue::Record(Record::from_cbor(sub, value)?)),
        FieldKind::KeyedCollection { element, .. } => match value {
            Value::Array(items) => items
                .iter()
                .map(|item| Record::from_cbor(element, item))
                .collect::<Result<Vec<_>>>()
                .map(FieldValue::Collection),
            _ => Err(PatchError::ShapeMismatch {
                field: field.name().to_string(),
                expected: "an array",
            }),
        },
    }
}

pub(crate) fn expect_scalar<'a>(field: &Field, value: &'a FieldValue) -> Result<&'a Scalar> {
    value.as_scalar().ok_or_else(|| shape_mismatch(field))
}

pub(crate) fn expect_record<'a>(field: &Field, value: &'a FieldValue) -> Result<&'a Record> {
    value.as_record().ok_or_else(|| shape_mismatch(field))
}

pub(crate) fn expect_collection<'a>(field: &Field, value: &'a FieldValue) -> Result<&'a [Record]> {
    value.as_collection().ok_or_else(|| shape_mismatch(field))
}

pub(crate) fn shape_mismatch(field: &Field) -> PatchError {
    PatchError::ShapeMismatch {
        field: field.name().to_string(),
        expected: field.kind().describe(),
    }
}

/// CBOR encoding of a scalar. Two scalars are the same value iff their
/// encodings are equal, so `NaN` equals itself and `1` differs from `1.0`.
pub(crate) fn scalar_bytes(value: &Scalar) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf).map_err(|e| PatchError::Conversion(e.to_string()))?;
    Ok(buf)
}

pub(crate) fn same_scalar(a: &Scalar, b: &Scalar) -> Result<bool> {
    Ok(scalar_bytes(a)? == scalar_bytes(b)?)
}
