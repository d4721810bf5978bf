//! Structured-value mapping for frames.
//!
//! Frames, records, patches, and collection deltas map onto
//! [`ciborium::value::Value`] maps keyed by short codes. Record fields use the
//! schema's wire names; absent patch slots are simply left out. The envelope
//! and delta codes are fixed:
//!
//! | key | meaning |
//! |-----|---------|
//! | `f` | frame kind (0 = key, 1 = delta) |
//! | `u` | stream id (16 bytes) |
//! | `v` | version |
//! | `t` | timestamp (unix ms) |
//! | `d` | key frame value |
//! | `p` | delta frame patch |
//!
//! A collection delta is `{m: [{k, p}], a: [record], d: [key], o: [key]}`,
//! with empty `m`, `a`, and `d` omitted. `o` is always present.
//!
//! [`encode_frame`] and [`decode_frame`] add the CBOR byte layer on top.

use ciborium::value::Value;

use deltastream_core::{
    CollectionDelta, Field, FieldKind, FieldValue, Modification, PatchError, Record, RecordPatch,
    Schema, Slot,
};

use crate::error::{ProtocolError, Result};
use crate::frame::{DeltaFrame, Frame, FrameKind, KeyFrame};
use crate::stream::StreamId;

/// Envelope keys.
mod envelope {
    pub const KIND: &str = "f";
    pub const STREAM_ID: &str = "u";
    pub const VERSION: &str = "v";
    pub const TIMESTAMP: &str = "t";
    pub const VALUE: &str = "d";
    pub const PATCH: &str = "p";
}

/// Collection delta keys.
mod delta {
    pub const MODIFICATIONS: &str = "m";
    pub const ADDITIONS: &str = "a";
    pub const DELETIONS: &str = "d";
    pub const ORDER: &str = "o";
    pub const KEY: &str = "k";
    pub const PATCH: &str = "p";
}

/// Encode a frame to CBOR bytes.
pub fn encode_frame(schema: &Schema, frame: &Frame) -> Result<Vec<u8>> {
    let value = frame_to_value(schema, frame)?;
    let mut buf = Vec::new();
    ciborium::into_writer(&value, &mut buf).map_err(|e| ProtocolError::Encoding(e.to_string()))?;
    Ok(buf)
}

/// Decode a frame from CBOR bytes.
pub fn decode_frame(schema: &Schema, bytes: &[u8]) -> Result<Frame> {
    let value: Value =
        ciborium::from_reader(bytes).map_err(|e| ProtocolError::Decoding(e.to_string()))?;
    frame_from_value(schema, &value)
}

pub fn frame_to_value(schema: &Schema, frame: &Frame) -> Result<Value> {
    let mut entries = vec![
        (text(envelope::KIND), Value::Integer(frame.kind().to_u8().into())),
        (text(envelope::STREAM_ID), Value::Bytes(frame.stream_id().as_bytes().to_vec())),
        (text(envelope::VERSION), Value::Integer(frame.version().into())),
        (text(envelope::TIMESTAMP), Value::Integer(frame.timestamp().into())),
    ];

    match frame {
        Frame::Key(key) => entries.push((text(envelope::VALUE), record_to_value(schema, &key.value)?)),
        Frame::Delta(d) => entries.push((text(envelope::PATCH), patch_to_value(schema, &d.patch)?)),
    }

    Ok(Value::Map(entries))
}

pub fn frame_from_value(schema: &Schema, value: &Value) -> Result<Frame> {
    let map = as_map(value, "frame")?;

    let kind = match get(map, envelope::KIND) {
        Some(Value::Integer(i)) => u8::try_from(*i).ok().and_then(FrameKind::from_u8),
        _ => None,
    }
    .ok_or_else(|| wire("frame kind must be 0 or 1"))?;

    let stream_id = match get(map, envelope::STREAM_ID) {
        Some(Value::Bytes(b)) => StreamId::from_slice(b),
        _ => None,
    }
    .ok_or_else(|| wire("stream id must be 16 bytes"))?;

    let version = match get(map, envelope::VERSION) {
        Some(Value::Integer(i)) => u64::try_from(*i).ok(),
        _ => None,
    }
    .ok_or_else(|| wire("version must be an unsigned integer"))?;

    let timestamp = match get(map, envelope::TIMESTAMP) {
        Some(Value::Integer(i)) => i64::try_from(*i).ok(),
        _ => None,
    }
    .ok_or_else(|| wire("timestamp must be a 64-bit integer"))?;

    let frame = match kind {
        FrameKind::Key => {
            let body = get(map, envelope::VALUE).ok_or_else(|| wire("key frame without value"))?;
            Frame::Key(KeyFrame {
                stream_id,
                version,
                timestamp,
                value: record_from_value(schema, body)?,
            })
        }
        FrameKind::Delta => {
            let body = get(map, envelope::PATCH).ok_or_else(|| wire("delta frame without patch"))?;
            Frame::Delta(DeltaFrame {
                stream_id,
                version,
                timestamp,
                patch: patch_from_value(schema, body)?,
            })
        }
    };

    Ok(frame)
}

/// Map a full record to `{wire_name: value}`.
pub fn record_to_value(schema: &Schema, record: &Record) -> Result<Value> {
    let mut entries = Vec::with_capacity(schema.fields().len());
    for field in schema.fields() {
        let value = record.get(field.name()).ok_or_else(|| PatchError::MissingField {
            field: field.name().to_string(),
        })?;
        let encoded = match (field.kind(), value) {
            (FieldKind::Scalar, FieldValue::Scalar(v)) => v.clone(),
            (FieldKind::Record(sub), FieldValue::Record(r)) => record_to_value(sub, r)?,
            (FieldKind::KeyedCollection { element, .. }, FieldValue::Collection(items)) => {
                records_to_value(element, items)?
            }
            _ => return Err(shape_mismatch(field)),
        };
        entries.push((text(field.wire_name()), encoded));
    }
    Ok(Value::Map(entries))
}

pub fn record_from_value(schema: &Schema, value: &Value) -> Result<Record> {
    let mut record = Record::new();
    for (key, v) in as_map(value, schema.name())? {
        let field = field_for(schema, key)?;
        let decoded = match field.kind() {
            FieldKind::Scalar => FieldValue::Scalar(v.clone()),
            FieldKind::Record(sub) => FieldValue::Record(record_from_value(sub, v)?),
            FieldKind::KeyedCollection { element, .. } => FieldValue::Collection(
                as_array(v, field.wire_name())?
                    .iter()
                    .map(|item| record_from_value(element, item))
                    .collect::<Result<_>>()?,
            ),
        };
        record.insert(field.name(), decoded);
    }

    if let Some(missing) = schema.fields().iter().find(|f| record.get(f.name()).is_none()) {
        return Err(PatchError::MissingField {
            field: missing.name().to_string(),
        }
        .into());
    }
    Ok(record)
}

/// Map a patch to `{wire_name: slot}`, leaving out absent slots.
pub fn patch_to_value(schema: &Schema, patch: &RecordPatch) -> Result<Value> {
    if let Some((name, _)) = patch.iter().find(|(name, _)| schema.field(name).is_none()) {
        return Err(PatchError::UnknownField {
            field: name.to_string(),
        }
        .into());
    }

    let mut entries = Vec::with_capacity(patch.len());
    for field in schema.fields() {
        let Some(slot) = patch.get(field.name()) else {
            continue;
        };
        let encoded = match (field.kind(), slot) {
            (FieldKind::Scalar, Slot::Scalar(v)) => v.clone(),
            (FieldKind::Record(sub), Slot::Record(nested)) => patch_to_value(sub, nested)?,
            (FieldKind::KeyedCollection { element, .. }, Slot::Collection(d)) => {
                delta_to_value(element, d)?
            }
            _ => return Err(shape_mismatch(field)),
        };
        entries.push((text(field.wire_name()), encoded));
    }
    Ok(Value::Map(entries))
}

pub fn patch_from_value(schema: &Schema, value: &Value) -> Result<RecordPatch> {
    let mut patch = RecordPatch::new();
    for (key, v) in as_map(value, schema.name())? {
        let field = field_for(schema, key)?;
        let slot = match field.kind() {
            FieldKind::Scalar => Slot::Scalar(v.clone()),
            FieldKind::Record(sub) => Slot::Record(patch_from_value(sub, v)?),
            FieldKind::KeyedCollection { element, .. } => {
                Slot::Collection(delta_from_value(element, v)?)
            }
        };
        patch.insert(field.name(), slot);
    }
    Ok(patch)
}

/// Map a collection delta over `element` records.
pub fn delta_to_value(element: &Schema, d: &CollectionDelta) -> Result<Value> {
    let mut entries = Vec::with_capacity(4);

    if !d.modifications.is_empty() {
        let mods = d
            .modifications
            .iter()
            .map(|m| -> Result<Value> {
                Ok(Value::Map(vec![
                    (text(delta::KEY), m.key.clone()),
                    (text(delta::PATCH), patch_to_value(element, &m.patch)?),
                ]))
            })
            .collect::<Result<Vec<_>>>()?;
        entries.push((text(delta::MODIFICATIONS), Value::Array(mods)));
    }
    if !d.additions.is_empty() {
        entries.push((text(delta::ADDITIONS), records_to_value(element, &d.additions)?));
    }
    if !d.deletions.is_empty() {
        entries.push((text(delta::DELETIONS), Value::Array(d.deletions.clone())));
    }
    entries.push((text(delta::ORDER), Value::Array(d.order.clone())));

    Ok(Value::Map(entries))
}

/// Inverse of [`delta_to_value`].
///
/// A transmitted delta with no modifications, additions, or deletions can
/// only be a reorder, so `reordered` is set exactly in that case.
pub fn delta_from_value(element: &Schema, value: &Value) -> Result<CollectionDelta> {
    let map = as_map(value, "collection delta")?;

    let modifications = optional_array(map, delta::MODIFICATIONS)?
        .iter()
        .map(|m| -> Result<Modification> {
            let entry = as_map(m, "modification")?;
            let key = get(entry, delta::KEY).ok_or_else(|| wire("modification without key"))?;
            let patch = get(entry, delta::PATCH).ok_or_else(|| wire("modification without patch"))?;
            Ok(Modification {
                key: key.clone(),
                patch: patch_from_value(element, patch)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let additions = optional_array(map, delta::ADDITIONS)?
        .iter()
        .map(|item| record_from_value(element, item))
        .collect::<Result<Vec<_>>>()?;

    let deletions = optional_array(map, delta::DELETIONS)?.to_vec();

    let order = match get(map, delta::ORDER) {
        Some(v) => as_array(v, delta::ORDER)?.to_vec(),
        None => return Err(wire("collection delta without order")),
    };

    let reordered = modifications.is_empty() && additions.is_empty() && deletions.is_empty();

    Ok(CollectionDelta {
        modifications,
        additions,
        deletions,
        order,
        reordered,
    })
}

fn records_to_value(schema: &Schema, items: &[Record]) -> Result<Value> {
    items
        .iter()
        .map(|item| record_to_value(schema, item))
        .collect::<Result<Vec<_>>>()
        .map(Value::Array)
}

fn field_for<'a>(schema: &'a Schema, key: &Value) -> Result<&'a Field> {
    let code = match key {
        Value::Text(code) => code,
        other => return Err(wire(format!("{}: non-text key {:?}", schema.name(), other))),
    };
    schema
        .field_by_wire_name(code)
        .ok_or_else(|| wire(format!("{}: unknown wire name {:?}", schema.name(), code)))
}

fn get<'a>(map: &'a [(Value, Value)], key: &str) -> Option<&'a Value> {
    map.iter()
        .find(|(k, _)| matches!(k, Value::Text(t) if t == key))
        .map(|(_, v)| v)
}

fn as_map<'a>(value: &'a Value, what: &str) -> Result<&'a [(Value, Value)]> {
    match value {
        Value::Map(entries) => Ok(entries),
        _ => Err(wire(format!("{what} must be a map"))),
    }
}

fn optional_array<'a>(map: &'a [(Value, Value)], key: &str) -> Result<&'a [Value]> {
    match get(map, key) {
        Some(v) => as_array(v, key),
        None => Ok(&[]),
    }
}

fn as_array<'a>(value: &'a Value, what: &str) -> Result<&'a [Value]> {
    match value {
        Value::Array(items) => Ok(items),
        _ => Err(wire(format!("{what} must be an array"))),
    }
}

fn text(s: &str) -> Value {
    Value::Text(s.to_string())
}

fn wire(msg: impl Into<String>) -> ProtocolError {
    ProtocolError::Wire(msg.into())
}

fn shape_mismatch(field: &Field) -> ProtocolError {
    PatchError::ShapeMismatch {
        field: field.name().to_string(),
        expected: field.kind().describe(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::Encoder;
    use deltastream_core::SchemaRef;
    use std::collections::BTreeSet;

    fn minified_schema() -> SchemaRef {
        Schema::builder("MinifiedDto")
            .minify_names(true)
            .scalar("Name")
            .scalar("Score")
            .scalar("Price")
            .scalar("IsActive")
            .scalar("Id")
            .build()
            .unwrap()
    }

    fn minified(name: &str) -> Record {
        Record::new()
            .with("Name", name)
            .with("Score", 100i64)
            .with("Price", 9.99)
            .with("IsActive", true)
            .with("Id", 1i64)
    }

    fn board_schema() -> SchemaRef {
        let item = Schema::builder("MarketItem")
            .key("Id")
            .scalar("Price")
            .scalar("Volume")
            .build()
            .unwrap();
        Schema::builder("MarketBoard")
            .scalar("Name")
            .keyed_collection("Items", item)
            .build()
            .unwrap()
    }

    fn board(items: &[(&str, f64, i64)]) -> Record {
        Record::new().with("Name", "Main").with(
            "Items",
            items
                .iter()
                .map(|(id, price, volume)| {
                    Record::new()
                        .with("Id", *id)
                        .with("Price", *price)
                        .with("Volume", *volume)
                })
                .collect::<Vec<_>>(),
        )
    }

    fn json_keys(value: &serde_json::Value) -> BTreeSet<String> {
        value.as_object().unwrap().keys().cloned().collect()
    }

    fn keys(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_key_frame_envelope_uses_short_names() {
        let schema = minified_schema();
        let encoder = Encoder::new(schema.clone(), minified("Alice")).unwrap();

        let value = frame_to_value(&schema, &Frame::from(encoder.main_frame())).unwrap();
        let json = serde_json::to_value(&value).unwrap();

        assert_eq!(json_keys(&json), keys(&["d", "f", "t", "u", "v"]));
        assert_eq!(json["f"], 0);
        assert_eq!(json_keys(&json["d"]), keys(&["id", "is", "n", "p", "s"]));
        assert_eq!(json["d"]["n"], "Alice");
    }

    #[test]
    fn test_delta_frame_envelope_uses_short_names() {
        let schema = minified_schema();
        let mut encoder = Encoder::new(schema.clone(), minified("Alice")).unwrap();
        let frame = encoder.encode_changes(minified("Bob")).unwrap();

        let value = frame_to_value(&schema, &Frame::from(frame)).unwrap();
        let json = serde_json::to_value(&value).unwrap();

        assert_eq!(json_keys(&json), keys(&["f", "p", "t", "u", "v"]));
        assert_eq!(json["f"], 1);
        assert_eq!(json["v"], 1);
        assert_eq!(json_keys(&json["p"]), keys(&["n"]));
        assert_eq!(json["p"]["n"], "Bob");
    }

    #[test]
    fn test_unminified_fields_keep_their_names() {
        let schema = board_schema();
        let value = record_to_value(&schema, &board(&[("A", 1.0, 100)])).unwrap();
        let json = serde_json::to_value(&value).unwrap();

        assert_eq!(json_keys(&json), keys(&["Items", "Name"]));
        assert_eq!(json_keys(&json["Items"][0]), keys(&["Id", "Price", "Volume"]));
    }

    #[test]
    fn test_renamed_field_on_wire() {
        let schema = Schema::builder("Ticker")
            .propagate_renames(true)
            .scalar("Symbol")
            .scalar("LastPrice")
            .rename("LastPrice", "px")
            .build()
            .unwrap();
        let record = Record::new().with("Symbol", "ABC").with("LastPrice", 12.5);

        let value = record_to_value(&schema, &record).unwrap();
        let json = serde_json::to_value(&value).unwrap();
        assert_eq!(json_keys(&json), keys(&["Symbol", "px"]));
        assert_eq!(record_from_value(&schema, &value).unwrap(), record);
    }

    #[test]
    fn test_collection_delta_omits_empty_lists() {
        let schema = board_schema();
        let mut encoder =
            Encoder::new(schema.clone(), board(&[("A", 1.0, 100), ("B", 2.0, 200)])).unwrap();
        let frame = encoder
            .encode_changes(board(&[("A", 1.5, 100), ("B", 2.0, 200)]))
            .unwrap();

        let value = patch_to_value(&schema, &frame.patch).unwrap();
        let json = serde_json::to_value(&value).unwrap();

        assert_eq!(json_keys(&json), keys(&["Items"]));
        assert_eq!(json_keys(&json["Items"]), keys(&["m", "o"]));
        assert_eq!(json["Items"]["m"][0]["k"], "A");
        assert_eq!(json_keys(&json["Items"]["m"][0]["p"]), keys(&["Price"]));
        assert_eq!(json["Items"]["o"], serde_json::json!(["A", "B"]));
    }

    #[test]
    fn test_frames_survive_bytes() {
        let schema = board_schema();
        let mut encoder =
            Encoder::new(schema.clone(), board(&[("A", 1.0, 100), ("B", 2.0, 200)])).unwrap();

        let key: Frame = encoder.main_frame().into();
        let changed: Frame = encoder
            .encode_changes(board(&[("C", 3.0, 300), ("A", 1.5, 100)]))
            .unwrap()
            .into();
        let reordered: Frame = encoder
            .encode_changes(board(&[("A", 1.5, 100), ("C", 3.0, 300)]))
            .unwrap()
            .into();
        let heartbeat: Frame = encoder
            .encode_changes(board(&[("A", 1.5, 100), ("C", 3.0, 300)]))
            .unwrap()
            .into();

        for frame in [key, changed, reordered, heartbeat] {
            let bytes = encode_frame(&schema, &frame).unwrap();
            assert_eq!(decode_frame(&schema, &bytes).unwrap(), frame);
        }
    }

    #[test]
    fn test_unknown_wire_name_rejected() {
        let schema = minified_schema();
        let value = Value::Map(vec![(text("zz"), Value::Bool(true))]);

        assert!(matches!(
            patch_from_value(&schema, &value),
            Err(ProtocolError::Wire(msg)) if msg.contains("zz")
        ));
    }

    #[test]
    fn test_incomplete_record_rejected() {
        let schema = minified_schema();
        let value = Value::Map(vec![(text("n"), text("Alice"))]);

        assert!(matches!(
            record_from_value(&schema, &value),
            Err(ProtocolError::Patch(PatchError::MissingField { .. }))
        ));
    }

    #[test]
    fn test_bad_envelope_rejected() {
        let schema = minified_schema();
        let encoder = Encoder::new(schema.clone(), minified("Alice")).unwrap();
        let mut value = frame_to_value(&schema, &Frame::from(encoder.main_frame())).unwrap();

        if let Value::Map(entries) = &mut value {
            entries[0].1 = Value::Integer(7.into());
        }
        assert!(matches!(
            frame_from_value(&schema, &value),
            Err(ProtocolError::Wire(msg)) if msg.contains("kind")
        ));
    }

    #[test]
    fn test_garbage_bytes_rejected() {
        let schema = minified_schema();
        assert!(matches!(
            decode_frame(&schema, &[0xff, 0x00, 0x13]),
            Err(ProtocolError::Decoding(_) | ProtocolError::Wire(_))
        ));
    }
}
