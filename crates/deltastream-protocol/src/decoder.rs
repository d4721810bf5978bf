//! Frame decoder.
//!
//! A [`Decoder`] holds a baseline key frame and folds later frames into it.
//! It refuses frames from another stream and frames older than the baseline,
//! but it does not look for gaps: a delta that skips versions is applied
//! onto whatever the baseline is. Gap detection belongs to
//! [`StreamConsumer`](crate::StreamConsumer).

use serde::de::DeserializeOwned;

use deltastream_core::{apply, Record, SchemaRef};

use crate::error::{ProtocolError, Result};
use crate::frame::{Frame, KeyFrame};
use crate::stream::StreamId;

#[derive(Debug, Clone)]
pub struct Decoder {
    schema: SchemaRef,
    baseline: KeyFrame,
}

impl Decoder {
    /// Bootstrap from a key frame.
    pub fn new(schema: SchemaRef, bootstrap: KeyFrame) -> Result<Self> {
        bootstrap.value.conform(&schema)?;
        Ok(Self {
            schema,
            baseline: bootstrap,
        })
    }

    /// Fold `frame` into the baseline and return the new value.
    ///
    /// A key frame replaces the baseline outright and may jump to any
    /// version at or above the current one. A delta frame is applied to the
    /// baseline value and its version and timestamp are adopted.
    pub fn decode_frame(&mut self, frame: &Frame) -> Result<&Record> {
        if frame.stream_id() != self.baseline.stream_id {
            return Err(ProtocolError::StreamMismatch {
                expected: self.baseline.stream_id,
                got: frame.stream_id(),
            });
        }
        if frame.version() < self.baseline.version {
            return Err(ProtocolError::StaleFrame {
                version: frame.version(),
                baseline: self.baseline.version,
            });
        }

        match frame {
            Frame::Key(key) => {
                key.value.conform(&self.schema)?;
                self.baseline = key.clone();
            }
            Frame::Delta(delta) => {
                let value = apply(&self.schema, &delta.patch, &self.baseline.value)?;
                self.baseline.version = delta.version;
                self.baseline.timestamp = delta.timestamp;
                self.baseline.value = value;
            }
        }

        Ok(&self.baseline.value)
    }

    pub fn value(&self) -> &Record {
        &self.baseline.value
    }

    /// Typed view of the current value.
    pub fn value_as<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(self.baseline.value.deserialize()?)
    }

    pub fn version(&self) -> u64 {
        self.baseline.version
    }

    pub fn timestamp(&self) -> i64 {
        self.baseline.timestamp
    }

    pub fn stream_id(&self) -> StreamId {
        self.baseline.stream_id
    }

    pub fn baseline(&self) -> &KeyFrame {
        &self.baseline
    }

    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::Encoder;
    use crate::frame::DeltaFrame;
    use deltastream_core::{PatchError, RecordPatch, Schema, Slot};
    use ciborium::value::Value;
    use serde::Deserialize;

    fn person_schema() -> SchemaRef {
        Schema::builder("Person")
            .scalar("Name")
            .scalar("Score")
            .build()
            .unwrap()
    }

    fn person(name: &str, score: i64) -> Record {
        Record::new().with("Name", name).with("Score", score)
    }

    fn score_patch(score: i64) -> RecordPatch {
        let mut patch = RecordPatch::new();
        patch.insert("Score", Slot::Scalar(Value::Integer(score.into())));
        patch
    }

    fn delta(stream_id: StreamId, version: u64, patch: RecordPatch) -> Frame {
        Frame::Delta(DeltaFrame {
            stream_id,
            version,
            timestamp: 0,
            patch,
        })
    }

    #[test]
    fn test_decode_encoder_output() {
        let schema = person_schema();
        let mut encoder = Encoder::new(schema.clone(), person("Alice", 100)).unwrap();
        let mut decoder = Decoder::new(schema, encoder.main_frame()).unwrap();

        let frame = encoder.encode_changes(person("Alice", 200)).unwrap();
        let value = decoder.decode_frame(&Frame::from(frame)).unwrap();

        assert_eq!(value, &person("Alice", 200));
        assert_eq!(decoder.version(), 1);
    }

    #[test]
    fn test_foreign_stream_rejected() {
        let schema = person_schema();
        let encoder = Encoder::new(schema.clone(), person("Alice", 100)).unwrap();
        let mut decoder = Decoder::new(schema, encoder.main_frame()).unwrap();

        let other = StreamId::random();
        let err = decoder.decode_frame(&delta(other, 1, score_patch(1))).unwrap_err();

        assert_eq!(
            err,
            ProtocolError::StreamMismatch {
                expected: encoder.stream_id(),
                got: other,
            }
        );
        assert_eq!(decoder.value(), &person("Alice", 100));
    }

    #[test]
    fn test_older_frame_rejected() {
        let schema = person_schema();
        let id = StreamId::random();
        let key = KeyFrame {
            stream_id: id,
            version: 5,
            timestamp: 0,
            value: person("Alice", 100),
        };
        let mut decoder = Decoder::new(schema, key).unwrap();

        let err = decoder.decode_frame(&delta(id, 4, score_patch(1))).unwrap_err();
        assert_eq!(err, ProtocolError::StaleFrame { version: 4, baseline: 5 });
    }

    #[test]
    fn test_key_frame_jumps_forward() {
        let schema = person_schema();
        let id = StreamId::random();
        let mut decoder = Decoder::new(
            schema,
            KeyFrame {
                stream_id: id,
                version: 0,
                timestamp: 0,
                value: person("Alice", 100),
            },
        )
        .unwrap();

        let jump = Frame::Key(KeyFrame {
            stream_id: id,
            version: 42,
            timestamp: 9,
            value: person("Bob", 7),
        });
        decoder.decode_frame(&jump).unwrap();

        assert_eq!(decoder.version(), 42);
        assert_eq!(decoder.timestamp(), 9);
        assert_eq!(decoder.value(), &person("Bob", 7));
    }

    #[test]
    fn test_gap_is_not_detected() {
        let schema = person_schema();
        let id = StreamId::random();
        let mut decoder = Decoder::new(
            schema,
            KeyFrame {
                stream_id: id,
                version: 0,
                timestamp: 0,
                value: person("Alice", 100),
            },
        )
        .unwrap();

        decoder.decode_frame(&delta(id, 7, score_patch(3))).unwrap();
        assert_eq!(decoder.version(), 7);
        assert_eq!(decoder.value(), &person("Alice", 3));
    }

    #[test]
    fn test_bad_patch_leaves_baseline() {
        let schema = person_schema();
        let id = StreamId::random();
        let mut decoder = Decoder::new(
            schema,
            KeyFrame {
                stream_id: id,
                version: 0,
                timestamp: 0,
                value: person("Alice", 100),
            },
        )
        .unwrap();

        let mut patch = RecordPatch::new();
        patch.insert("Age", Slot::Scalar(Value::Null));
        let err = decoder.decode_frame(&delta(id, 1, patch)).unwrap_err();

        assert_eq!(
            err,
            ProtocolError::Patch(PatchError::UnknownField { field: "Age".into() })
        );
        assert_eq!(decoder.version(), 0);
    }

    #[test]
    fn test_value_as_typed() {
        #[derive(Debug, PartialEq, Deserialize)]
        #[serde(rename_all = "PascalCase")]
        struct Person {
            name: String,
            score: i64,
        }

        let schema = person_schema();
        let encoder = Encoder::new(schema.clone(), person("Alice", 100)).unwrap();
        let decoder = Decoder::new(schema, encoder.main_frame()).unwrap();

        assert_eq!(
            decoder.value_as::<Person>().unwrap(),
            Person { name: "Alice".into(), score: 100 }
        );
    }
}
