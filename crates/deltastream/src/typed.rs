//! Typed producer and subscriber handles.
//!
//! [`Publisher`] and [`Subscriber`] pin a serde type to a schema so callers
//! deal in their own structs instead of [`Record`](deltastream_core::Record)s.
//! Both sides can also work in CBOR bytes, which is what a transport carries.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use deltastream_core::{Record, SchemaRef};
use deltastream_protocol::{
    decode_frame, encode_frame, ApplyOutcome, Clock, ConsumerState, Encoder, EncoderConfig,
    Frame, StreamConsumer, StreamId, SystemClock,
};

use crate::error::Result;

/// Producing end of a stream of `T`.
pub struct Publisher<T, C: Clock = SystemClock> {
    encoder: Encoder<C>,
    _marker: PhantomData<fn(&T)>,
}

impl<T: Serialize> Publisher<T, SystemClock> {
    /// Start a stream at version 0 with a random identity.
    pub fn new(schema: SchemaRef, initial: &T) -> Result<Self> {
        Self::with_config(schema, initial, EncoderConfig::default(), SystemClock)
    }
}

impl<T: Serialize, C: Clock> Publisher<T, C> {
    pub fn with_config(
        schema: SchemaRef,
        initial: &T,
        config: EncoderConfig,
        clock: C,
    ) -> Result<Self> {
        let record = Record::from_serialize(&schema, initial)?;
        Ok(Self {
            encoder: Encoder::with_config(schema, record, config, clock)?,
            _marker: PhantomData,
        })
    }

    /// Emit the delta to `next`.
    pub fn publish(&mut self, next: &T) -> Result<Frame> {
        Ok(Frame::Delta(self.encoder.encode_value(next)?))
    }

    /// Emit the delta to `next` as CBOR bytes.
    pub fn publish_bytes(&mut self, next: &T) -> Result<Vec<u8>> {
        let frame = self.publish(next)?;
        Ok(encode_frame(self.encoder.schema(), &frame)?)
    }

    /// The current state as a key frame.
    pub fn key_frame(&self) -> Frame {
        Frame::Key(self.encoder.main_frame())
    }

    pub fn key_frame_bytes(&self) -> Result<Vec<u8>> {
        Ok(encode_frame(self.encoder.schema(), &self.key_frame())?)
    }

    pub fn stream_id(&self) -> StreamId {
        self.encoder.stream_id()
    }

    pub fn version(&self) -> u64 {
        self.encoder.version()
    }

    pub fn encoder(&self) -> &Encoder<C> {
        &self.encoder
    }
}

/// Receiving end of a stream of `T`.
pub struct Subscriber<T> {
    consumer: StreamConsumer,
    _marker: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> Subscriber<T> {
    pub fn new(schema: SchemaRef) -> Self {
        Self {
            consumer: StreamConsumer::new(schema),
            _marker: PhantomData,
        }
    }

    /// Feed one frame to the underlying consumer.
    pub fn receive(&mut self, frame: &Frame) -> ApplyOutcome {
        self.consumer.apply_frame(frame)
    }

    /// Decode and feed one frame.
    ///
    /// Bytes that do not decode never reach the consumer, so they are not
    /// counted; the error is returned instead.
    pub fn receive_bytes(&mut self, bytes: &[u8]) -> Result<ApplyOutcome> {
        let frame = decode_frame(self.consumer.schema(), bytes).map_err(|error| {
            warn!(%error, len = bytes.len(), "dropping undecodable frame");
            error
        })?;
        Ok(self.consumer.apply_frame(&frame))
    }

    /// The latest value, if a key frame has been applied.
    pub fn current(&self) -> Result<Option<T>> {
        Ok(self.consumer.current_value_as()?)
    }

    pub fn reset(&mut self) {
        self.consumer.reset();
    }

    pub fn needs_recovery(&self) -> bool {
        self.consumer.needs_recovery()
    }

    pub fn state(&self) -> ConsumerState {
        self.consumer.state()
    }

    pub fn consumer(&self) -> &StreamConsumer {
        &self.consumer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deltastream_core::Schema;
    use proptest::prelude::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "PascalCase")]
    struct Person {
        name: String,
        score: i64,
    }

    fn person(score: i64) -> Person {
        Person {
            name: "Alice".into(),
            score,
        }
    }

    fn schema() -> SchemaRef {
        Schema::builder("Person")
            .scalar("Name")
            .scalar("Score")
            .build()
            .unwrap()
    }

    #[test]
    fn test_publish_and_subscribe() {
        let mut publisher = Publisher::new(schema(), &person(100)).unwrap();
        let mut subscriber = Subscriber::<Person>::new(schema());

        assert_eq!(subscriber.current().unwrap(), None);
        assert!(subscriber.receive(&publisher.key_frame()).is_applied());
        assert!(subscriber.receive(&publisher.publish(&person(200)).unwrap()).is_applied());

        assert_eq!(subscriber.current().unwrap(), Some(person(200)));
        assert_eq!(publisher.version(), 1);
    }

    #[test]
    fn test_bytes_path() {
        let mut publisher = Publisher::new(schema(), &person(1)).unwrap();
        let mut subscriber = Subscriber::<Person>::new(schema());

        let key = publisher.key_frame_bytes().unwrap();
        let delta = publisher.publish_bytes(&person(2)).unwrap();

        assert!(subscriber.receive_bytes(&key).unwrap().is_applied());
        assert!(subscriber.receive_bytes(&delta).unwrap().is_applied());
        assert_eq!(subscriber.current().unwrap(), Some(person(2)));
    }

    #[test]
    fn test_undecodable_bytes_not_counted() {
        let mut subscriber = Subscriber::<Person>::new(schema());

        assert!(subscriber.receive_bytes(&[0xff]).is_err());
        assert_eq!(subscriber.consumer().frames_rejected(), 0);
        assert_eq!(subscriber.consumer().frames_applied(), 0);
    }

    proptest! {
        #[test]
        fn test_subscriber_tracks_latest_over_bytes(
            scores in prop::collection::vec(-1000i64..1000, 0..30)
        ) {
            let mut publisher = Publisher::new(schema(), &person(0)).unwrap();
            let mut subscriber = Subscriber::<Person>::new(schema());
            subscriber.receive_bytes(&publisher.key_frame_bytes().unwrap()).unwrap();

            for score in &scores {
                let bytes = publisher.publish_bytes(&person(*score)).unwrap();
                prop_assert!(subscriber.receive_bytes(&bytes).unwrap().is_applied());
            }

            let last = scores.last().copied().unwrap_or(0);
            prop_assert_eq!(subscriber.current().unwrap(), Some(person(last)));
            prop_assert_eq!(subscriber.consumer().current_version(), publisher.version());
        }
    }
}
