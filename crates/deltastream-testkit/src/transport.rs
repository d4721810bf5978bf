//! A simulated message broker.
//!
//! [`SimulatedTransport`] keeps an append-only log of encoded frames (like a
//! topic partition) and a separate delivery queue (what the consumer will
//! read next). Publishing normally does both; tests can also log without
//! delivering, replay a range of the log, redeliver a single entry, or
//! deliver entries in any order.

use std::collections::VecDeque;

use bytes::Bytes;

use deltastream_core::Schema;
use deltastream_protocol::{decode_frame, encode_frame, Frame, Result};

#[derive(Debug, Default)]
pub struct SimulatedTransport {
    log: Vec<Bytes>,
    queue: VecDeque<Bytes>,
}

impl SimulatedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// The full log, in publish order.
    pub fn log(&self) -> &[Bytes] {
        &self.log
    }

    /// Messages waiting for the consumer.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Append to the log and deliver.
    pub fn publish(&mut self, message: Bytes) {
        self.log.push(message.clone());
        self.queue.push_back(message);
    }

    /// Append to the log without delivering, as if partitioned.
    pub fn publish_silent(&mut self, message: Bytes) {
        self.log.push(message);
    }

    /// Encode and publish a frame.
    pub fn publish_frame(&mut self, schema: &Schema, frame: &Frame) -> Result<()> {
        self.publish(Bytes::from(encode_frame(schema, frame)?));
        Ok(())
    }

    /// Encode and log a frame without delivering it.
    pub fn publish_frame_silent(&mut self, schema: &Schema, frame: &Frame) -> Result<()> {
        self.publish_silent(Bytes::from(encode_frame(schema, frame)?));
        Ok(())
    }

    /// Take everything queued for the consumer.
    pub fn drain_all(&mut self) -> Vec<Bytes> {
        self.queue.drain(..).collect()
    }

    /// Take and decode everything queued for the consumer.
    pub fn drain_frames(&mut self, schema: &Schema) -> Result<Vec<Frame>> {
        self.drain_all()
            .iter()
            .map(|message| decode_frame(schema, message))
            .collect()
    }

    /// Queue `count` log entries starting at `from`. Out-of-range entries
    /// are skipped.
    pub fn replay(&mut self, from: usize, count: usize) {
        let entries: Vec<Bytes> = self.log.iter().skip(from).take(count).cloned().collect();
        self.queue.extend(entries);
    }

    /// Queue one log entry again. Returns false if there is no such entry.
    pub fn redeliver_at(&mut self, index: usize) -> bool {
        match self.log.get(index) {
            Some(message) => {
                self.queue.push_back(message.clone());
                true
            }
            None => false,
        }
    }

    /// Queue log entries in the given order.
    pub fn deliver_in_order(&mut self, indices: &[usize]) {
        for &index in indices {
            self.redeliver_at(index);
        }
    }
}
