//! Proptest generators for property-based testing.

use proptest::prelude::*;

use deltastream_core::Record;
use deltastream_protocol::StreamId;

use crate::fixtures::{market_item, parent, person, store, tag, venue};

/// Generate a random StreamId.
pub fn stream_id() -> impl Strategy<Value = StreamId> {
    any::<[u8; 16]>().prop_map(StreamId::from_bytes)
}

/// Generate a reasonable timestamp.
pub fn timestamp() -> impl Strategy<Value = i64> {
    0i64..=i64::MAX / 2
}

/// A conforming `Person` record.
pub fn person_record() -> impl Strategy<Value = Record> {
    ("[A-C][a-z]{0,3}", -50i64..50).prop_map(|(name, score)| person(&name, score))
}

/// A conforming `Parent` record.
pub fn parent_record() -> impl Strategy<Value = Record> {
    ("[a-c]{0,2}", "[a-c]{0,2}", -3i64..3).prop_map(|(l, t, v)| parent(&l, &t, v))
}

/// A list of market items with distinct ids in arbitrary order.
///
/// Ids come from a small pool so two draws usually overlap, which exercises
/// modifications as well as additions and deletions.
pub fn market_items() -> impl Strategy<Value = Vec<Record>> {
    prop::collection::btree_map("[A-F]", (0u8..4, 0i64..3), 0..6)
        .prop_map(|entries| {
            entries
                .into_iter()
                .map(|(id, (price, volume))| market_item(&id, f64::from(price) * 0.5, volume))
                .collect::<Vec<_>>()
        })
        .prop_shuffle()
}

/// A conforming `MarketBoard` record.
pub fn market_board() -> impl Strategy<Value = Record> {
    ("[MN]", market_items())
        .prop_map(|(name, items)| Record::new().with("Name", name).with("Items", items))
}

/// A conforming `Venue` record: shuffled stores, each with a nested `Geo`
/// and its own shuffled `Tags`.
pub fn venue_record() -> impl Strategy<Value = Record> {
    let tags = prop::collection::btree_map("[x-z]", 0i64..3, 0..3)
        .prop_map(|entries| {
            entries
                .into_iter()
                .map(|(name, weight)| tag(&name, weight))
                .collect::<Vec<_>>()
        })
        .prop_shuffle();
    let stores = prop::collection::btree_map("[a-d]", (0u8..3, 0u8..3, tags), 0..4)
        .prop_map(|entries| {
            entries
                .into_iter()
                .map(|(id, (lat, lon, tags))| {
                    store(&id, f64::from(lat) * 0.5, f64::from(lon) * 0.5, tags)
                })
                .collect::<Vec<_>>()
        })
        .prop_shuffle();
    ("[PQ]", stores).prop_map(|(name, stores)| venue(&name, stores))
}

/// What the channel does with the next frame the producer emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Deliver it.
    Deliver,
    /// Lose it.
    Drop,
    /// Deliver it twice.
    Duplicate,
    /// Deliver the producer's key frame instead.
    KeyFrame,
    /// Reset the consumer, then deliver the key frame.
    Reset,
}

impl Arbitrary for Delivery {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        prop_oneof![
            6 => Just(Delivery::Deliver),
            2 => Just(Delivery::Drop),
            1 => Just(Delivery::Duplicate),
            1 => Just(Delivery::KeyFrame),
            1 => Just(Delivery::Reset),
        ]
        .boxed()
    }
}
