//! Test fixtures and helpers.
//!
//! Schemas, matching serde types, and record builders shared by the
//! scenario tests.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use deltastream_core::{Record, Schema, SchemaRef};
use deltastream_protocol::Clock;

// ─────────────────────────────────────────────────────────────────────────────
// Person: two scalars
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Person {
    pub name: String,
    pub score: i64,
}

pub fn person_schema() -> SchemaRef {
    Schema::builder("Person")
        .scalar("Name")
        .scalar("Score")
        .build()
        .expect("person schema")
}

pub fn person(name: &str, score: i64) -> Record {
    Record::new().with("Name", name).with("Score", score)
}

// ─────────────────────────────────────────────────────────────────────────────
// Parent: one nested record
// ─────────────────────────────────────────────────────────────────────────────

pub fn parent_schema() -> SchemaRef {
    let child = Schema::builder("Nested")
        .scalar("Tag")
        .scalar("Value")
        .build()
        .expect("nested schema");
    Schema::builder("Parent")
        .scalar("Label")
        .record("Child", child)
        .build()
        .expect("parent schema")
}

pub fn parent(label: &str, tag: &str, value: i64) -> Record {
    Record::new()
        .with("Label", label)
        .with("Child", Record::new().with("Tag", tag).with("Value", value))
}

// ─────────────────────────────────────────────────────────────────────────────
// Market board: keyed collection
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MarketItem {
    pub id: String,
    pub price: f64,
    pub volume: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MarketBoard {
    pub name: String,
    pub items: Vec<MarketItem>,
}

pub fn market_item_schema() -> SchemaRef {
    Schema::builder("MarketItem")
        .key("Id")
        .scalar("Price")
        .scalar("Volume")
        .build()
        .expect("market item schema")
}

pub fn market_board_schema() -> SchemaRef {
    Schema::builder("MarketBoard")
        .scalar("Name")
        .keyed_collection("Items", market_item_schema())
        .build()
        .expect("market board schema")
}

pub fn market_item(id: &str, price: f64, volume: i64) -> Record {
    Record::new()
        .with("Id", id)
        .with("Price", price)
        .with("Volume", volume)
}

/// Items from `(id, price, volume)` triples.
pub fn market_items(entries: &[(&str, f64, i64)]) -> Vec<Record> {
    entries
        .iter()
        .map(|(id, price, volume)| market_item(id, *price, *volume))
        .collect()
}

pub fn market_board(name: &str, entries: &[(&str, f64, i64)]) -> Record {
    Record::new()
        .with("Name", name)
        .with("Items", market_items(entries))
}

// ─────────────────────────────────────────────────────────────────────────────
// Ticker: minified, with renames
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Ticker {
    pub symbol: String,
    pub price: f64,
    pub bid: f64,
    pub ask: f64,
    pub volume: i64,
}

/// Minified ticker. The renames are declared but the short codes win.
pub fn ticker_schema() -> SchemaRef {
    Schema::builder("Ticker")
        .minify_names(true)
        .propagate_renames(true)
        .scalar("Symbol")
        .scalar("Price")
        .scalar("Bid")
        .scalar("Ask")
        .scalar("Volume")
        .rename("Symbol", "sym")
        .rename("Price", "px")
        .rename("Bid", "bid")
        .rename("Ask", "ask")
        .rename("Volume", "vol")
        .build()
        .expect("ticker schema")
}

pub fn tick(symbol: &str, price: f64) -> Ticker {
    Ticker {
        symbol: symbol.to_string(),
        price,
        bid: price - 0.03,
        ask: price + 0.03,
        volume: 800,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Catalog: minified keyed collection
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CatalogItem {
    pub sku: String,
    pub price: f64,
    pub stock: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Catalog {
    pub title: String,
    pub items: Vec<CatalogItem>,
}

pub fn catalog_schema() -> SchemaRef {
    let item = Schema::builder("CatalogItem")
        .minify_names(true)
        .key("Sku")
        .scalar("Price")
        .scalar("Stock")
        .build()
        .expect("catalog item schema");
    Schema::builder("Catalog")
        .minify_names(true)
        .scalar("Title")
        .keyed_collection("Items", item)
        .build()
        .expect("catalog schema")
}

// ─────────────────────────────────────────────────────────────────────────────
// Profile: three levels of minified nesting
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Geo {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Address {
    pub city: String,
    pub country: String,
    pub geo: Geo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Profile {
    pub name: String,
    pub address: Address,
}

pub fn profile_schema() -> SchemaRef {
    let geo = Schema::builder("Geo")
        .minify_names(true)
        .scalar("Latitude")
        .scalar("Longitude")
        .build()
        .expect("geo schema");
    let address = Schema::builder("Address")
        .minify_names(true)
        .scalar("City")
        .scalar("Country")
        .record("Geo", geo)
        .build()
        .expect("address schema");
    Schema::builder("Profile")
        .minify_names(true)
        .scalar("Name")
        .record("Address", address)
        .build()
        .expect("profile schema")
}

pub fn profile(name: &str, city: &str, latitude: f64, longitude: f64) -> Profile {
    Profile {
        name: name.to_string(),
        address: Address {
            city: city.to_string(),
            country: "UK".to_string(),
            geo: Geo {
                latitude,
                longitude,
            },
        },
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Many collisions: progressively longer prefixes
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Settings {
    pub active: bool,
    pub padding: i64,
    pub password: String,
    pub path: String,
    pub quality: i64,
    pub quantity: i64,
}

pub fn settings_schema() -> SchemaRef {
    Schema::builder("Settings")
        .minify_names(true)
        .scalar("Active")
        .scalar("Padding")
        .scalar("Password")
        .scalar("Path")
        .scalar("Quality")
        .scalar("Quantity")
        .build()
        .expect("settings schema")
}

// ─────────────────────────────────────────────────────────────────────────────
// Venue: collection elements with their own nesting
// ─────────────────────────────────────────────────────────────────────────────

/// A venue lists stores; each store carries a nested `Geo` record and its
/// own keyed `Tags` collection.
pub fn venue_schema() -> SchemaRef {
    let geo = Schema::builder("Geo")
        .scalar("Lat")
        .scalar("Lon")
        .build()
        .expect("geo schema");
    let tag = Schema::builder("Tag")
        .key("Name")
        .scalar("Weight")
        .build()
        .expect("tag schema");
    let store = Schema::builder("Store")
        .key("Id")
        .record("Geo", geo)
        .keyed_collection("Tags", tag)
        .build()
        .expect("store schema");
    Schema::builder("Venue")
        .scalar("Name")
        .keyed_collection("Stores", store)
        .build()
        .expect("venue schema")
}

pub fn tag(name: &str, weight: i64) -> Record {
    Record::new().with("Name", name).with("Weight", weight)
}

pub fn store(id: &str, lat: f64, lon: f64, tags: Vec<Record>) -> Record {
    Record::new()
        .with("Id", id)
        .with("Geo", Record::new().with("Lat", lat).with("Lon", lon))
        .with("Tags", tags)
}

pub fn venue(name: &str, stores: Vec<Record>) -> Record {
    Record::new().with("Name", name).with("Stores", stores)
}

// ─────────────────────────────────────────────────────────────────────────────
// Clock
// ─────────────────────────────────────────────────────────────────────────────

/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock(Arc<AtomicI64>);

impl ManualClock {
    pub fn new(start_millis: i64) -> Self {
        Self(Arc::new(AtomicI64::new(start_millis)))
    }

    pub fn advance(&self, millis: i64) {
        self.0.fetch_add(millis, Ordering::SeqCst);
    }

    pub fn set(&self, millis: i64) {
        self.0.store(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_schemas_build() {
        person_schema();
        parent_schema();
        market_board_schema();
        ticker_schema();
        catalog_schema();
        profile_schema();
        settings_schema();
        venue_schema();
    }

    #[test]
    fn test_venue_conforms() {
        let record = venue(
            "Mall",
            vec![store("s1", 1.0, 2.0, vec![tag("food", 3), tag("open", 1)])],
        );
        record.conform(&venue_schema()).unwrap();
    }

    #[test]
    fn test_typed_fixtures_match_schemas() {
        let t = tick("NVDA", 800.0);
        let record = Record::from_serialize(&ticker_schema(), &t).unwrap();
        assert_eq!(record.deserialize::<Ticker>().unwrap(), t);

        let p = profile("Ada", "London", 51.5, -0.125);
        let record = Record::from_serialize(&profile_schema(), &p).unwrap();
        assert_eq!(record.deserialize::<Profile>().unwrap(), p);
    }

    #[test]
    fn test_manual_clock_is_shared() {
        let clock = ManualClock::new(1_000);
        let other = clock.clone();
        clock.advance(5);
        assert_eq!(other.now_millis(), 1_005);
        other.set(0);
        assert_eq!(clock.now_millis(), 0);
    }
}
