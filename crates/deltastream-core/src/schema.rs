//! Schema model: the static description of a record type.
//!
//! A schema is built once, validated, and shared as an immutable
//! [`SchemaRef`]. Fields are kept in ordinal name order, which is the order
//! every diff and wire mapping walks them in.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::SchemaError;
use crate::names::{allocate_short_names, find_collisions};

/// Shared handle to an immutable schema.
pub type SchemaRef = Arc<Schema>;

/// How a field takes part in diffing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// Opaque value compared by equality only.
    Scalar,
    /// A nested record, diffed field by field.
    Record(SchemaRef),
    /// An ordered list of records reconciled by the element's key field.
    KeyedCollection {
        /// Schema of each element.
        element: SchemaRef,
        /// Name of the element's key field.
        key: String,
    },
}

impl FieldKind {
    /// Short description used in shape errors.
    pub fn describe(&self) -> &'static str {
        match self {
            FieldKind::Scalar => "a scalar",
            FieldKind::Record(_) => "a record",
            FieldKind::KeyedCollection { .. } => "a keyed collection",
        }
    }
}

/// Options that control how field names are put on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchemaOptions {
    /// Replace every field name with its allocated short code.
    pub minify_names: bool,
    /// Use a field's rename (when it has one) as its wire name.
    ///
    /// Ignored for fields of a minified schema: the short code wins.
    pub propagate_renames: bool,
}

/// A single field of a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    name: String,
    kind: FieldKind,
    rename: Option<String>,
    wire_name: String,
    is_key: bool,
}

impl Field {
    /// The field name as it appears in records.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    /// Alternate name declared for this field, if any.
    pub fn rename(&self) -> Option<&str> {
        self.rename.as_deref()
    }

    /// The name used in structured (wire) values.
    pub fn wire_name(&self) -> &str {
        &self.wire_name
    }

    /// Whether this field is the schema's collection key.
    pub fn is_key(&self) -> bool {
        self.is_key
    }
}

/// Static description of a record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    name: String,
    fields: Vec<Field>,
    key: Option<usize>,
    options: SchemaOptions,
}

impl Schema {
    /// Start building a schema for the named type.
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder::new(name)
    }

    /// The type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All fields, in ordinal name order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn options(&self) -> SchemaOptions {
        self.options
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields
            .binary_search_by(|f| f.name.as_str().cmp(name))
            .ok()
            .map(|i| &self.fields[i])
    }

    /// Look up a field by its wire name.
    pub fn field_by_wire_name(&self, wire_name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.wire_name == wire_name)
    }

    /// The key field, for schemas used as collection elements.
    pub fn key_field(&self) -> Option<&Field> {
        self.key.map(|i| &self.fields[i])
    }

    /// Field name to wire name table.
    pub fn wire_names(&self) -> BTreeMap<&str, &str> {
        self.fields
            .iter()
            .map(|f| (f.name.as_str(), f.wire_name.as_str()))
            .collect()
    }
}

#[derive(Debug)]
struct PendingField {
    name: String,
    kind: FieldKind,
    is_key: bool,
}

/// Builder for [`Schema`].
///
/// ```
/// use deltastream_core::Schema;
///
/// let item = Schema::builder("MarketItem")
///     .key("Id")
///     .scalar("Price")
///     .scalar("Volume")
///     .build()
///     .unwrap();
///
/// let board = Schema::builder("MarketBoard")
///     .scalar("Name")
///     .keyed_collection("Items", item)
///     .build()
///     .unwrap();
///
/// assert_eq!(board.fields().len(), 2);
/// ```
#[derive(Debug)]
pub struct SchemaBuilder {
    name: String,
    options: SchemaOptions,
    fields: Vec<PendingField>,
    renames: Vec<(String, String)>,
}

impl SchemaBuilder {
    /// Create a builder with default options.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: SchemaOptions::default(),
            fields: Vec::new(),
            renames: Vec::new(),
        }
    }

    pub fn options(mut self, options: SchemaOptions) -> Self {
        self.options = options;
        self
    }

    pub fn minify_names(mut self, enabled: bool) -> Self {
        self.options.minify_names = enabled;
        self
    }

    pub fn propagate_renames(mut self, enabled: bool) -> Self {
        self.options.propagate_renames = enabled;
        self
    }

    /// Add a scalar field.
    pub fn scalar(self, name: impl Into<String>) -> Self {
        self.push(name, FieldKind::Scalar, false)
    }

    /// Add the scalar key field used when this schema is a collection element.
    pub fn key(self, name: impl Into<String>) -> Self {
        self.push(name, FieldKind::Scalar, true)
    }

    /// Add a nested record field.
    pub fn record(self, name: impl Into<String>, schema: SchemaRef) -> Self {
        self.push(name, FieldKind::Record(schema), false)
    }

    /// Add a keyed collection field. The element schema must declare a key.
    pub fn keyed_collection(self, name: impl Into<String>, element: SchemaRef) -> Self {
        let key = element
            .key_field()
            .map(|f| f.name.clone())
            .unwrap_or_default();
        self.push(name, FieldKind::KeyedCollection { element, key }, false)
    }

    /// Declare an alternate wire name for a field.
    pub fn rename(mut self, field: impl Into<String>, alias: impl Into<String>) -> Self {
        self.renames.push((field.into(), alias.into()));
        self
    }

    fn push(mut self, name: impl Into<String>, kind: FieldKind, is_key: bool) -> Self {
        self.fields.push(PendingField {
            name: name.into(),
            kind,
            is_key,
        });
        self
    }

    /// Validate and freeze the schema.
    pub fn build(self) -> Result<SchemaRef, SchemaError> {
        let schema_name = self.name;
        let mut pending = self.fields;
        pending.sort_by(|a, b| a.name.cmp(&b.name));

        let mut key: Option<usize> = None;
        for (i, field) in pending.iter().enumerate() {
            if field.name.is_empty() {
                return Err(SchemaError::EmptyFieldName {
                    schema: schema_name,
                });
            }
            if i > 0 && pending[i - 1].name == field.name {
                return Err(SchemaError::DuplicateField {
                    schema: schema_name,
                    field: field.name.clone(),
                });
            }
            if let FieldKind::KeyedCollection { element, .. } = &field.kind {
                if element.key_field().is_none() {
                    return Err(SchemaError::ElementWithoutKey {
                        schema: schema_name,
                        field: field.name.clone(),
                        element: element.name.clone(),
                    });
                }
            }
            if field.is_key {
                if let Some(first) = key {
                    return Err(SchemaError::MultipleKeys {
                        schema: schema_name,
                        first: pending[first].name.clone(),
                        second: field.name.clone(),
                    });
                }
                key = Some(i);
            }
        }

        let mut renames: BTreeMap<String, String> = BTreeMap::new();
        for (field, alias) in self.renames {
            if pending.binary_search_by(|f| f.name.cmp(&field)).is_err() {
                return Err(SchemaError::UnknownRenameTarget {
                    schema: schema_name,
                    field,
                });
            }
            renames.insert(field, alias);
        }

        let options = self.options;
        let short_names = if options.minify_names {
            let names: Vec<&str> = pending.iter().map(|f| f.name.as_str()).collect();
            let codes = allocate_short_names(&names);
            if let Some((wire_name, first, second)) = find_collisions(&codes).into_iter().next() {
                return Err(SchemaError::WireNameCollision {
                    schema: schema_name,
                    wire_name,
                    first,
                    second,
                });
            }
            codes
        } else {
            BTreeMap::new()
        };

        let fields: Vec<Field> = pending
            .into_iter()
            .map(|p| {
                let rename = renames.remove(&p.name);
                let wire_name = match (short_names.get(&p.name), &rename) {
                    (Some(code), _) => code.clone(),
                    (None, Some(alias)) if options.propagate_renames => alias.clone(),
                    _ => p.name.clone(),
                };
                Field {
                    name: p.name,
                    kind: p.kind,
                    rename,
                    wire_name,
                    is_key: p.is_key,
                }
            })
            .collect();

        let mut seen: BTreeMap<&str, &str> = BTreeMap::new();
        for field in &fields {
            if let Some(first) = seen.insert(&field.wire_name, &field.name) {
                return Err(SchemaError::WireNameCollision {
                    schema: schema_name.clone(),
                    wire_name: field.wire_name.clone(),
                    first: first.to_string(),
                    second: field.name.clone(),
                });
            }
        }

        Ok(Arc::new(Schema {
            name: schema_name,
            fields,
            key,
            options,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item_schema() -> SchemaRef {
        Schema::builder("MarketItem")
            .scalar("Volume")
            .key("Id")
            .scalar("Price")
            .build()
            .unwrap()
    }

    #[test]
    fn test_fields_sorted_by_name() {
        let schema = item_schema();
        let names: Vec<&str> = schema.fields().iter().map(Field::name).collect();
        assert_eq!(names, vec!["Id", "Price", "Volume"]);
    }

    #[test]
    fn test_ordinal_order_is_case_sensitive() {
        let schema = Schema::builder("Mixed")
            .scalar("alpha")
            .scalar("Beta")
            .scalar("Alpha")
            .build()
            .unwrap();
        let names: Vec<&str> = schema.fields().iter().map(Field::name).collect();
        assert_eq!(names, vec!["Alpha", "Beta", "alpha"]);
    }

    #[test]
    fn test_key_field() {
        let schema = item_schema();
        let key = schema.key_field().unwrap();
        assert_eq!(key.name(), "Id");
        assert!(key.is_key());
        assert!(!schema.field("Price").unwrap().is_key());
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let err = Schema::builder("Dup")
            .scalar("Name")
            .scalar("Name")
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateField { field, .. } if field == "Name"));
    }

    #[test]
    fn test_empty_name_rejected() {
        let err = Schema::builder("Empty").scalar("").build().unwrap_err();
        assert!(matches!(err, SchemaError::EmptyFieldName { .. }));
    }

    #[test]
    fn test_multiple_keys_rejected() {
        let err = Schema::builder("TwoKeys")
            .key("A")
            .key("B")
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            SchemaError::MultipleKeys {
                schema: "TwoKeys".into(),
                first: "A".into(),
                second: "B".into(),
            }
        );
    }

    #[test]
    fn test_collection_requires_keyed_element() {
        let element = Schema::builder("Point")
            .scalar("X")
            .scalar("Y")
            .build()
            .unwrap();
        let err = Schema::builder("Path")
            .keyed_collection("Points", element)
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::ElementWithoutKey { element, .. } if element == "Point"));
    }

    #[test]
    fn test_collection_kind_carries_key_name() {
        let board = Schema::builder("MarketBoard")
            .scalar("Name")
            .keyed_collection("Items", item_schema())
            .build()
            .unwrap();
        match board.field("Items").unwrap().kind() {
            FieldKind::KeyedCollection { element, key } => {
                assert_eq!(element.name(), "MarketItem");
                assert_eq!(key, "Id");
            }
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn test_wire_names_default_to_field_names() {
        let schema = item_schema();
        assert_eq!(schema.field("Price").unwrap().wire_name(), "Price");
        assert!(schema.field_by_wire_name("Price").is_some());
    }

    #[test]
    fn test_minified_wire_names() {
        let schema = Schema::builder("MinifiedItem")
            .minify_names(true)
            .key("Sku")
            .scalar("Price")
            .scalar("Stock")
            .build()
            .unwrap();

        let table = schema.wire_names();
        assert_eq!(table["Sku"], "sk");
        assert_eq!(table["Stock"], "st");
        assert_eq!(table["Price"], "p");
        assert_eq!(schema.field_by_wire_name("sk").unwrap().name(), "Sku");
    }

    #[test]
    fn test_renames_only_used_when_propagated() {
        let plain = Schema::builder("Ticker")
            .scalar("Symbol")
            .rename("Symbol", "sym")
            .build()
            .unwrap();
        assert_eq!(plain.field("Symbol").unwrap().wire_name(), "Symbol");
        assert_eq!(plain.field("Symbol").unwrap().rename(), Some("sym"));

        let propagated = Schema::builder("Ticker")
            .propagate_renames(true)
            .scalar("Symbol")
            .rename("Symbol", "sym")
            .build()
            .unwrap();
        assert_eq!(propagated.field("Symbol").unwrap().wire_name(), "sym");
    }

    #[test]
    fn test_minify_overrides_renames() {
        let schema = Schema::builder("Annotated")
            .minify_names(true)
            .propagate_renames(true)
            .scalar("Name")
            .scalar("Score")
            .rename("Name", "player_name")
            .rename("Score", "player_score")
            .build()
            .unwrap();
        assert_eq!(schema.field("Name").unwrap().wire_name(), "n");
        assert_eq!(schema.field("Score").unwrap().wire_name(), "s");
    }

    #[test]
    fn test_rename_unknown_field_rejected() {
        let err = Schema::builder("Ticker")
            .scalar("Symbol")
            .rename("Sym", "s")
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::UnknownRenameTarget { field, .. } if field == "Sym"));
    }

    #[test]
    fn test_rename_colliding_with_field_rejected() {
        let err = Schema::builder("Clash")
            .propagate_renames(true)
            .scalar("Ask")
            .scalar("Bid")
            .rename("Bid", "Ask")
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::WireNameCollision { wire_name, .. } if wire_name == "Ask"));
    }

    #[test]
    fn test_case_only_names_rejected_when_minified() {
        let err = Schema::builder("Ids")
            .minify_names(true)
            .scalar("ID")
            .scalar("Id")
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::WireNameCollision { wire_name, .. } if wire_name == "id"));
    }
}
