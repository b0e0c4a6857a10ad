use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

use crate::block::BlockRecord;
use crate::block::id::{ids_match, parse_block_id};

/// A table entry as stored in a record map: the value plus the viewer role.
/// A null or missing `value` means the record could not be loaded.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Record<T> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub value: Option<T>,
}

/// Id-keyed records that remember insertion order.
///
/// Loaded tables keep the order of the source document, so `first_id` is the
/// first key as written.
#[derive(Debug, Clone, PartialEq)]
pub struct Table<T> {
    order: Vec<String>,
    records: HashMap<String, Record<T>>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Table {
            order: Vec::new(),
            records: HashMap::new(),
        }
    }
}

impl<T> Table<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a record. Replacing keeps the original position.
    pub fn insert_record(&mut self, id: impl Into<String>, record: Record<T>) {
        let id = id.into();
        if !self.records.contains_key(&id) {
            self.order.push(id.clone());
        }
        self.records.insert(id, record);
    }

    pub fn insert(&mut self, id: impl Into<String>, value: T) {
        self.insert_record(
            id,
            Record {
                role: None,
                value: Some(value),
            },
        );
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.records.get(id)?.value.as_ref()
    }

    pub fn record(&self, id: &str) -> Option<&Record<T>> {
        self.records.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// First key in insertion order.
    pub fn first_id(&self) -> Option<&str> {
        self.order.first().map(String::as_str)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Loaded values in insertion order; records without a value are skipped.
    pub fn values(&self) -> impl Iterator<Item = (&str, &T)> {
        self.order
            .iter()
            .filter_map(|id| Some((id.as_str(), self.get(id)?)))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl<'de, T> Deserialize<'de> for Table<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct TableVisitor<T>(PhantomData<T>);

        impl<'de, T> Visitor<'de> for TableVisitor<T>
        where
            T: Deserialize<'de>,
        {
            type Value = Table<T>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of record ids to records")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut table = Table::new();
                while let Some((id, record)) = access.next_entry::<String, Record<T>>()? {
                    table.insert_record(id, record);
                }
                Ok(table)
            }
        }

        deserializer.deserialize_map(TableVisitor(PhantomData))
    }
}

impl<T> Serialize for Table<T>
where
    T: Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.order.len()))?;
        for id in &self.order {
            if let Some(record) = self.records.get(id) {
                map.serialize_entry(id, record)?;
            }
        }
        map.end()
    }
}

/// The normalized document: block records plus side tables filled in by the
/// fetch layer before rendering.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RecordMap {
    #[serde(default)]
    pub block: Table<BlockRecord>,
    #[serde(default)]
    pub collection: Table<Value>,
    #[serde(default)]
    pub collection_view: Table<Value>,
    #[serde(default)]
    pub notion_user: Table<Value>,
    /// Block id → pre-signed URL for blocks whose assets need authentication.
    #[serde(default)]
    pub signed_urls: HashMap<String, String>,
}

impl RecordMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn block(&self, id: &str) -> Option<&BlockRecord> {
        self.block.get(id)
    }

    /// Find the stored id a user-supplied id, uuid or page URL refers to.
    pub fn find_block_id(&self, query: &str) -> Option<&str> {
        if self.block.contains(query) {
            return self.block.ids().find(|id| *id == query);
        }
        let wanted = parse_block_id(query).unwrap_or_else(|| query.to_string());
        self.block.ids().find(|id| ids_match(id, &wanted))
    }

    pub fn signed_url(&self, id: &str) -> Option<&str> {
        self.signed_urls.get(id).map(String::as_str)
    }

    pub fn insert_block(&mut self, block: BlockRecord) {
        self.block.insert(block.id.clone(), block);
    }

    pub fn insert_signed_url(&mut self, id: impl Into<String>, url: impl Into<String>) {
        self.signed_urls.insert(id.into(), url.into());
    }

    pub fn with_block(mut self, block: BlockRecord) -> Self {
        self.insert_block(block);
        self
    }

    pub fn with_signed_url(mut self, id: impl Into<String>, url: impl Into<String>) -> Self {
        self.insert_signed_url(id, url);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockType;

    #[test]
    fn keeps_source_order() {
        let map: RecordMap = serde_json::from_str(
            r#"{"block": {
                "b": {"value": {"id": "b", "type": "text"}},
                "a": {"value": {"id": "a", "type": "text"}},
                "c": {"value": {"id": "c", "type": "text"}}
            }}"#,
        )
        .expect("valid record map");
        assert_eq!(map.block.first_id(), Some("b"));
        assert_eq!(map.block.ids().collect::<Vec<_>>(), ["b", "a", "c"]);
    }

    #[test]
    fn null_values_are_missing() {
        let map: RecordMap =
            serde_json::from_str(r#"{"block": {"x": {"role": "none", "value": null}}}"#)
                .expect("valid record map");
        assert_eq!(map.block.len(), 1);
        assert!(map.block("x").is_none());
        assert_eq!(map.block.record("x").and_then(|r| r.role.as_deref()), Some("none"));
    }

    #[test]
    fn records_without_value_load_as_missing() {
        let map: RecordMap = serde_json::from_str(
            r#"{"block": {"x": {"role": "reader"}, "y": {"value": {"id": "y", "type": "text"}}}}"#,
        )
        .expect("valid record map");
        assert_eq!(map.block.ids().collect::<Vec<_>>(), ["x", "y"]);
        assert!(map.block("x").is_none());
        assert!(map.block("y").is_some());

        let table: Table<i32> =
            serde_json::from_str(r#"{"a": {}, "b": {"value": 2}}"#).expect("valid table");
        assert_eq!(table.values().collect::<Vec<_>>(), [("b", &2)]);
    }

    #[test]
    fn replacing_keeps_position() {
        let mut table = Table::new();
        table.insert("b", 1);
        table.insert("a", 2);
        table.insert("b", 3);
        assert_eq!(table.values().collect::<Vec<_>>(), [("b", &3), ("a", &2)]);
    }

    #[test]
    fn builders_populate_lookups() {
        let map = RecordMap::new()
            .with_block(BlockRecord::new("x", BlockType::File))
            .with_signed_url("x", "https://cdn/x.bin");
        assert!(map.block("x").is_some());
        assert_eq!(map.signed_url("x"), Some("https://cdn/x.bin"));
        assert_eq!(map.signed_url("y"), None);
    }

    #[test]
    fn finds_ids_from_urls_and_uuids() {
        let map = RecordMap::new()
            .with_block(BlockRecord::new("067dd719-a912-471e-a9a3-ac10710e7fdf", BlockType::Page))
            .with_block(BlockRecord::new("t", BlockType::Text));
        assert_eq!(map.find_block_id("t"), Some("t"));
        assert_eq!(
            map.find_block_id("https://www.notion.so/Home-067dd719a912471ea9a3ac10710e7fdf"),
            Some("067dd719-a912-471e-a9a3-ac10710e7fdf")
        );
        assert_eq!(map.find_block_id("nowhere"), None);
    }
}
