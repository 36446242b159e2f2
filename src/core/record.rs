//! Purpose: Ordered column → value mapping used for rows, updates and conditions.
//! Exports: `Record`.
//! Role: Shared currency between the store, the query engine and callers.
//! Invariants: Column order is insertion order; setting an existing column keeps its position.
//! Invariants: JSON (de)serialization preserves field order.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::value::Value;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style `set`.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(column, value);
        self
    }

    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        let column = column.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(name, _)| *name == column) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Like `get`, but an absent column reads as `Null`.
    pub fn value(&self, column: &str) -> &Value {
        static NULL: Value = Value::Null;
        self.get(column).unwrap_or(&NULL)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for (name, value) in &self.fields {
            let json = serde_json::to_value(value).unwrap_or(serde_json::Value::Null);
            map.insert(name.clone(), json);
        }
        serde_json::Value::Object(map)
    }
}

impl IntoIterator for Record {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (column, value) in iter {
            record.set(column, value);
        }
        record
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RecordVisitor;

        impl<'de> Visitor<'de> for RecordVisitor {
            type Value = Record;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object of scalar values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Record, A::Error> {
                let mut record = Record::new();
                while let Some((column, value)) = access.next_entry::<String, Value>()? {
                    record.set(column, value);
                }
                Ok(record)
            }
        }

        deserializer.deserialize_map(RecordVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::Record;
    use crate::core::value::Value;

    #[test]
    fn set_keeps_first_position() {
        let mut record = Record::new().with("id", "A").with("n", 1);
        record.set("id", "B");
        record.set("extra", true);
        assert_eq!(record.columns().collect::<Vec<_>>(), vec!["id", "n", "extra"]);
        assert_eq!(record.get("id"), Some(&Value::from("B")));
        assert_eq!(record.value("missing"), &Value::Null);
    }

    #[test]
    fn json_preserves_field_order() {
        let record: Record =
            serde_json::from_str(r#"{"zeta": 1, "alpha": "a", "mid": null}"#).expect("parse");
        assert_eq!(record.columns().collect::<Vec<_>>(), vec!["zeta", "alpha", "mid"]);
        let text = serde_json::to_string(&record).expect("serialize");
        assert_eq!(text, r#"{"zeta":1,"alpha":"a","mid":null}"#);
    }

    #[test]
    fn nested_json_is_rejected() {
        assert!(serde_json::from_str::<Record>(r#"{"a": {"b": 1}}"#).is_err());
        assert!(serde_json::from_str::<Record>("[1, 2]").is_err());
    }
}
