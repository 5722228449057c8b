use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::field::FieldValue;

/// Flat result of one extraction: one entry per schema field.
///
/// An entry is `Some(value)` when the portal reported the field (possibly
/// as [`FieldValue::Null`]) and `None` when the field was absent from the
/// document or could not be coerced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    fields: IndexMap<String, Option<FieldValue>>,
}

impl Snapshot {
    pub(crate) fn insert(&mut self, key: String, value: Option<FieldValue>) {
        self.fields.insert(key, value);
    }

    /// Reported value of `key`. `None` if the field is absent or not part
    /// of the schema.
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key).and_then(Option::as_ref)
    }

    /// Whether `key` is a schema field.
    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Whether `key` is a schema field that the portal did not report.
    pub fn is_absent(&self, key: &str) -> bool {
        matches!(self.fields.get(key), Some(None))
    }

    /// All entries in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&FieldValue>)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }

    /// Entries the portal reported, skipping absent ones.
    pub fn present(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields
            .iter()
            .filter_map(|(k, v)| v.as_ref().map(|v| (k.as_str(), v)))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Serialized as a JSON object of the reported fields. Absent fields are
/// omitted so that `null` keeps meaning "reported as no data".
impl Serialize for Snapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (key, value) in self.present() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn absent_and_null_are_distinct() {
        let mut snap = Snapshot::default();
        snap.insert("nowPower".into(), Some(FieldValue::Float(1.5)));
        snap.insert("peakPower".into(), Some(FieldValue::Null));
        snap.insert("batCurr".into(), None);

        assert_eq!(snap.len(), 3);
        assert_eq!(snap.get("nowPower"), Some(&FieldValue::Float(1.5)));
        assert_eq!(snap.get("peakPower"), Some(&FieldValue::Null));
        assert_eq!(snap.get("batCurr"), None);
        assert!(snap.is_absent("batCurr"));
        assert!(!snap.is_absent("peakPower"));
        assert!(!snap.contains_key("other"));

        let json = serde_json::to_string(&snap).unwrap();
        assert_eq!(json, r#"{"nowPower":1.5,"peakPower":null}"#);
    }
}
