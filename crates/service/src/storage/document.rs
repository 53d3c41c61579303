use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use super::errors::StoreError;
use models::{from_record, Record};

pub const USERS: &str = "users";
pub const PROPERTIES: &str = "properties";
pub const SETTINGS: &str = "settings";
pub const PAGES: &str = "pages";
pub const CATEGORIES: &str = "categories";
pub const CITIES: &str = "cities";

/// Top-level keys every document carries.
pub const COLLECTIONS: [&str; 6] = [USERS, PROPERTIES, SETTINGS, PAGES, CATEGORIES, CITIES];

const OBJECT_KEYS: [&str; 2] = [SETTINGS, PAGES];

/// The whole persisted state: one JSON object.
///
/// Unknown top-level keys are kept as-is so a round trip never drops data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Map<String, Value>);

impl Document {
    /// Six empty collections with both root timestamps set to now.
    pub fn empty() -> Self {
        let now = common::time::now_iso();
        let mut map = Map::new();
        for key in COLLECTIONS {
            map.insert(key.to_string(), empty_value(key));
        }
        map.insert("created_at".into(), Value::from(now.clone()));
        map.insert("updated_at".into(), Value::from(now));
        Self(map)
    }

    /// Wrap a parsed object, filling in whatever collection keys are missing.
    pub fn from_map(map: Map<String, Value>) -> Self {
        let mut doc = Self(map);
        doc.heal();
        doc
    }

    /// Ensure all six collection keys exist with the right JSON type and the
    /// root timestamps are set. Returns true when something had to be fixed.
    pub fn heal(&mut self) -> bool {
        let mut fixed = false;
        for key in COLLECTIONS {
            let ok = match self.0.get(key) {
                Some(Value::Array(_)) => !OBJECT_KEYS.contains(&key),
                Some(Value::Object(_)) => OBJECT_KEYS.contains(&key),
                _ => false,
            };
            if !ok {
                if let Some(found) = self.0.get(key) {
                    warn!(collection = key, found = %type_name(found), "collection has the wrong type; resetting it");
                }
                self.0.insert(key.to_string(), empty_value(key));
                fixed = true;
            }
        }
        if self.created_at().is_none() {
            let stamp = self.updated_at().map(str::to_string).unwrap_or_else(common::time::now_iso);
            self.0.insert("created_at".into(), Value::from(stamp));
            fixed = true;
        }
        if self.updated_at().is_none() {
            let stamp = self.created_at().unwrap_or_default().to_string();
            self.0.insert("updated_at".into(), Value::from(stamp));
            fixed = true;
        }
        fixed
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    /// A list collection, if `name` exists and is a list.
    pub fn collection(&self, name: &str) -> Option<&Vec<Value>> {
        self.0.get(name).and_then(Value::as_array)
    }

    /// Mutable list collection; created empty when absent.
    pub fn collection_mut(&mut self, name: &str) -> Result<&mut Vec<Value>, StoreError> {
        let slot = self
            .0
            .entry(name.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        slot.as_array_mut().ok_or_else(|| StoreError::NotACollection(name.to_string()))
    }

    /// Mutable list collection, only if it already exists as a list.
    pub fn existing_collection_mut(&mut self, name: &str) -> Option<&mut Vec<Value>> {
        self.0.get_mut(name).and_then(Value::as_array_mut)
    }

    /// Object entries of a list collection, in order. Non-object entries are skipped.
    pub fn records<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a Record> + 'a {
        self.collection(name)
            .into_iter()
            .flat_map(|items| items.iter())
            .filter_map(Value::as_object)
    }

    pub fn settings(&self) -> Record {
        self.object(SETTINGS)
    }

    pub fn pages(&self) -> Record {
        self.object(PAGES)
    }

    pub(crate) fn object_mut(&mut self, key: &str) -> &mut Record {
        let slot = self.0.entry(key.to_string()).or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        match slot {
            Value::Object(map) => map,
            _ => unreachable!("slot was just set to an object"),
        }
    }

    fn object(&self, key: &str) -> Record {
        self.0.get(key).and_then(Value::as_object).cloned().unwrap_or_default()
    }

    pub fn created_at(&self) -> Option<&str> {
        self.0.get("created_at").and_then(Value::as_str)
    }

    pub fn updated_at(&self) -> Option<&str> {
        self.0.get("updated_at").and_then(Value::as_str)
    }

    /// Refresh the root `updated_at` stamp.
    pub fn touch(&mut self, now: &str) {
        self.0.insert("updated_at".into(), Value::from(now));
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::empty()
    }
}

/// Decode records into `T`, skipping (and logging) the ones that do not fit.
pub fn decode_records<T: DeserializeOwned>(collection: &str, records: Vec<Record>) -> Vec<T> {
    records
        .into_iter()
        .filter_map(|rec| {
            let id = rec.get("id").and_then(Value::as_str).unwrap_or_default().to_string();
            match from_record(rec) {
                Ok(item) => Some(item),
                Err(e) => {
                    warn!(collection, id = %id, error = %e, "skipping malformed record");
                    None
                }
            }
        })
        .collect()
}

fn empty_value(key: &str) -> Value {
    if OBJECT_KEYS.contains(&key) {
        Value::Object(Map::new())
    } else {
        Value::Array(Vec::new())
    }
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_has_all_keys() {
        let doc = Document::empty();
        for key in COLLECTIONS {
            assert!(doc.get(key).is_some(), "missing {key}");
        }
        assert!(doc.get(SETTINGS).unwrap().is_object());
        assert!(doc.get(PAGES).unwrap().is_object());
        assert!(doc.collection(USERS).unwrap().is_empty());
        assert_eq!(doc.created_at(), doc.updated_at());
    }

    #[test]
    fn heal_fills_missing_and_fixes_pages_list() {
        let raw = json!({"users": [{"id": "u1"}], "pages": [], "extra": 1});
        let Value::Object(map) = raw else { unreachable!() };
        let doc = Document::from_map(map);
        assert_eq!(doc.collection(USERS).unwrap().len(), 1);
        assert!(doc.get(PAGES).unwrap().is_object());
        assert!(doc.collection(CITIES).unwrap().is_empty());
        assert_eq!(doc.get("extra"), Some(&json!(1)));
        assert!(doc.created_at().is_some());
        assert_eq!(doc.created_at(), doc.updated_at());
    }

    #[test]
    fn heal_keeps_existing_stamps() {
        let raw = json!({"created_at": "2024-01-01T00:00:00", "updated_at": "2024-02-01T00:00:00"});
        let Value::Object(map) = raw else { unreachable!() };
        let mut doc = Document::from_map(map);
        assert_eq!(doc.created_at(), Some("2024-01-01T00:00:00"));
        assert_eq!(doc.updated_at(), Some("2024-02-01T00:00:00"));
        assert!(!doc.heal());
    }

    #[test]
    fn collection_mut_rejects_objects() {
        let mut doc = Document::empty();
        assert!(matches!(doc.collection_mut(SETTINGS), Err(StoreError::NotACollection(_))));
        doc.collection_mut("favorites_log").unwrap().push(json!({"id": 1}));
        assert_eq!(doc.collection("favorites_log").unwrap().len(), 1);
    }

    #[test]
    fn records_skip_non_objects() {
        let mut doc = Document::empty();
        let users = doc.collection_mut(USERS).unwrap();
        users.push(json!({"id": "a"}));
        users.push(json!("stray"));
        users.push(json!({"id": "b"}));
        let ids: Vec<_> = doc.records(USERS).map(|r| r["id"].clone()).collect();
        assert_eq!(ids, vec![json!("a"), json!("b")]);
    }
}
