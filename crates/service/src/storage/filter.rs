//! Predicate builders for the store's `find_*`, `update_one`, `delete_*` and `count`.
//!
//! A predicate is any `Fn(&Record) -> bool`; these helpers cover the lookups
//! the services actually do.

use serde_json::Value;

use models::Record;

/// `record[field] == value`.
pub fn field_eq(field: &str, value: impl Into<Value>) -> impl Fn(&Record) -> bool {
    let field = field.to_string();
    let value = value.into();
    move |r: &Record| r.get(&field) == Some(&value)
}

/// `record.id == id`.
pub fn by_id(id: &str) -> impl Fn(&Record) -> bool {
    field_eq("id", id.to_string())
}

/// Case-insensitive string comparison, used for email lookups.
pub fn field_eq_ignore_case(field: &str, value: &str) -> impl Fn(&Record) -> bool {
    let field = field.to_string();
    let value = value.trim().to_lowercase();
    move |r: &Record| {
        r.get(&field)
            .and_then(Value::as_str)
            .map(|s| s.trim().to_lowercase() == value)
            .unwrap_or(false)
    }
}

/// Matches every record.
pub fn any(_: &Record) -> bool {
    true
}
