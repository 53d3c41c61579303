use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

use crate::errors::ModelError;

/// One entry of a list collection: an open-ended JSON object.
pub type Record = Map<String, Value>;

/// Serialize a typed model into a store record. Fails if the model is not a JSON object.
pub fn to_record<T: Serialize>(model: &T) -> Result<Record, ModelError> {
    match serde_json::to_value(model).map_err(|e| ModelError::Malformed(e.to_string()))? {
        Value::Object(map) => Ok(map),
        other => Err(ModelError::Malformed(format!("expected object, got {other}"))),
    }
}

/// Deserialize a store record into a typed model.
pub fn from_record<T: DeserializeOwned>(record: Record) -> Result<T, ModelError> {
    serde_json::from_value(Value::Object(record)).map_err(|e| ModelError::Malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Thing {
        id: String,
        n: i64,
    }

    #[test]
    fn scalar_is_not_a_record() {
        assert!(to_record(&5).is_err());
    }

    #[test]
    fn missing_field_is_malformed() {
        let mut rec = Record::new();
        rec.insert("id".into(), Value::from("a"));
        let err = from_record::<Thing>(rec).unwrap_err();
        assert!(matches!(err, ModelError::Malformed(_)));
    }
}
