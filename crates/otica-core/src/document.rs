//! # Document Sanitization
//!
//! Every payload headed for the document store goes through [`to_document`].
//! Absent values reach the store as an explicit `null`, never as a missing
//! or blank field. A record whose required text field is blank is refused,
//! since it would come back as `null` and no longer decode.
//!
//! ```text
//!  { "marca": "   ", "receita": { "eixo": "" }, "itens": [ { "sku": "" } ] }
//!                               │
//!                               ▼
//!  { "marca": null,  "receita": { "eixo": null }, "itens": [ { "sku": null } ] }
//! ```

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// A JSON object ready to be stored.
pub type Document = Map<String, Value>;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Failed to serialize document: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Document root must be a JSON object, got {0}")]
    NotAnObject(&'static str),

    /// Sanitizing nulled a field the record cannot do without.
    #[error("Document would not read back: {0}")]
    Unreadable(String),
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Normalizes a JSON value in place: blank strings become `null`, recursively.
pub fn sanitize_value(value: &mut Value) {
    match value {
        Value::String(s) if s.trim().is_empty() => *value = Value::Null,
        Value::Array(items) => items.iter_mut().for_each(sanitize_value),
        Value::Object(fields) => fields.values_mut().for_each(sanitize_value),
        _ => {}
    }
}

/// Validates that `value` is an object and sanitizes it.
pub fn sanitize(mut value: Value) -> Result<Document, DocumentError> {
    sanitize_value(&mut value);
    match value {
        Value::Object(map) => Ok(map),
        other => Err(DocumentError::NotAnObject(kind(&other))),
    }
}

/// Serializes and sanitizes a typed record.
///
/// The sanitized document must still decode as `T`, so a blank required
/// string fails here instead of on the next read.
pub fn to_document<T: Serialize + DeserializeOwned>(record: &T) -> Result<Document, DocumentError> {
    let doc = sanitize(serde_json::to_value(record)?)?;
    serde_json::from_value::<T>(Value::Object(doc.clone()))
        .map_err(|e| DocumentError::Unreadable(e.to_string()))?;
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[test]
    fn test_blank_strings_become_null_recursively() {
        let doc = sanitize(json!({
            "marca": "   ",
            "titulo": "Aviador",
            "receita": { "eixo": "", "esfera": "+1.00" },
            "itens": [ { "sku": "" }, "x" ]
        }))
        .unwrap();

        assert_eq!(doc["marca"], Value::Null);
        assert_eq!(doc["titulo"], "Aviador");
        assert_eq!(doc["receita"]["eixo"], Value::Null);
        assert_eq!(doc["receita"]["esfera"], "+1.00");
        assert_eq!(doc["itens"][0]["sku"], Value::Null);
        assert_eq!(doc["itens"][1], "x");
    }

    #[test]
    fn test_none_fields_are_explicit_null() {
        #[derive(Serialize, Deserialize)]
        struct Record {
            observacoes: Option<String>,
        }

        let doc = to_document(&Record { observacoes: None }).unwrap();
        assert!(doc.contains_key("observacoes"));
        assert_eq!(doc["observacoes"], Value::Null);
    }

    #[test]
    fn test_root_must_be_object() {
        assert!(matches!(
            sanitize(json!([1, 2])),
            Err(DocumentError::NotAnObject("array"))
        ));
        assert!(matches!(
            sanitize(json!("  ")),
            Err(DocumentError::NotAnObject("null"))
        ));
    }

    #[test]
    fn test_blank_required_field_is_refused() {
        #[derive(Debug, Serialize, Deserialize)]
        struct Record {
            vendedor: String,
            observacoes: Option<String>,
        }

        let err = to_document(&Record {
            vendedor: "  ".to_string(),
            observacoes: None,
        })
        .unwrap_err();
        assert!(matches!(err, DocumentError::Unreadable(_)));

        let doc = to_document(&Record {
            vendedor: "Joana".to_string(),
            observacoes: Some(String::new()),
        })
        .unwrap();
        assert_eq!(doc["vendedor"], "Joana");
        assert_eq!(doc["observacoes"], Value::Null);
    }
}
