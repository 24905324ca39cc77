//! Conversions between typed records and raw documents.

use domains::document::document_id;
use domains::{Document, DomainError, DomainResult, ID_FIELD};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Returns the document's `_id`, assigning a fresh UUIDv7 when absent.
pub fn ensure_id(doc: &mut Document) -> String {
    if let Some(id) = document_id(doc) {
        return id.to_string();
    }
    let id = Uuid::now_v7().to_string();
    doc.insert(ID_FIELD.to_string(), Value::String(id.clone()));
    id
}

pub fn to_document<T: Serialize>(value: &T) -> DomainResult<Document> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(DomainError::Store(format!("expected a JSON object, got {other}"))),
    }
}

pub fn from_document<T: DeserializeOwned>(doc: Document) -> DomainResult<T> {
    Ok(serde_json::from_value(Value::Object(doc))?)
}
