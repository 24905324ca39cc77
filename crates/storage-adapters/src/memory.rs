//! # MemoryDocumentStore
//!
//! Process-local `DocumentStore`. Each collection is a `Vec` of documents
//! in insertion order behind one dashmap shard lock, so every single
//! document operation is atomic with respect to concurrent writers.
//! Nothing is persisted across restarts.

use async_trait::async_trait;
use dashmap::DashMap;
use domains::document::document_id;
use domains::{Document, DocumentStore, DomainError, DomainResult, Filter, Sort, Update};

use crate::codec::ensure_id;

#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: DashMap<String, Vec<Document>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently held in `collection`.
    pub fn count(&self, collection: &str) -> usize {
        self.collections.get(collection).map_or(0, |docs| docs.len())
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn find(&self, collection: &str, filter: &Filter, sort: &Sort) -> DomainResult<Vec<Document>> {
        let mut docs: Vec<Document> = self
            .collections
            .get(collection)
            .map(|docs| docs.iter().filter(|d| filter.matches(d)).cloned().collect())
            .unwrap_or_default();
        sort.apply(&mut docs);
        Ok(docs)
    }

    async fn find_one(&self, collection: &str, filter: &Filter) -> DomainResult<Option<Document>> {
        Ok(self
            .collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| filter.matches(d)).cloned()))
    }

    async fn insert_one(&self, collection: &str, mut doc: Document) -> DomainResult<String> {
        let id = ensure_id(&mut doc);
        let mut docs = self.collections.entry(collection.to_string()).or_default();
        if docs.iter().any(|d| document_id(d) == Some(id.as_str())) {
            return Err(DomainError::Conflict(format!("{collection} already holds `{id}`")));
        }
        docs.push(doc);
        Ok(id)
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
        upsert: bool,
    ) -> DomainResult<Option<Document>> {
        let mut docs = self.collections.entry(collection.to_string()).or_default();

        if let Some(doc) = docs.iter_mut().find(|d| filter.matches(d)) {
            update.apply(doc)?;
            return Ok(Some(doc.clone()));
        }
        if !upsert {
            return Ok(None);
        }

        let mut doc = filter.seed()?;
        ensure_id(&mut doc);
        update.apply(&mut doc)?;
        docs.push(doc.clone());
        Ok(Some(doc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use uuid::Uuid;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[tokio::test]
    async fn insert_generates_ids_and_rejects_duplicates() {
        let store = MemoryDocumentStore::new();
        let generated = store.insert_one("posts", doc(json!({ "title": "a" }))).await.unwrap();
        assert!(Uuid::parse_str(&generated).is_ok());

        store.insert_one("posts", doc(json!({ "_id": "fixed" }))).await.unwrap();
        let err = store.insert_one("posts", doc(json!({ "_id": "fixed" }))).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
        assert_eq!(store.count("posts"), 2);
    }

    #[tokio::test]
    async fn find_filters_and_sorts() {
        let store = MemoryDocumentStore::new();
        for (id, parent, at) in [("a", "p", 3), ("b", "q", 1), ("c", "p", 2)] {
            store
                .insert_one("comments", doc(json!({ "_id": id, "parentId": parent, "createdAt": at })))
                .await
                .unwrap();
        }

        let found = store
            .find("comments", &Filter::all().eq("parentId", "p"), &Sort::none().ascending("createdAt"))
            .await
            .unwrap();
        let ids: Vec<_> = found.iter().filter_map(document_id).collect();
        assert_eq!(ids, vec!["c", "a"]);

        assert!(store.find("missing", &Filter::all(), &Sort::none()).await.unwrap().is_empty());
        assert!(store.find_one("comments", &Filter::by_id("zz")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_returns_post_image_and_upserts_from_filter() {
        let store = MemoryDocumentStore::new();
        let missed = store
            .update_one("votes", &Filter::by_id("u1"), &Update::new().set("voteMap.t1", 1), false)
            .await
            .unwrap();
        assert!(missed.is_none());

        let created = store
            .update_one("votes", &Filter::by_id("u1"), &Update::new().set("voteMap.t1", 1), true)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(Value::Object(created), json!({ "_id": "u1", "voteMap": { "t1": 1 } }));

        let updated = store
            .update_one("votes", &Filter::by_id("u1"), &Update::new().set("voteMap.t2", -1), true)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated["voteMap"], json!({ "t1": 1, "t2": -1 }));
        assert_eq!(store.count("votes"), 1);
    }

    #[tokio::test]
    async fn concurrent_increments_are_not_lost() {
        let store = Arc::new(MemoryDocumentStore::new());
        store.insert_one("posts", doc(json!({ "_id": "p1" }))).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..32 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .update_one("posts", &Filter::by_id("p1"), &Update::new().inc("voteTally.netScore", 1), false)
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let post = store.find_one("posts", &Filter::by_id("p1")).await.unwrap().unwrap();
        assert_eq!(post["voteTally"]["netScore"], json!(32));
    }
}
