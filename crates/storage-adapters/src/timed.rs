//! # TimedStore
//!
//! Bounds every individual store call with the same fixed deadline,
//! independent of whatever the caller is doing. A call that overruns
//! fails with `DomainError::Timeout`; the underlying operation may still
//! complete on the backend.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use domains::{Document, DocumentStore, DomainError, DomainResult, Filter, Sort, Update};
use tracing::warn;

pub struct TimedStore {
    inner: Arc<dyn DocumentStore>,
    deadline: Duration,
}

impl TimedStore {
    pub fn new(inner: Arc<dyn DocumentStore>, deadline: Duration) -> Self {
        Self { inner, deadline }
    }

    async fn bounded<T>(
        &self,
        op: &'static str,
        collection: &str,
        call: impl Future<Output = DomainResult<T>> + Send,
    ) -> DomainResult<T> {
        match tokio::time::timeout(self.deadline, call).await {
            Ok(result) => result,
            Err(_) => {
                warn!(op, collection, deadline_ms = self.deadline.as_millis() as u64, "store call timed out");
                Err(DomainError::Timeout(format!("{op} on {collection}")))
            }
        }
    }
}

#[async_trait]
impl DocumentStore for TimedStore {
    async fn find(&self, collection: &str, filter: &Filter, sort: &Sort) -> DomainResult<Vec<Document>> {
        self.bounded("find", collection, self.inner.find(collection, filter, sort))
            .await
    }

    async fn find_one(&self, collection: &str, filter: &Filter) -> DomainResult<Option<Document>> {
        self.bounded("find_one", collection, self.inner.find_one(collection, filter))
            .await
    }

    async fn insert_one(&self, collection: &str, doc: Document) -> DomainResult<String> {
        self.bounded("insert_one", collection, self.inner.insert_one(collection, doc))
            .await
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
        upsert: bool,
    ) -> DomainResult<Option<Document>> {
        self.bounded(
            "update_one",
            collection,
            self.inner.update_one(collection, filter, update, upsert),
        )
        .await
    }
}
