use std::sync::Arc;

use async_trait::async_trait;
use domains::{DocumentStore, DomainResult, Filter, PostRecord, PostRepository, Sort, Timestamp, Update};
use tracing::warn;
use uuid::Uuid;

use crate::codec::{from_document, to_document};
use crate::collections::POSTS;

pub struct DocumentPosts {
    store: Arc<dyn DocumentStore>,
}

impl DocumentPosts {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl PostRepository for DocumentPosts {
    async fn list_posts(&self) -> DomainResult<Vec<PostRecord>> {
        let recent_first = Sort::none().descending("updatedAt").descending("_id");
        let docs = self.store.find(POSTS, &Filter::all(), &recent_first).await?;
        Ok(docs
            .into_iter()
            .filter_map(|doc| {
                from_document(doc)
                    .map_err(|err| warn!(error = %err, "skipping undecodable post"))
                    .ok()
            })
            .collect())
    }

    async fn get_post(&self, id: Uuid) -> DomainResult<Option<PostRecord>> {
        self.store
            .find_one(POSTS, &Filter::by_id(id))
            .await?
            .map(from_document)
            .transpose()
    }

    async fn insert_post(&self, post: PostRecord) -> DomainResult<()> {
        self.store.insert_one(POSTS, to_document(&post)?).await?;
        Ok(())
    }

    async fn touch_post(&self, id: Uuid, at: Timestamp) -> DomainResult<bool> {
        let update = Update::new().set("updatedAt", at.timestamp_millis());
        Ok(self
            .store
            .update_one(POSTS, &Filter::by_id(id), &update, false)
            .await?
            .is_some())
    }
}
