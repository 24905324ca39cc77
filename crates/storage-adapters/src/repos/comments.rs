//! Both comment storage layouts.
//!
//! Every comment document carries its `parentId` in either layout, which
//! is what the ancestor walk follows. The layouts differ only in how the
//! children of a node are found:
//!
//! - [`ChildListComments`]: the parent owns an ordered list of child ids in
//!   `forumSubComments`; children come back in insertion order.
//! - [`ParentPointerComments`]: children are every comment whose `parentId`
//!   equals the node id, ordered by creation time.

use std::sync::Arc;

use async_trait::async_trait;
use domains::{
    ChildList, CommentRecord, CommentRepository, DocumentStore, DomainResult, Filter, Sort,
    Timestamp, Update,
};
use tracing::warn;
use uuid::Uuid;

use crate::codec::{from_document, to_document};
use crate::collections::{CHILD_LISTS, COMMENTS};

/// Record-level operations common to both layouts.
struct CommentDocuments {
    store: Arc<dyn DocumentStore>,
}

impl CommentDocuments {
    async fn get(&self, id: Uuid) -> DomainResult<Option<CommentRecord>> {
        self.store
            .find_one(COMMENTS, &Filter::by_id(id))
            .await?
            .map(from_document)
            .transpose()
    }

    async fn insert(&self, comment: &CommentRecord) -> DomainResult<()> {
        self.store.insert_one(COMMENTS, to_document(comment)?).await?;
        Ok(())
    }

    async fn touch(&self, id: Uuid, at: Timestamp) -> DomainResult<bool> {
        let update = Update::new().set("updatedAt", at.timestamp_millis());
        Ok(self
            .store
            .update_one(COMMENTS, &Filter::by_id(id), &update, false)
            .await?
            .is_some())
    }
}

// ─── Explicit child list ────────────────────────────────────────────────────

pub struct ChildListComments {
    docs: CommentDocuments,
}

impl ChildListComments {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            docs: CommentDocuments { store },
        }
    }

    async fn child_list(&self, parent_id: Uuid) -> DomainResult<Option<ChildList>> {
        self.docs
            .store
            .find_one(CHILD_LISTS, &Filter::by_id(parent_id))
            .await?
            .map(from_document)
            .transpose()
    }
}

#[async_trait]
impl CommentRepository for ChildListComments {
    async fn children_of(&self, parent_id: Uuid) -> DomainResult<Vec<CommentRecord>> {
        let Some(list) = self.child_list(parent_id).await? else {
            return Ok(Vec::new());
        };

        let mut children = Vec::with_capacity(list.comment_ids.len());
        for child_id in list.comment_ids {
            match self.docs.get(child_id).await? {
                Some(child) => children.push(child),
                None => warn!(%parent_id, %child_id, "child list references a missing comment"),
            }
        }
        Ok(children)
    }

    async fn get_comment(&self, id: Uuid) -> DomainResult<Option<CommentRecord>> {
        self.docs.get(id).await
    }

    /// Inserts the comment, then appends it to the parent's list. The push
    /// upserts, so a first reply creates the list in the same operation.
    async fn insert_comment(&self, comment: CommentRecord) -> DomainResult<()> {
        self.docs.insert(&comment).await?;

        let link = Update::new().push("commentIds", comment.id.to_string());
        if let Err(err) = self
            .docs
            .store
            .update_one(CHILD_LISTS, &Filter::by_id(comment.parent_id), &link, true)
            .await
        {
            warn!(comment_id = %comment.id, parent_id = %comment.parent_id, error = %err,
                "comment stored but not linked under its parent");
            return Err(err);
        }
        Ok(())
    }

    async fn touch_comment(&self, id: Uuid, at: Timestamp) -> DomainResult<bool> {
        self.docs.touch(id, at).await
    }
}

// ─── Parent pointer ─────────────────────────────────────────────────────────

pub struct ParentPointerComments {
    docs: CommentDocuments,
}

impl ParentPointerComments {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            docs: CommentDocuments { store },
        }
    }
}

#[async_trait]
impl CommentRepository for ParentPointerComments {
    async fn children_of(&self, parent_id: Uuid) -> DomainResult<Vec<CommentRecord>> {
        let filter = Filter::all().eq("parentId", parent_id.to_string());
        let oldest_first = Sort::none().ascending("createdAt").ascending("_id");
        let docs = self.docs.store.find(COMMENTS, &filter, &oldest_first).await?;
        docs.into_iter().map(from_document).collect()
    }

    async fn get_comment(&self, id: Uuid) -> DomainResult<Option<CommentRecord>> {
        self.docs.get(id).await
    }

    async fn insert_comment(&self, comment: CommentRecord) -> DomainResult<()> {
        self.docs.insert(&comment).await
    }

    async fn touch_comment(&self, id: Uuid, at: Timestamp) -> DomainResult<bool> {
        self.docs.touch(id, at).await
    }
}
