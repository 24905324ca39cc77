//! # Ports
//!
//! Every adapter must implement these traits to be wired into the binary.
//! `DocumentStore` is the leaf contract; the repository ports are what the
//! services consume, and storage-adapters builds them on top of any store.

use async_trait::async_trait;
use uuid::Uuid;

use crate::document::{Document, Filter, Sort, Update};
use crate::errors::DomainResult;
use crate::models::{
    CommentRecord, Photo, PostRecord, Profile, TallyChange, TargetKind, Timestamp,
    UserVoteRecord, VoteState, VoteTally,
};

/// Generic CRUD over named collections of JSON documents.
///
/// Each call touches at most one document atomically; nothing spans
/// documents.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// All documents matching `filter`, ordered by `sort` (stored order when empty).
    async fn find(&self, collection: &str, filter: &Filter, sort: &Sort) -> DomainResult<Vec<Document>>;

    async fn find_one(&self, collection: &str, filter: &Filter) -> DomainResult<Option<Document>>;

    /// Stores `doc`, generating an `_id` when absent. Returns the id.
    async fn insert_one(&self, collection: &str, doc: Document) -> DomainResult<String>;

    /// Applies `update` to the first match and returns the document as it
    /// is after the update. With `upsert`, a missing match is created from
    /// the filter's equality clauses. `None` means nothing matched.
    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
        upsert: bool,
    ) -> DomainResult<Option<Document>>;
}

/// Profile lookup and passthrough CRUD.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Fails with `NotFound` when no profile has this id.
    async fn get_profile(&self, user_id: Uuid) -> DomainResult<Profile>;
    async fn list_profiles(&self) -> DomainResult<Vec<Profile>>;
    async fn insert_profile(&self, profile: Profile) -> DomainResult<()>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait AlbumRepository: Send + Sync {
    async fn list_photos(&self) -> DomainResult<Vec<Photo>>;
    async fn insert_photo(&self, photo: Photo) -> DomainResult<()>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Posts ordered by most recent activity first.
    async fn list_posts(&self) -> DomainResult<Vec<PostRecord>>;
    async fn get_post(&self, id: Uuid) -> DomainResult<Option<PostRecord>>;
    async fn insert_post(&self, post: PostRecord) -> DomainResult<()>;
    /// Sets `updatedAt`. Returns false when the post does not exist.
    async fn touch_post(&self, id: Uuid, at: Timestamp) -> DomainResult<bool>;
}

/// Storage strategy for the comment forest.
///
/// Implementations decide how children are found (parent pointer query or
/// an explicit ordered child list); the tree engine only sees this seam.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// Immediate children of a post or comment, in the layout's stored order.
    async fn children_of(&self, parent_id: Uuid) -> DomainResult<Vec<CommentRecord>>;
    async fn get_comment(&self, id: Uuid) -> DomainResult<Option<CommentRecord>>;
    /// Stores the comment and links it under `comment.parent_id`.
    async fn insert_comment(&self, comment: CommentRecord) -> DomainResult<()>;
    /// Sets `updatedAt`. Returns false when the comment does not exist.
    async fn touch_comment(&self, id: Uuid, at: Timestamp) -> DomainResult<bool>;
}

/// Tally counters on targets plus the per-user vote map.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait VoteRepository: Send + Sync {
    /// Applies every counter move in one document update. `None` when the
    /// target does not exist.
    async fn apply_tally(
        &self,
        kind: TargetKind,
        target_id: Uuid,
        change: TallyChange,
    ) -> DomainResult<Option<VoteTally>>;

    /// Upserts `voteMap[target_id] = state` on the user's record.
    async fn record_vote(&self, user_id: Uuid, target_id: Uuid, state: VoteState) -> DomainResult<()>;

    async fn vote_record(&self, user_id: Uuid) -> DomainResult<Option<UserVoteRecord>>;
}
