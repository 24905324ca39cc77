//! Shared test scaffolding: a forum wired over the in-memory store.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use domains::{
    CommentRecord, CommentRepository, PostRecord, PostRepository, Profile, ProfileRepository,
    Timestamp, VoteTally,
};
use storage_adapters::{
    ChildListComments, DocumentPosts, DocumentProfiles, DocumentVotes, MemoryDocumentStore,
    ParentPointerComments,
};
use uuid::Uuid;

use crate::propagation::AncestorWalk;

pub(crate) struct Forum {
    pub posts: Arc<dyn PostRepository>,
    pub comments: Arc<dyn CommentRepository>,
    pub profiles: Arc<dyn ProfileRepository>,
    pub votes: Arc<DocumentVotes>,
    pub author: Uuid,
}

impl Forum {
    pub async fn new() -> Self {
        Self::build(false).await
    }

    pub async fn with_parent_pointers() -> Self {
        Self::build(true).await
    }

    async fn build(parent_pointers: bool) -> Self {
        let store = Arc::new(MemoryDocumentStore::new());
        let comments: Arc<dyn CommentRepository> = if parent_pointers {
            Arc::new(ParentPointerComments::new(store.clone()))
        } else {
            Arc::new(ChildListComments::new(store.clone()))
        };
        let forum = Self {
            posts: Arc::new(DocumentPosts::new(store.clone())),
            comments,
            profiles: Arc::new(DocumentProfiles::new(store.clone())),
            votes: Arc::new(DocumentVotes::new(store)),
            author: Uuid::now_v7(),
        };
        forum.profile(forum.author, "author").await;
        forum
    }

    pub fn at(ms: i64) -> Timestamp {
        Utc.timestamp_millis_opt(ms).unwrap()
    }

    pub fn record(id: Uuid, parent_id: Uuid, ms: i64) -> CommentRecord {
        CommentRecord {
            id,
            parent_id,
            content: format!("comment at {ms}"),
            author_id: Uuid::now_v7(),
            created_at: Self::at(ms),
            updated_at: Self::at(ms),
            vote_tally: VoteTally::default(),
        }
    }

    pub fn walk(&self) -> AncestorWalk {
        AncestorWalk::new(self.comments.clone(), self.posts.clone())
    }

    pub async fn profile(&self, id: Uuid, name: &str) {
        self.profiles
            .insert_profile(Profile {
                id,
                name: name.to_string(),
                title: String::new(),
                description: String::new(),
                avatar_url: String::new(),
            })
            .await
            .unwrap();
    }

    pub async fn post(&self, title: &str, ms: i64) -> Uuid {
        let id = Uuid::now_v7();
        self.posts
            .insert_post(PostRecord {
                id,
                title: title.to_string(),
                content: String::new(),
                image: None,
                author_id: self.author,
                created_at: Self::at(ms),
                updated_at: Self::at(ms),
                vote_tally: VoteTally::default(),
            })
            .await
            .unwrap();
        id
    }

    pub async fn comment(&self, parent_id: Uuid, ms: i64) -> Uuid {
        self.comment_by(parent_id, self.author, ms, 0).await
    }

    pub async fn comment_by(&self, parent_id: Uuid, author_id: Uuid, ms: i64, net_score: i64) -> Uuid {
        let mut record = Self::record(Uuid::now_v7(), parent_id, ms);
        record.author_id = author_id;
        record.vote_tally.net_score = net_score;
        let id = record.id;
        self.comments.insert_comment(record).await.unwrap();
        id
    }

    pub async fn comment_updated_at(&self, id: Uuid) -> Timestamp {
        self.comments.get_comment(id).await.unwrap().unwrap().updated_at
    }

    pub async fn post_updated_at(&self, id: Uuid) -> Timestamp {
        self.posts.get_post(id).await.unwrap().unwrap().updated_at
    }
}
