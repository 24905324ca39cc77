//! Test harness: the full service stack wired over the in-memory store,
//! the same way the binary wires it.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use domains::{CommentRepository, DocumentStore, NewComment, NewPost, NewProfile, PostRepository};
use services::{
    AlbumService, AncestorWalk, CommentTreeService, PostService, ProfileService, PropagationWorker,
    Propagator, RetryPolicy, SiblingOrder, VoteLedger,
};
use storage_adapters::{
    ChildListComments, DocumentAlbum, DocumentPosts, DocumentProfiles, DocumentVotes,
    MemoryDocumentStore, ParentPointerComments, TimedStore,
};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    ChildList,
    ParentPointer,
}

pub struct Stack {
    pub profiles: Arc<ProfileService>,
    pub album: Arc<AlbumService>,
    pub posts: Arc<PostService>,
    pub comments: Arc<CommentTreeService>,
    pub votes: Arc<VoteLedger>,
    pub post_repo: Arc<dyn PostRepository>,
    pub comment_repo: Arc<dyn CommentRepository>,
    worker: Option<PropagationWorker>,
}

impl Stack {
    pub fn inline(layout: Layout) -> Self {
        Self::build(layout, false)
    }

    /// Must be called inside a tokio runtime; spawns the queue worker.
    pub fn background(layout: Layout) -> Self {
        Self::build(layout, true)
    }

    fn build(layout: Layout, background: bool) -> Self {
        let memory: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());
        let store: Arc<dyn DocumentStore> = Arc::new(TimedStore::new(memory, Duration::from_secs(10)));

        let profiles = Arc::new(DocumentProfiles::new(store.clone()));
        let post_repo: Arc<dyn PostRepository> = Arc::new(DocumentPosts::new(store.clone()));
        let comment_repo: Arc<dyn CommentRepository> = match layout {
            Layout::ChildList => Arc::new(ChildListComments::new(store.clone())),
            Layout::ParentPointer => Arc::new(ParentPointerComments::new(store.clone())),
        };

        let walk = Arc::new(AncestorWalk::new(comment_repo.clone(), post_repo.clone()));
        let (propagator, worker) = if background {
            let policy = RetryPolicy {
                backoff: Duration::from_millis(1),
                ..RetryPolicy::default()
            };
            let (propagator, worker) = Propagator::background(walk, policy);
            (propagator, Some(worker))
        } else {
            (Propagator::inline(walk), None)
        };

        Self {
            profiles: Arc::new(ProfileService::new(profiles.clone())),
            album: Arc::new(AlbumService::new(Arc::new(DocumentAlbum::new(store.clone())))),
            posts: Arc::new(PostService::new(post_repo.clone(), profiles.clone())),
            comments: Arc::new(CommentTreeService::new(
                comment_repo.clone(),
                post_repo.clone(),
                profiles,
                propagator,
                SiblingOrder::BestFirst,
            )),
            votes: Arc::new(VoteLedger::new(Arc::new(DocumentVotes::new(store)))),
            post_repo,
            comment_repo,
            worker,
        }
    }

    #[cfg(feature = "web-axum")]
    pub fn state(&self) -> api_adapters::AppState {
        api_adapters::AppState {
            profiles: self.profiles.clone(),
            album: self.album.clone(),
            posts: self.posts.clone(),
            comments: self.comments.clone(),
            votes: self.votes.clone(),
            metrics: Arc::new(api_adapters::Metrics::new()),
        }
    }

    /// Waits for every queued propagation; no-op for inline stacks.
    pub async fn drain(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.shutdown().await;
        }
    }

    pub async fn user(&self, name: &str) -> Uuid {
        self.profiles
            .create_profile(NewProfile {
                name: name.to_string(),
                ..NewProfile::default()
            })
            .await
            .unwrap()
    }

    pub async fn post(&self, author_id: Uuid, title: &str, ms: i64) -> Uuid {
        self.posts
            .create_post(NewPost {
                title: title.to_string(),
                content: format!("{title} body"),
                image: None,
                author_id,
                created_at: Some(at(ms)),
            })
            .await
            .unwrap()
    }

    pub async fn reply(&self, parent_id: Uuid, author_id: Uuid, content: &str, ms: i64) -> Uuid {
        self.comments
            .insert_comment(
                parent_id,
                NewComment {
                    content: content.to_string(),
                    author_id,
                    created_at: Some(at(ms)),
                },
            )
            .await
            .unwrap()
    }

    pub async fn post_updated_at(&self, post_id: Uuid) -> DateTime<Utc> {
        self.post_repo.get_post(post_id).await.unwrap().unwrap().updated_at
    }

    pub async fn comment_updated_at(&self, comment_id: Uuid) -> DateTime<Utc> {
        self.comment_repo
            .get_comment(comment_id)
            .await
            .unwrap()
            .unwrap()
            .updated_at
    }
}

pub fn at(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).unwrap()
}
