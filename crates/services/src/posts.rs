use std::sync::Arc;

use chrono::Utc;
use domains::{
    DomainError, DomainResult, NewPost, Post, PostRecord, PostRepository, ProfileRepository,
    VoteTally,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

pub struct PostService {
    posts: Arc<dyn PostRepository>,
    profiles: Arc<dyn ProfileRepository>,
}

impl PostService {
    pub fn new(posts: Arc<dyn PostRepository>, profiles: Arc<dyn ProfileRepository>) -> Self {
        Self { posts, profiles }
    }

    #[instrument(skip(self, post), fields(author_id = %post.author_id))]
    pub async fn create_post(&self, post: NewPost) -> DomainResult<Uuid> {
        if post.title.trim().is_empty() {
            return Err(DomainError::BadRequest("post title must not be empty".into()));
        }

        let at = post.created_at.unwrap_or_else(Utc::now);
        let record = PostRecord {
            id: Uuid::now_v7(),
            title: post.title,
            content: post.content,
            image: post.image,
            author_id: post.author_id,
            created_at: at,
            updated_at: at,
            vote_tally: VoteTally::default(),
        };
        let id = record.id;
        self.posts.insert_post(record).await?;
        info!(post_id = %id, "post created");
        Ok(id)
    }

    /// Most recently active first. Posts whose author cannot be resolved
    /// are left out.
    pub async fn list_posts(&self) -> DomainResult<Vec<Post>> {
        let records = self.posts.list_posts().await?;
        let mut posts = Vec::with_capacity(records.len());
        for record in records {
            match self.profiles.get_profile(record.author_id).await {
                Ok(profile) => posts.push(Post::from_record(record, profile)),
                Err(err) => warn!(post_id = %record.id, author_id = %record.author_id, error = %err,
                    "dropping post, author profile unavailable"),
            }
        }
        Ok(posts)
    }

    pub async fn get_post(&self, post_id: Uuid) -> DomainResult<Post> {
        let record = self
            .posts
            .get_post(post_id)
            .await?
            .ok_or_else(|| DomainError::not_found("post", post_id))?;
        let profile = self.profiles.get_profile(record.author_id).await?;
        Ok(Post::from_record(record, profile))
    }
}
