//! # Comment Tree Engine
//!
//! Reads a post's comment forest recursively through the
//! [`CommentRepository`] seam, so the same engine serves both storage
//! layouts. Every node is enriched with its author profile on the way
//! out; a node whose profile cannot be resolved is dropped together with
//! its subtree and the rest of the tree is still returned.

use std::sync::Arc;

use async_recursion::async_recursion;
use chrono::Utc;
use domains::{
    Comment, CommentRecord, CommentRepository, DomainError, DomainResult, NewComment,
    PostRepository, ProfileRepository, VoteTally,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::propagation::{PropagationJob, Propagator};

/// How siblings are ordered in a built tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SiblingOrder {
    /// Highest net score first, ties broken by most recent `updatedAt`.
    #[default]
    BestFirst,
    /// The layout's stored order.
    Insertion,
}

impl SiblingOrder {
    fn arrange(self, siblings: &mut [Comment]) {
        if self == Self::BestFirst {
            siblings.sort_by(|a, b| {
                b.vote_tally
                    .net_score
                    .cmp(&a.vote_tally.net_score)
                    .then_with(|| b.updated_at.cmp(&a.updated_at))
            });
        }
    }
}

pub struct CommentTreeService {
    comments: Arc<dyn CommentRepository>,
    posts: Arc<dyn PostRepository>,
    profiles: Arc<dyn ProfileRepository>,
    propagator: Propagator,
    order: SiblingOrder,
}

impl CommentTreeService {
    pub fn new(
        comments: Arc<dyn CommentRepository>,
        posts: Arc<dyn PostRepository>,
        profiles: Arc<dyn ProfileRepository>,
        propagator: Propagator,
        order: SiblingOrder,
    ) -> Self {
        Self {
            comments,
            posts,
            profiles,
            propagator,
            order,
        }
    }

    pub fn propagator(&self) -> &Propagator {
        &self.propagator
    }

    /// Every comment under `post_id`, as an ordered forest.
    ///
    /// A post without comments yields an empty forest; an unknown post is
    /// `NotFound`.
    #[instrument(skip(self))]
    pub async fn build_tree(&self, post_id: Uuid) -> DomainResult<Vec<Comment>> {
        if self.posts.get_post(post_id).await?.is_none() {
            return Err(DomainError::not_found("post", post_id));
        }
        self.expand(post_id).await
    }

    #[async_recursion]
    async fn expand(&self, parent_id: Uuid) -> DomainResult<Vec<Comment>> {
        let records = self.comments.children_of(parent_id).await?;
        let mut siblings = Vec::with_capacity(records.len());

        for record in records {
            if let Some(node) = self.enrich(record).await? {
                siblings.push(node);
            }
        }
        self.order.arrange(&mut siblings);
        Ok(siblings)
    }

    async fn enrich(&self, record: CommentRecord) -> DomainResult<Option<Comment>> {
        let profile = match self.profiles.get_profile(record.author_id).await {
            Ok(profile) => profile,
            Err(err) => {
                warn!(comment_id = %record.id, author_id = %record.author_id, error = %err,
                    "dropping comment subtree, author profile unavailable");
                return Ok(None);
            }
        };
        let children = self.expand(record.id).await?;
        Ok(Some(Comment::from_record(record, profile, children)))
    }

    /// Stores a reply under `parent_id` (a post or a comment) and schedules
    /// the ancestor walk. Returns the new comment's id.
    #[instrument(skip(self, comment), fields(author_id = %comment.author_id))]
    pub async fn insert_comment(&self, parent_id: Uuid, comment: NewComment) -> DomainResult<Uuid> {
        if comment.content.trim().is_empty() {
            return Err(DomainError::BadRequest("comment content must not be empty".into()));
        }
        self.ensure_parent(parent_id).await?;

        let at = comment.created_at.unwrap_or_else(Utc::now);
        let record = CommentRecord {
            id: Uuid::now_v7(),
            parent_id,
            content: comment.content,
            author_id: comment.author_id,
            created_at: at,
            updated_at: at,
            vote_tally: VoteTally::default(),
        };
        let id = record.id;
        self.comments.insert_comment(record).await?;
        info!(comment_id = %id, "comment stored");

        self.propagator
            .submit(PropagationJob { start: parent_id, at })
            .await?;
        Ok(id)
    }

    async fn ensure_parent(&self, parent_id: Uuid) -> DomainResult<()> {
        if self.comments.get_comment(parent_id).await?.is_some()
            || self.posts.get_post(parent_id).await?.is_some()
        {
            return Ok(());
        }
        Err(DomainError::not_found("parent", parent_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::Forum;
    use crate::propagation::{AncestorWalk, RetryPolicy};
    use domains::{MockCommentRepository, MockPostRepository, MockProfileRepository};

    fn service(forum: &Forum, order: SiblingOrder) -> CommentTreeService {
        CommentTreeService::new(
            forum.comments.clone(),
            forum.posts.clone(),
            forum.profiles.clone(),
            Propagator::inline(Arc::new(forum.walk())),
            order,
        )
    }

    fn ids(nodes: &[Comment]) -> Vec<Uuid> {
        nodes.iter().map(|c| c.id).collect()
    }

    fn reply(content: &str, author_id: Uuid, ms: i64) -> NewComment {
        NewComment {
            content: content.to_string(),
            author_id,
            created_at: Some(Forum::at(ms)),
        }
    }

    #[tokio::test]
    async fn post_without_comments_is_an_empty_forest() {
        let forum = Forum::new().await;
        let post = forum.post("quiet", 0).await;
        let tree = service(&forum, SiblingOrder::BestFirst).build_tree(post).await.unwrap();
        assert!(tree.is_empty());
    }

    #[tokio::test]
    async fn unknown_post_is_not_found() {
        let forum = Forum::new().await;
        let err = service(&forum, SiblingOrder::BestFirst)
            .build_tree(Uuid::now_v7())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn tree_nests_children_and_enriches_authors() {
        let forum = Forum::new().await;
        let post = forum.post("root", 0).await;
        let c1 = forum.comment(post, 10).await;
        let c2 = forum.comment(c1, 20).await;
        let c3 = forum.comment(c2, 30).await;

        let tree = service(&forum, SiblingOrder::Insertion).build_tree(post).await.unwrap();

        assert_eq!(ids(&tree), vec![c1]);
        assert_eq!(ids(&tree[0].children), vec![c2]);
        assert_eq!(ids(&tree[0].children[0].children), vec![c3]);
        assert_eq!(tree[0].author_profile.name, "author");
        assert_eq!(tree[0].subtree_len(), 3);
    }

    #[tokio::test]
    async fn best_first_orders_by_score_then_recency() {
        let forum = Forum::new().await;
        let author = forum.author;
        let post = forum.post("ranked", 0).await;
        let low = forum.comment_by(post, author, 10, -1).await;
        let old_top = forum.comment_by(post, author, 20, 5).await;
        let new_top = forum.comment_by(post, author, 30, 5).await;
        let neutral = forum.comment_by(post, author, 40, 0).await;

        let best = service(&forum, SiblingOrder::BestFirst).build_tree(post).await.unwrap();
        assert_eq!(ids(&best), vec![new_top, old_top, neutral, low]);

        let stored = service(&forum, SiblingOrder::Insertion).build_tree(post).await.unwrap();
        assert_eq!(ids(&stored), vec![low, old_top, new_top, neutral]);
    }

    #[tokio::test]
    async fn missing_profile_drops_only_that_subtree() {
        let forum = Forum::new().await;
        let post = forum.post("partial", 0).await;
        let kept = forum.comment(post, 10).await;
        let kept_child = forum.comment(kept, 11).await;
        let ghost = forum.comment_by(post, Uuid::now_v7(), 20, 0).await;
        let _ghost_child = forum.comment(ghost, 21).await;
        let sibling = forum.comment(post, 30).await;

        let tree = service(&forum, SiblingOrder::Insertion).build_tree(post).await.unwrap();

        assert_eq!(ids(&tree), vec![kept, sibling]);
        assert_eq!(ids(&tree[0].children), vec![kept_child]);
    }

    #[tokio::test]
    async fn building_twice_yields_the_same_tree() {
        let forum = Forum::with_parent_pointers().await;
        let post = forum.post("stable", 0).await;
        for ms in [10, 20, 30] {
            let c = forum.comment(post, ms).await;
            forum.comment(c, ms + 1).await;
        }

        let svc = service(&forum, SiblingOrder::BestFirst);
        let first = svc.build_tree(post).await.unwrap();
        let second = svc.build_tree(post).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
    }

    #[tokio::test]
    async fn store_failures_are_not_swallowed() {
        let post = Uuid::now_v7();
        let mut posts = MockPostRepository::new();
        posts
            .expect_get_post()
            .returning(move |_| Ok(Some(fixture_post(post))));
        let mut comments = MockCommentRepository::new();
        comments
            .expect_children_of()
            .returning(|_| Err(DomainError::Store("cursor lost".into())));
        let comments: Arc<dyn CommentRepository> = Arc::new(comments);
        let posts: Arc<dyn PostRepository> = Arc::new(posts);

        let svc = CommentTreeService::new(
            comments.clone(),
            posts.clone(),
            Arc::new(MockProfileRepository::new()),
            Propagator::inline(Arc::new(AncestorWalk::new(comments, posts))),
            SiblingOrder::BestFirst,
        );
        let err = svc.build_tree(post).await.unwrap_err();
        assert!(matches!(err, DomainError::Store(_)));
    }

    fn fixture_post(id: Uuid) -> domains::PostRecord {
        domains::PostRecord {
            id,
            title: "t".into(),
            content: String::new(),
            image: None,
            author_id: Uuid::now_v7(),
            created_at: Forum::at(0),
            updated_at: Forum::at(0),
            vote_tally: VoteTally::default(),
        }
    }

    #[tokio::test]
    async fn insert_propagates_through_every_ancestor() {
        let forum = Forum::new().await;
        let svc = service(&forum, SiblingOrder::Insertion);
        let post = forum.post("p1", 0).await;
        let c1 = forum.comment(post, 10).await;
        let c2 = forum.comment(c1, 20).await;

        svc.insert_comment(c1, reply("hi", forum.author, 100)).await.unwrap();
        assert_eq!(forum.comment_updated_at(c1).await, Forum::at(100));
        assert_eq!(forum.post_updated_at(post).await, Forum::at(100));

        let deep = svc.insert_comment(c2, reply("deeper", forum.author, 200)).await.unwrap();
        assert_eq!(forum.comment_updated_at(c2).await, Forum::at(200));
        assert_eq!(forum.comment_updated_at(c1).await, Forum::at(200));
        assert_eq!(forum.post_updated_at(post).await, Forum::at(200));

        let tree = svc.build_tree(post).await.unwrap();
        assert_eq!(tree[0].subtree_len(), 4);
        assert_eq!(ids(&tree[0].children[0].children), vec![deep]);
    }

    #[tokio::test]
    async fn background_insert_is_visible_once_the_queue_drains() {
        let forum = Forum::new().await;
        let (propagator, worker) =
            Propagator::background(Arc::new(forum.walk()), RetryPolicy::default());
        let svc = CommentTreeService::new(
            forum.comments.clone(),
            forum.posts.clone(),
            forum.profiles.clone(),
            propagator,
            SiblingOrder::BestFirst,
        );
        let post = forum.post("async", 0).await;

        svc.insert_comment(post, reply("first", forum.author, 50)).await.unwrap();
        worker.shutdown().await;

        assert_eq!(forum.post_updated_at(post).await, Forum::at(50));
        assert_eq!(svc.propagator().stats().completed, 1);
    }

    #[tokio::test]
    async fn insert_validates_content_and_parent() {
        let forum = Forum::new().await;
        let svc = service(&forum, SiblingOrder::Insertion);
        let post = forum.post("p", 0).await;

        let err = svc.insert_comment(post, reply("   ", forum.author, 1)).await.unwrap_err();
        assert!(matches!(err, DomainError::BadRequest(_)));

        let err = svc
            .insert_comment(Uuid::now_v7(), reply("orphan", forum.author, 1))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
