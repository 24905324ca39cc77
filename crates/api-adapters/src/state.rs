use std::sync::Arc;

use services::{AlbumService, CommentTreeService, PostService, ProfileService, VoteLedger};

use crate::metrics::Metrics;

/// Shared across every request; cloning only bumps reference counts.
#[derive(Clone)]
pub struct AppState {
    pub profiles: Arc<ProfileService>,
    pub album: Arc<AlbumService>,
    pub posts: Arc<PostService>,
    pub comments: Arc<CommentTreeService>,
    pub votes: Arc<VoteLedger>,
    pub metrics: Arc<Metrics>,
}
