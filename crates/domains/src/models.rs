//! # Domain Models
//!
//! Entities of agora: profiles, album photos, forum posts, comment trees
//! and vote bookkeeping. Stored shapes (`*Record`) are what the document
//! store holds; view shapes (`Post`, `Comment`) carry the author profile
//! denormalized at read time.
//!
//! Timestamps travel as integer epoch milliseconds, both on the wire and
//! inside stored documents.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{DomainError, DomainResult};

pub type Timestamp = DateTime<Utc>;

/// Parses a path or body identifier, rejecting anything that is not a UUID.
pub fn parse_id(kind: &'static str, raw: &str) -> DomainResult<Uuid> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| DomainError::BadRequest(format!("malformed {kind} id `{raw}`")))
}

// ─── Profiles & album ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub avatar_url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProfile {
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub avatar_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Photo {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewPhoto {
    pub url: String,
}

// ─── Votes ──────────────────────────────────────────────────────────────────

/// Aggregate counters attached to a post or comment.
///
/// `net_score` is the running sum of applied deltas. `upvotes` and
/// `downvotes` are maintained independently and are not reconciled
/// against it.
///
/// Deltas are client-trusted, so the raw counters can go negative: a
/// `-2` flip applied to a fresh tally leaves `upvotes` at `-1`. Read them
/// as net moves, not as vote counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteTally {
    #[serde(default)]
    pub upvotes: i64,
    #[serde(default)]
    pub downvotes: i64,
    #[serde(default)]
    pub net_score: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Post,
    Comment,
}

impl TargetKind {
    pub fn from_is_post(is_post: bool) -> Self {
        if is_post {
            Self::Post
        } else {
            Self::Comment
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Comment => "comment",
        }
    }
}

/// Last known vote of one user on one target. Encoded as -1 / 0 / 1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum VoteState {
    #[default]
    Unvoted,
    Upvoted,
    Downvoted,
}

impl VoteState {
    pub fn score(self) -> i8 {
        match self {
            Self::Unvoted => 0,
            Self::Upvoted => 1,
            Self::Downvoted => -1,
        }
    }

    /// The state a delta leads to when the caller did not state it.
    /// A zero delta says nothing about the resulting state.
    pub fn implied_by(delta: VoteDelta) -> Option<Self> {
        match delta.value() {
            d if d > 0 => Some(Self::Upvoted),
            d if d < 0 => Some(Self::Downvoted),
            _ => None,
        }
    }
}

impl From<VoteState> for i8 {
    fn from(state: VoteState) -> Self {
        state.score()
    }
}

impl TryFrom<i8> for VoteState {
    type Error = String;

    fn try_from(raw: i8) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(Self::Unvoted),
            1 => Ok(Self::Upvoted),
            -1 => Ok(Self::Downvoted),
            other => Err(format!("vote status must be -1, 0 or 1, got {other}")),
        }
    }
}

/// A vote transition expressed as a change of net score, in [-2, 2].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VoteDelta(i8);

impl VoteDelta {
    pub const LIMIT: i64 = 2;

    /// Out-of-range requests are treated as a no-op, not rejected.
    pub fn clamped(raw: i64) -> Self {
        if (-Self::LIMIT..=Self::LIMIT).contains(&raw) {
            Self(raw as i8)
        } else {
            Self(0)
        }
    }

    pub fn between(from: VoteState, to: VoteState) -> Self {
        Self(to.score() - from.score())
    }

    pub fn value(self) -> i8 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

/// Per-counter changes applied to a tally in one atomic document update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TallyChange {
    pub upvotes: i64,
    pub downvotes: i64,
    pub net_score: i64,
}

impl TallyChange {
    /// Splits a delta into raw counter moves. `resulting` disambiguates
    /// ±1, which is either a fresh vote or a retraction.
    pub fn for_transition(delta: VoteDelta, resulting: Option<VoteState>) -> Self {
        let (upvotes, downvotes) = match (delta.value(), resulting) {
            (2, _) => (1, -1),
            (-2, _) => (-1, 1),
            (1, Some(VoteState::Unvoted)) => (0, -1),
            (1, _) => (1, 0),
            (-1, Some(VoteState::Unvoted)) => (-1, 0),
            (-1, _) => (0, 1),
            _ => (0, 0),
        };
        Self {
            upvotes,
            downvotes,
            net_score: i64::from(delta.value()),
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

/// One record per user: target id → last known vote.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserVoteRecord {
    #[serde(rename = "_id")]
    pub user_id: Uuid,
    #[serde(default)]
    pub vote_map: BTreeMap<Uuid, VoteState>,
}

impl UserVoteRecord {
    pub fn state_for(&self, target_id: Uuid) -> VoteState {
        self.vote_map.get(&target_id).copied().unwrap_or_default()
    }
}

/// Client-trusted vote: the delta is applied as given (after clamping).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub target_id: Uuid,
    pub user_id: Uuid,
    pub is_post: bool,
    pub delta: i64,
    #[serde(default)]
    pub vote_status: Option<VoteState>,
}

/// Server-derived vote: the caller states where it wants to end up.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CastVoteRequest {
    pub target_id: Uuid,
    pub user_id: Uuid,
    pub is_post: bool,
    pub vote_status: VoteState,
}

// ─── Posts ──────────────────────────────────────────────────────────────────

/// A post as stored in `forumPosts`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRecord {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub image: Option<String>,
    pub author_id: Uuid,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: Timestamp,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: Timestamp,
    #[serde(default)]
    pub vote_tally: VoteTally,
}

/// A post with its author profile resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub image: Option<String>,
    pub author_id: Uuid,
    pub author_profile: Profile,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: Timestamp,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: Timestamp,
    pub vote_tally: VoteTally,
}

impl Post {
    pub fn from_record(record: PostRecord, author_profile: Profile) -> Self {
        Self {
            id: record.id,
            title: record.title,
            content: record.content,
            image: record.image,
            author_id: record.author_id,
            author_profile,
            created_at: record.created_at,
            updated_at: record.updated_at,
            vote_tally: record.vote_tally,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub image: Option<String>,
    pub author_id: Uuid,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub created_at: Option<Timestamp>,
}

// ─── Comments ───────────────────────────────────────────────────────────────

/// A comment as stored in `forumComments`. `parent_id` is either a post
/// id or another comment id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentRecord {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub parent_id: Uuid,
    pub content: String,
    pub author_id: Uuid,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: Timestamp,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: Timestamp,
    #[serde(default)]
    pub vote_tally: VoteTally,
}

/// A node of the comment tree returned to readers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub parent_id: Uuid,
    pub content: String,
    pub author_id: Uuid,
    pub author_profile: Profile,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: Timestamp,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: Timestamp,
    pub vote_tally: VoteTally,
    #[serde(default)]
    pub children: Vec<Comment>,
}

impl Comment {
    pub fn from_record(record: CommentRecord, author_profile: Profile, children: Vec<Comment>) -> Self {
        Self {
            id: record.id,
            parent_id: record.parent_id,
            content: record.content,
            author_id: record.author_id,
            author_profile,
            created_at: record.created_at,
            updated_at: record.updated_at,
            vote_tally: record.vote_tally,
            children,
        }
    }

    /// Number of nodes in this subtree, including itself.
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(Comment::subtree_len).sum::<usize>()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    pub content: String,
    pub author_id: Uuid,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub created_at: Option<Timestamp>,
}

/// Ordered child ids of one parent, stored in `forumSubComments` under the
/// parent's id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildList {
    #[serde(rename = "_id")]
    pub parent_id: Uuid,
    #[serde(default)]
    pub comment_ids: Vec<Uuid>,
}
