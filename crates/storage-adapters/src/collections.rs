//! Collection names shared by every repository.

pub const PROFILES: &str = "profiles";
pub const ALBUM: &str = "album";
pub const POSTS: &str = "forumPosts";
pub const COMMENTS: &str = "forumComments";
/// Ordered child-id lists, keyed by parent id.
pub const CHILD_LISTS: &str = "forumSubComments";
pub const USER_VOTES: &str = "forumUserVotes";
