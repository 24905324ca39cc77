//! # services
//!
//! Application logic of agora, written against the domain ports only:
//!
//! - [`CommentTreeService`]: builds comment trees and inserts comments
//! - [`Propagator`]: walks `updatedAt` up the ancestor chain, inline or on
//!   a background queue
//! - [`VoteLedger`]: tally updates and per-user vote maps
//! - [`PostService`], [`ProfileService`], [`AlbumService`]: the remaining
//!   passthrough operations

pub mod album;
pub mod comment_tree;
pub mod posts;
pub mod profiles;
pub mod propagation;
pub mod votes;

pub use album::AlbumService;
pub use comment_tree::{CommentTreeService, SiblingOrder};
pub use posts::PostService;
pub use profiles::ProfileService;
pub use propagation::{
    AncestorWalk, PropagationJob, PropagationSnapshot, PropagationWorker, Propagator, RetryPolicy,
};
pub use votes::VoteLedger;

#[cfg(test)]
pub(crate) mod fixtures;
