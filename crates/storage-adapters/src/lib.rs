//! # storage-adapters
//!
//! Document store backends and the repositories agora builds on them.
//!
//! - [`MemoryDocumentStore`]: process-local, dashmap-backed. Default backend.
//! - `PgDocumentStore` (feature `db-postgres`): one JSONB table in Postgres.
//! - [`TimedStore`]: wraps any backend with the fixed per-call deadline.
//!
//! The repositories in [`repos`] only speak the `DocumentStore` contract,
//! so they run unchanged on every backend.

pub mod codec;
pub mod collections;
pub mod memory;
pub mod repos;
pub mod timed;

#[cfg(feature = "db-postgres")]
pub mod postgres;

pub use memory::MemoryDocumentStore;
pub use repos::{
    ChildListComments, DocumentAlbum, DocumentPosts, DocumentProfiles, DocumentVotes,
    ParentPointerComments,
};
pub use timed::TimedStore;

#[cfg(feature = "db-postgres")]
pub use postgres::PgDocumentStore;
