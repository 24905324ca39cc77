//! Repositories over the `DocumentStore` contract.
//!
//! Comments come in two layouts; a deployment wires exactly one of them.

mod album;
mod comments;
mod posts;
mod profiles;
mod votes;

pub use album::DocumentAlbum;
pub use comments::{ChildListComments, ParentPointerComments};
pub use posts::DocumentPosts;
pub use profiles::DocumentProfiles;
pub use votes::DocumentVotes;
