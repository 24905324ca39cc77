//! # domains
//!
//! The pure core of agora: entities, the document model, the error
//! taxonomy and the port traits every adapter implements. No I/O lives
//! here.

pub mod document;
pub mod errors;
pub mod models;
pub mod ports;

pub use document::{Document, Filter, Sort, SortOrder, Update, UpdateOp, ID_FIELD};
pub use errors::{DomainError, DomainResult};
pub use models::*;
pub use ports::*;
