//! Git operations needed to index a remote repository
//!
//! Only cloning is required: the index is built from a fresh working tree of the
//! default branch, and the checked-out HEAD SHA is recorded alongside it.

/// Shallow cloning of remote repositories
pub mod clone;

pub use clone::{CheckoutRequest, ClonedRepo, clone_repository};
