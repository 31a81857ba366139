//! Huddle Store — in-memory implementations of the `huddle-core`
//! persistence traits.
//!
//! This crate provides:
//! - [`MemoryGroupStore`]: the reference [`GroupRepository`] backend
//!   with optimistic concurrency and store-side join-code uniqueness
//! - [`MemoryIdentityDirectory`]: an [`IdentityProvider`] backed by a
//!   plain user-id set, for tests and embedders
//! - Error types ([`StoreError`])
//!
//! [`GroupRepository`]: huddle_core::repository::GroupRepository
//! [`IdentityProvider`]: huddle_core::repository::IdentityProvider

mod error;
mod memory;

pub use error::StoreError;
pub use memory::{MemoryGroupStore, MemoryIdentityDirectory};
