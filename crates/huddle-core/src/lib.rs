//! Huddle Core — domain models and trait definitions for the group
//! membership and role-authorization engine.
//!
//! This crate provides:
//! - The [`Group`](models::group::Group) aggregate and its transition
//!   functions (join workflow, role assignment, membership removal)
//! - Role-scoped view projections ([`GroupView`](models::view::GroupView))
//! - Error types ([`HuddleError`])
//! - Persistence and identity trait definitions ([`repository`])

pub mod error;
pub mod models;
pub mod repository;

pub use error::{HuddleError, HuddleResult};
