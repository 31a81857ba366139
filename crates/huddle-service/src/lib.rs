//! Huddle Service — the group membership and role-authorization
//! engine.
//!
//! Every mutating operation is one atomic read-modify-write unit
//! against a single Group aggregate: load a snapshot, authorize the
//! caller against it, apply the transition, save. Saves that lose a
//! race against a concurrent writer are retried from a fresh snapshot
//! a bounded number of times.

pub mod config;
pub mod service;

pub use config::GroupServiceConfig;
pub use service::GroupService;
