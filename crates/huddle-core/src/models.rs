//! Domain models for the huddle engine.
//!
//! The [`group::Group`] aggregate is the sole aggregate root; all other
//! types here are either parts of it or projections of it.

pub mod group;
pub mod role;
pub mod view;
