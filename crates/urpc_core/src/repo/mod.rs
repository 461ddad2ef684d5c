//! Repository facade and registry.
//!
//! # Responsibility
//! - Bind adapters to `(entity, source)` identities.
//! - Resolve repositories by normalized key.
//!
//! # Invariants
//! - Registration and lookup apply the same entity-name normalization.
//! - Lookup of an unknown key yields `None`; callers decide whether that is
//!   an error.

pub mod registry;
pub mod repository;

pub use registry::{registry_key, RepoRegistry};
pub use repository::Repository;
