//! Middleware pipeline around repository operations.
//!
//! # Responsibility
//! - Carry per-call context (identity, request metadata, result).
//! - Compose registered interceptors around the adapter call.
//!
//! # Invariants
//! - Registration order is nesting order; there is no priority reordering.
//! - A middleware that returns without calling `next` stops the chain.
//!
//! # See also
//! - crate::repo::repository for context construction.

pub mod builtin;
pub mod context;
pub mod manager;

pub use context::{
    CallScope, MiddlewareContext, OperationContext, RequestMetadata, User, LOCALE_KEY,
};
pub use manager::{
    Middleware, MiddlewareManager, MiddlewareRequirements, Next, Operation, UseOptions,
};
