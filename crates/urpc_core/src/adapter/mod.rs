//! Adapter contract and bundled adapters.
//!
//! # Responsibility
//! - Define the uniform CRUD plus custom-operation surface of a data source.
//! - Route named operations with JSON arguments to typed adapter methods.
//!
//! # Invariants
//! - Unimplemented operations fail with a typed `NOT_FOUND` error, never a
//!   silent no-op.
//! - Adapters receive query arguments and the operation context separately.

pub mod contract;
pub mod introspection;
pub mod memory;

pub use contract::{dispatch, ops, AdapterFactory, BaseAdapter, DataAdapter};
pub use introspection::{SchemaAdapter, GLOBAL_SOURCE, SCHEMA_ENTITY};
pub use memory::MemoryAdapter;
