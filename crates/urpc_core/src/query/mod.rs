//! Query model shared by adapters and middleware.
//!
//! # Responsibility
//! - Parse where-clauses, ordering and argument records from JSON.
//! - Evaluate filters and ordering against JSON rows.
//!
//! # Invariants
//! - Malformed query input is a `BAD_REQUEST`, never a silent match-all.
//! - Ordering is stable for equal keys.

pub mod args;
pub mod compare;
pub mod filter;
pub mod order;

pub use args::{
    decode_args, encode_args, ConflictTarget, CreateArgs, CreateManyArgs, DeleteArgs,
    FindManyArgs, FindOneArgs, UpdateArgs, UpdateManyArgs, UpsertArgs, UpsertManyArgs,
};
pub use filter::{Condition, FieldOperators, MatchMode, WhereClause};
pub use order::{OrderBy, OrderTerm, SortDirection};
