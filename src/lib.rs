//! Predicate lowering for a content metadata repository.
//!
//! Compiles child-of, membership, pattern, comparison and existence predicates
//! into join commands and predicate fragments for a relational node store.

#![warn(missing_docs)]

pub mod catalog;
pub mod config;
pub mod logging;
pub mod primitives;
pub mod query;
pub mod types;

pub use config::CompilerOptions;
pub use query::{CompileError, CompiledQuery, Query, QueryCompiler};
