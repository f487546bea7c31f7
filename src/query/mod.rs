#![forbid(unsafe_code)]

//! Predicate lowering.
//!
//! Turns function-style predicates over selectors and properties into a join
//! plan and an ordered list of predicate fragments, resolving every symbolic
//! identifier on the way.

/// Predicate syntax: selectors, property references, literals.
pub mod ast;

/// Dispatch and the per-query compilation driver.
pub mod compiler;

/// Compile error taxonomy.
pub mod errors;

/// Type expansion policies.
pub mod expansion;

/// Explain trees for compiled queries.
pub mod explain;

/// Predicate fragments and their accumulator.
pub mod fragments;

/// Join commands and the join planner.
pub mod joins;

/// Identifier resolution backed by catalog collaborators.
pub mod resolver;

/// Builder-support strategies.
pub mod support;

/// Physical columns and literal coercion.
pub mod value;

pub use compiler::{
    CompileContext, CompiledQuery, LoweredPredicate, PredicateCompiler, Query, QueryCompiler,
};
pub use errors::{CompileError, CompileErrorWithCode, ErrorClass};
pub use resolver::{
    Collaborators, IdentifierResolver, PropertyKind, ResolvedProperty, ResolverOptions,
};
pub use support::{BuilderSupport, PredicateSupport};
