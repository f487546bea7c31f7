//! Low-level primitives shared by the query layer.

/// Order-preserving text encoders for numeric literals.
///
/// Gives numeric values a canonical string form whose lexical order matches numeric order.
pub mod numeric;
