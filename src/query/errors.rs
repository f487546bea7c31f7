#![forbid(unsafe_code)]
#![allow(missing_docs)]

use std::fmt;

use thiserror::Error;

use crate::types::QuarryError;

/// Broad class of a compile failure, used to build client-facing responses.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    /// Ambiguous or unknown selector.
    Selector,
    /// Object reference or object id could not be resolved.
    Reference,
    /// Unknown qualified property name.
    Property,
    /// Unknown type or aspect name.
    Type,
    /// Argument shape or literal problems.
    Argument,
    /// Collaborator failure; not a property of the query itself.
    Infrastructure,
}

/// Structured errors emitted while lowering a predicate.
///
/// Every logical variant names the offending selector, property, type or
/// reference so callers can report an "invalid query" that points at it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// Explicit selector is not one of the active selectors.
    #[error("unknown selector '{selector}'")]
    UnknownSelector { selector: String },
    /// No explicit selector while zero or several selectors are active.
    #[error("{predicate} requires an explicit selector ({active} selectors active)")]
    SelectorRequired {
        predicate: &'static str,
        active: usize,
    },
    /// Object reference or id cannot be mapped to a stored object.
    #[error("unresolvable reference '{reference}'")]
    UnresolvableReference { reference: String },
    /// Property name is not declared in the dictionary.
    #[error("unknown property '{prop}'")]
    UnknownProperty { prop: String },
    /// Type or aspect name is not declared in the dictionary.
    #[error("unknown type '{type_name}'")]
    UnknownType { type_name: String },
    /// Predicate kind cannot target this property.
    #[error("{predicate} is not supported on '{prop}'")]
    UnsupportedPredicate {
        predicate: &'static str,
        prop: String,
    },
    /// Property data type cannot be filtered on.
    #[error("property '{prop}' of type {data_type} cannot be filtered")]
    UnsupportedDataType { prop: String, data_type: String },
    /// Literal could not be coerced for the target field.
    #[error("literal '{value}' for '{prop}' is not a valid {expected}")]
    InvalidLiteral {
        prop: String,
        value: String,
        expected: &'static str,
    },
    /// Membership list had no values.
    #[error("in() on '{prop}' requires at least one value")]
    InListEmpty { prop: String },
    /// Membership list exceeded the configured budget.
    #[error("in() list exceeds maximum of {max} values")]
    InListTooLarge { max: usize },
    /// Types and aspects mixed in one type-id membership test.
    #[error("'{prop}' mixes types and aspects in one predicate")]
    MixedClassKinds { prop: String },
    /// Collaborator failure surfaced during compilation.
    #[error("catalog failure: {0}")]
    Catalog(String),
}

impl From<QuarryError> for CompileError {
    fn from(err: QuarryError) -> Self {
        CompileError::Catalog(err.to_string())
    }
}

impl CompileError {
    /// Builds an [`CompileError::UnknownProperty`].
    pub fn unknown_property(prop: impl Into<String>) -> Self {
        CompileError::UnknownProperty { prop: prop.into() }
    }

    /// Builds an [`CompileError::UnresolvableReference`].
    pub fn unresolvable(reference: impl Into<String>) -> Self {
        CompileError::UnresolvableReference {
            reference: reference.into(),
        }
    }

    /// Builds an [`CompileError::UnsupportedPredicate`].
    pub fn unsupported(predicate: &'static str, prop: impl Into<String>) -> Self {
        CompileError::UnsupportedPredicate {
            predicate,
            prop: prop.into(),
        }
    }

    /// Returns the taxonomy class of the error.
    pub fn class(&self) -> ErrorClass {
        match self {
            CompileError::UnknownSelector { .. } | CompileError::SelectorRequired { .. } => {
                ErrorClass::Selector
            }
            CompileError::UnresolvableReference { .. } => ErrorClass::Reference,
            CompileError::UnknownProperty { .. } => ErrorClass::Property,
            CompileError::UnknownType { .. } | CompileError::MixedClassKinds { .. } => {
                ErrorClass::Type
            }
            CompileError::UnsupportedPredicate { .. }
            | CompileError::UnsupportedDataType { .. }
            | CompileError::InvalidLiteral { .. }
            | CompileError::InListEmpty { .. }
            | CompileError::InListTooLarge { .. } => ErrorClass::Argument,
            CompileError::Catalog(_) => ErrorClass::Infrastructure,
        }
    }

    /// Returns a machine-readable code for the error variant.
    pub fn code(&self) -> &'static str {
        match self {
            CompileError::UnknownSelector { .. } => "UnknownSelector",
            CompileError::SelectorRequired { .. } => "SelectorRequired",
            CompileError::UnresolvableReference { .. } => "UnresolvableReference",
            CompileError::UnknownProperty { .. } => "UnknownProperty",
            CompileError::UnknownType { .. } => "UnknownType",
            CompileError::UnsupportedPredicate { .. } => "UnsupportedPredicate",
            CompileError::UnsupportedDataType { .. } => "UnsupportedDataType",
            CompileError::InvalidLiteral { .. } => "InvalidLiteral",
            CompileError::InListEmpty { .. } => "InListEmpty",
            CompileError::InListTooLarge { .. } => "InListTooLarge",
            CompileError::MixedClassKinds { .. } => "UnknownType",
            CompileError::Catalog(_) => "CatalogFailure",
        }
    }
}

/// Convenience wrapper that formats compile errors with their codes.
pub struct CompileErrorWithCode<'a>(pub &'a CompileError);

impl fmt::Display for CompileErrorWithCode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.0.code(), self.0)
    }
}
