//! Predicate fragments and their accumulator.
//!
//! A fragment is one filter term: the column it targets, the comparison mode
//! and the already-resolved values. Rendering into a condition is left to the
//! enclosing query builder, which conjoins fragments left to right.

use std::fmt;

use serde::Serialize;

use crate::query::ast::{ComparisonOp, Selector};
use crate::query::value::{PhysicalField, PhysicalLiteral};
use crate::types::{NodeId, QNameId};

/// Comparison mode of a fragment.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PredicateMode {
    /// Single-value equality.
    Equals,
    /// Single-value inequality.
    NotEquals,
    /// Membership.
    In,
    /// Negated membership.
    NotIn,
    /// Pattern match.
    Like,
    /// Negated pattern match.
    NotLike,
    /// `<`
    LessThan,
    /// `<=`
    LessThanEquals,
    /// `>`
    GreaterThan,
    /// `>=`
    GreaterThanEquals,
    /// No value stored.
    IsNull,
    /// Some value stored.
    IsNotNull,
}

impl PredicateMode {
    /// Applies a negation flag: equality and membership become `NotIn`,
    /// pattern matches become `NotLike`, existence tests flip.
    pub fn negate_if(self, negated: bool) -> Self {
        if !negated {
            return self;
        }
        match self {
            PredicateMode::Equals | PredicateMode::In => PredicateMode::NotIn,
            PredicateMode::Like => PredicateMode::NotLike,
            PredicateMode::IsNotNull => PredicateMode::IsNull,
            PredicateMode::IsNull => PredicateMode::IsNotNull,
            other => other,
        }
    }

    /// Mode of a binary comparison.
    pub fn from_comparison(op: ComparisonOp) -> Self {
        match op {
            ComparisonOp::Eq => PredicateMode::Equals,
            ComparisonOp::Ne => PredicateMode::NotEquals,
            ComparisonOp::Lt => PredicateMode::LessThan,
            ComparisonOp::Le => PredicateMode::LessThanEquals,
            ComparisonOp::Gt => PredicateMode::GreaterThan,
            ComparisonOp::Ge => PredicateMode::GreaterThanEquals,
        }
    }

    /// Condition operator.
    pub fn operator(self) -> &'static str {
        match self {
            PredicateMode::Equals => "=",
            PredicateMode::NotEquals => "<>",
            PredicateMode::In => "IN",
            PredicateMode::NotIn => "NOT IN",
            PredicateMode::Like => "LIKE",
            PredicateMode::NotLike => "NOT LIKE",
            PredicateMode::LessThan => "<",
            PredicateMode::LessThanEquals => "<=",
            PredicateMode::GreaterThan => ">",
            PredicateMode::GreaterThanEquals => ">=",
            PredicateMode::IsNull => "IS NULL",
            PredicateMode::IsNotNull => "IS NOT NULL",
        }
    }

    fn is_list(self) -> bool {
        matches!(self, PredicateMode::In | PredicateMode::NotIn)
    }
}

/// Column a fragment filters on.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FragmentTarget {
    /// Primary parent key on the base row.
    Parent,
    /// Object id on the base row.
    ObjectId,
    /// Type id on the base row.
    Type,
    /// Aspect id on an aspect join.
    Aspect {
        /// Join alias.
        alias: String,
    },
    /// Value column on a property join.
    Field {
        /// Join alias.
        alias: String,
        /// Filtered column.
        field: PhysicalField,
    },
}

impl fmt::Display for FragmentTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FragmentTarget::Parent => f.write_str("parent_node_id"),
            FragmentTarget::ObjectId => f.write_str("uuid"),
            FragmentTarget::Type => f.write_str("type_qname_id"),
            FragmentTarget::Aspect { alias } => write!(f, "{alias}.qname_id"),
            FragmentTarget::Field { alias, field } => write!(f, "{alias}.{field}"),
        }
    }
}

/// Resolved operands of a fragment.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FragmentValues {
    /// Existence tests carry no operand.
    None,
    /// Surrogate keys.
    Keys(Vec<NodeId>),
    /// Canonical object ids.
    Uuids(Vec<String>),
    /// Class ids.
    TypeIds(Vec<QNameId>),
    /// Column-typed literals.
    Literals(Vec<PhysicalLiteral>),
}

impl FragmentValues {
    /// Number of operands.
    pub fn len(&self) -> usize {
        match self {
            FragmentValues::None => 0,
            FragmentValues::Keys(v) => v.len(),
            FragmentValues::Uuids(v) => v.len(),
            FragmentValues::TypeIds(v) => v.len(),
            FragmentValues::Literals(v) => v.len(),
        }
    }

    /// Whether there is no operand.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn rendered(&self) -> Vec<String> {
        match self {
            FragmentValues::None => Vec::new(),
            FragmentValues::Keys(v) => v.iter().map(ToString::to_string).collect(),
            FragmentValues::Uuids(v) => v
                .iter()
                .map(|u| format!("'{}'", u.replace('\'', "''")))
                .collect(),
            FragmentValues::TypeIds(v) => v.iter().map(ToString::to_string).collect(),
            FragmentValues::Literals(v) => v.iter().map(ToString::to_string).collect(),
        }
    }
}

/// One filter term in compile order.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PredicateFragment {
    /// Selector the term applies to; `None` leaves the choice to the caller.
    pub selector: Option<Selector>,
    /// Filtered column.
    pub target: FragmentTarget,
    /// Comparison mode.
    pub mode: PredicateMode,
    /// Operands.
    pub values: FragmentValues,
}

impl fmt::Display for PredicateFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.selector, &self.target) {
            (
                Some(selector),
                FragmentTarget::Parent | FragmentTarget::ObjectId | FragmentTarget::Type,
            ) => write!(f, "{selector}.{}", self.target)?,
            _ => write!(f, "{}", self.target)?,
        }
        write!(f, " {}", self.mode.operator())?;
        let values = self.values.rendered();
        if self.mode.is_list() {
            write!(f, " ({})", values.join(", "))
        } else if let Some(first) = values.first() {
            write!(f, " {first}")
        } else {
            Ok(())
        }
    }
}

/// Appends `command` to the fragment list.
pub fn add_predicate_fragment(fragments: &mut Vec<PredicateFragment>, command: PredicateFragment) {
    fragments.push(command);
}

/// Fragment accumulator shared by every predicate of one query.
#[derive(Clone, Debug, Default)]
pub struct PredicateAssembler {
    /// Fragments in compile order.
    pub fragments: Vec<PredicateFragment>,
}

impl PredicateAssembler {
    /// Creates an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one fragment.
    pub fn add(&mut self, command: PredicateFragment) {
        add_predicate_fragment(&mut self.fragments, command);
    }
}
