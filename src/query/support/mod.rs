//! Builder supports: the lowered form of one predicate.
//!
//! Each strategy owns how one category of property is joined and filtered.
//! A support is configured once by the predicate compiler, then consumed by
//! [`PredicateSupport::build_joins`] followed by
//! [`PredicateSupport::build_predicate_commands`].

mod object_id;
mod parent;
mod property;
mod type_id;

pub use object_id::ObjectIdentityMembership;
pub use parent::ParentMembership;
pub use property::PropertyComparison;
pub use type_id::TypeIdentityMembership;

use crate::query::ast::Literal;
use crate::query::fragments::{PredicateFragment, PredicateMode};
use crate::query::joins::{add_join, JoinCommand, SingleJoins};

/// Right-hand side of a filter as supplied by the predicate.
#[derive(Clone, Copy, Debug)]
pub enum Operand<'a> {
    /// Membership list or the single literal of a comparison.
    Values(&'a [Literal]),
    /// Pattern of a pattern match.
    Pattern(&'a str),
    /// Existence tests carry no operand.
    Absent,
}

/// Join and fragment emission shared by every strategy.
pub trait PredicateSupport {
    /// Comparison mode of the emitted fragment.
    fn mode(&self) -> PredicateMode;

    /// Join the predicate filters through, if any.
    fn join_command(&self) -> Option<JoinCommand>;

    /// Adds this predicate's join and returns the alias to filter through.
    fn build_joins(
        &self,
        single_joins: &mut SingleJoins,
        multi_joins: &mut Vec<JoinCommand>,
    ) -> Option<String> {
        self.join_command()
            .map(|command| add_join(single_joins, multi_joins, command))
    }

    /// Appends this predicate's fragment.
    ///
    /// `alias` is the value returned by [`Self::build_joins`].
    fn build_predicate_commands(&self, alias: Option<&str>, fragments: &mut Vec<PredicateFragment>);
}

/// Configured strategy for one predicate.
#[derive(Clone, Debug, PartialEq)]
pub enum BuilderSupport {
    /// Filters on the primary parent key.
    ParentMembership(ParentMembership),
    /// Filters on the object id.
    ObjectIdentityMembership(ObjectIdentityMembership),
    /// Filters on expanded type or aspect ids.
    TypeIdentityMembership(TypeIdentityMembership),
    /// Filters a property column through a join.
    PropertyComparison(PropertyComparison),
}

impl BuilderSupport {
    /// Strategy name used in plans and logs.
    pub fn strategy(&self) -> &'static str {
        match self {
            BuilderSupport::ParentMembership(_) => "parent_membership",
            BuilderSupport::ObjectIdentityMembership(_) => "object_identity_membership",
            BuilderSupport::TypeIdentityMembership(_) => "type_identity_membership",
            BuilderSupport::PropertyComparison(_) => "property_comparison",
        }
    }

    fn inner(&self) -> &dyn PredicateSupport {
        match self {
            BuilderSupport::ParentMembership(s) => s,
            BuilderSupport::ObjectIdentityMembership(s) => s,
            BuilderSupport::TypeIdentityMembership(s) => s,
            BuilderSupport::PropertyComparison(s) => s,
        }
    }
}

impl PredicateSupport for BuilderSupport {
    fn mode(&self) -> PredicateMode {
        self.inner().mode()
    }

    fn join_command(&self) -> Option<JoinCommand> {
        self.inner().join_command()
    }

    fn build_predicate_commands(
        &self,
        alias: Option<&str>,
        fragments: &mut Vec<PredicateFragment>,
    ) {
        self.inner().build_predicate_commands(alias, fragments)
    }
}

/// Collects the string literals of a list, reporting the first non-string.
pub(crate) fn string_values<'a, E>(
    values: &'a [Literal],
    err: impl Fn(&Literal) -> E,
) -> Result<Vec<&'a str>, E> {
    values
        .iter()
        .map(|literal| match literal {
            Literal::String(text) => Ok(text.as_str()),
            other => Err(err(other)),
        })
        .collect()
}
