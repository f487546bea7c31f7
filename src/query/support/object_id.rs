use crate::query::ast::{Literal, Selector, SpecialProperty};
use crate::query::errors::CompileError;
use crate::query::fragments::{
    add_predicate_fragment, FragmentTarget, FragmentValues, PredicateFragment, PredicateMode,
};
use crate::query::joins::JoinCommand;
use crate::query::resolver::IdentifierResolver;

use super::{Operand, PredicateSupport};

/// Object-id membership; filters the base row, no join.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectIdentityMembership {
    /// Selector the filter applies to.
    pub selector: Option<Selector>,
    /// Canonical object ids, or the pattern of a pattern match.
    pub uuids: Vec<String>,
    /// Comparison mode.
    pub mode: PredicateMode,
}

impl ObjectIdentityMembership {
    /// Lowers a filter on the object-id property.
    pub fn prepare(
        resolver: &IdentifierResolver,
        selector: Option<Selector>,
        operand: Operand<'_>,
        mode: PredicateMode,
    ) -> Result<Self, CompileError> {
        let uuids = match operand {
            Operand::Values(values) => resolver.resolve_uuids(values)?,
            Operand::Pattern(pattern) => {
                // Patterns share the canonical id form.
                resolver.resolve_uuids(&[Literal::String(pattern.to_owned())])?
            }
            Operand::Absent => {
                return Err(CompileError::unsupported(
                    "exists",
                    SpecialProperty::ObjectId.name(),
                ))
            }
        };
        Ok(Self {
            selector,
            uuids,
            mode,
        })
    }
}

impl PredicateSupport for ObjectIdentityMembership {
    fn mode(&self) -> PredicateMode {
        self.mode
    }

    fn join_command(&self) -> Option<JoinCommand> {
        None
    }

    fn build_predicate_commands(
        &self,
        _alias: Option<&str>,
        fragments: &mut Vec<PredicateFragment>,
    ) {
        add_predicate_fragment(
            fragments,
            PredicateFragment {
                selector: self.selector.clone(),
                target: FragmentTarget::ObjectId,
                mode: self.mode,
                values: FragmentValues::Uuids(self.uuids.clone()),
            },
        );
    }
}
