use crate::query::ast::{Selector, SpecialProperty};
use crate::query::errors::CompileError;
use crate::query::fragments::{
    add_predicate_fragment, FragmentTarget, FragmentValues, PredicateFragment, PredicateMode,
};
use crate::query::joins::JoinCommand;
use crate::query::resolver::IdentifierResolver;
use crate::types::NodeId;

use super::{string_values, Operand, PredicateSupport};

/// Primary-parent membership; filters the base row, no join.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParentMembership {
    /// Selector the filter applies to.
    pub selector: Option<Selector>,
    /// Parent surrogate keys, in argument order.
    pub keys: Vec<NodeId>,
    /// Comparison mode.
    pub mode: PredicateMode,
}

impl ParentMembership {
    /// Lowers a child-of test against one parent reference.
    pub fn child_of(
        resolver: &IdentifierResolver,
        parent: &str,
        selector: Selector,
    ) -> Result<Self, CompileError> {
        let key = resolver.resolve_object_ref(parent)?;
        Ok(Self {
            selector: Some(selector),
            keys: vec![key],
            mode: PredicateMode::Equals,
        })
    }

    /// Lowers a filter on the parent-id property.
    pub fn prepare(
        resolver: &IdentifierResolver,
        selector: Option<Selector>,
        operand: Operand<'_>,
        mode: PredicateMode,
    ) -> Result<Self, CompileError> {
        let keys = match operand {
            Operand::Values(values) => {
                let refs = string_values(values, |l| CompileError::unresolvable(l.to_string()))?;
                resolver.resolve_object_refs(&refs)?
            }
            Operand::Absent => Vec::new(),
            Operand::Pattern(_) => {
                return Err(CompileError::unsupported(
                    "like",
                    SpecialProperty::ParentId.name(),
                ))
            }
        };
        Ok(Self {
            selector,
            keys,
            mode,
        })
    }
}

impl PredicateSupport for ParentMembership {
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
        let values = if self.keys.is_empty() {
            FragmentValues::None
        } else {
            FragmentValues::Keys(self.keys.clone())
        };
        add_predicate_fragment(
            fragments,
            PredicateFragment {
                selector: self.selector.clone(),
                target: FragmentTarget::Parent,
                mode: self.mode,
                values,
            },
        );
    }
}
