use crate::query::ast::Selector;
use crate::query::errors::CompileError;
use crate::query::fragments::{
    add_predicate_fragment, FragmentTarget, FragmentValues, PredicateFragment, PredicateMode,
};
use crate::query::joins::JoinCommand;
use crate::query::resolver::{IdentifierResolver, ResolvedProperty};
use crate::query::value::{canonicalize, PhysicalLiteral};

use super::{Operand, PredicateSupport};

/// Comparison on a property column reached through a join.
///
/// Covers dictionary properties and the two content stream properties, whose
/// column and join kind are forced at resolution time.
#[derive(Clone, Debug, PartialEq)]
pub struct PropertyComparison {
    /// Selector the filter applies to.
    pub selector: Option<Selector>,
    /// Property metadata, column and join kind.
    pub property: ResolvedProperty,
    /// Column-typed operands; sorted and deduplicated for membership modes.
    pub values: Vec<PhysicalLiteral>,
    /// Comparison mode.
    pub mode: PredicateMode,
}

impl PropertyComparison {
    /// Translates the operand into the column representation.
    pub fn prepare(
        resolver: &IdentifierResolver,
        property: ResolvedProperty,
        selector: Option<Selector>,
        operand: Operand<'_>,
        mode: PredicateMode,
    ) -> Result<Self, CompileError> {
        let values = match operand {
            Operand::Values(literals) => {
                let mut values = literals
                    .iter()
                    .map(|literal| resolver.translate_value_for_field(&property, literal))
                    .collect::<Result<Vec<_>, _>>()?;
                if matches!(mode, PredicateMode::In | PredicateMode::NotIn) {
                    canonicalize(&mut values);
                }
                values
            }
            Operand::Pattern(pattern) => {
                if !property.physical_field.is_textual() {
                    return Err(CompileError::unsupported("like", property.display.clone()));
                }
                vec![PhysicalLiteral::String(pattern.to_owned())]
            }
            Operand::Absent => Vec::new(),
        };
        Ok(Self {
            selector,
            property,
            values,
            mode,
        })
    }
}

impl PredicateSupport for PropertyComparison {
    fn mode(&self) -> PredicateMode {
        self.mode
    }

    fn join_command(&self) -> Option<JoinCommand> {
        Some(
            JoinCommand::new(
                self.property.qname.clone(),
                self.property.join_kind,
                self.property.cardinality(),
            )
            .on(self.selector.clone()),
        )
    }

    fn build_predicate_commands(
        &self,
        alias: Option<&str>,
        fragments: &mut Vec<PredicateFragment>,
    ) {
        let alias = match alias {
            Some(alias) => alias.to_owned(),
            None => self
                .join_command()
                .map(|command| command.alias)
                .unwrap_or_default(),
        };
        let values = if self.values.is_empty() {
            FragmentValues::None
        } else {
            FragmentValues::Literals(self.values.clone())
        };
        add_predicate_fragment(
            fragments,
            PredicateFragment {
                selector: self.selector.clone(),
                target: FragmentTarget::Field {
                    alias,
                    field: self.property.physical_field,
                },
                mode: self.mode,
                values,
            },
        );
    }
}
