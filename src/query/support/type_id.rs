use rustc_hash::FxHashSet;

use crate::catalog::ClassKind;
use crate::query::ast::{Literal, Selector};
use crate::query::errors::CompileError;
use crate::query::fragments::{
    add_predicate_fragment, FragmentTarget, FragmentValues, PredicateFragment, PredicateMode,
};
use crate::query::joins::{JoinCommand, JoinKind};
use crate::query::resolver::IdentifierResolver;
use crate::types::{QName, QNameId};

use super::{string_values, PredicateSupport};

/// Type-identity membership over expanded class ids.
///
/// Types filter the base row directly; aspects need an aspect join, which is
/// always per-predicate because a node carries many aspects.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeIdentityMembership {
    /// Selector the filter applies to.
    pub selector: Option<Selector>,
    /// Classes named by the predicate, in argument order.
    pub classes: Vec<QName>,
    /// Whether the classes are types or aspects.
    pub kind: ClassKind,
    /// Union of the expanded class ids, first occurrence order.
    pub ids: Vec<QNameId>,
    /// `In` or `NotIn`.
    pub mode: PredicateMode,
}

impl TypeIdentityMembership {
    /// Expands every named class and accumulates the matching ids.
    ///
    /// Equality modes widen to membership since one name may expand to many ids.
    pub fn prepare(
        resolver: &IdentifierResolver,
        selector: Option<Selector>,
        prop: &str,
        values: &[Literal],
        include_subtypes: bool,
        mode: PredicateMode,
    ) -> Result<Self, CompileError> {
        let names = string_values(values, |l| CompileError::UnknownType {
            type_name: l.to_string(),
        })?;
        let mut classes = Vec::with_capacity(names.len());
        let mut kind = None;
        let mut seen: FxHashSet<QNameId> = FxHashSet::default();
        let mut ids = Vec::new();
        for name in names {
            let resolved = resolver.resolve_type_ids(name, include_subtypes)?;
            match kind {
                Some(existing) if existing != resolved.kind => {
                    return Err(CompileError::MixedClassKinds {
                        prop: prop.to_owned(),
                    })
                }
                _ => kind = Some(resolved.kind),
            }
            ids.extend(resolved.ids.iter().copied().filter(|id| seen.insert(*id)));
            classes.push(resolved.name);
        }
        let mode = match mode {
            PredicateMode::Equals => PredicateMode::In,
            PredicateMode::NotEquals => PredicateMode::NotIn,
            other => other,
        };
        Ok(Self {
            selector,
            classes,
            kind: kind.unwrap_or(ClassKind::Type),
            ids,
            mode,
        })
    }
}

impl PredicateSupport for TypeIdentityMembership {
    fn mode(&self) -> PredicateMode {
        self.mode
    }

    fn join_command(&self) -> Option<JoinCommand> {
        match (self.kind, self.classes.first()) {
            (ClassKind::Aspect, Some(first)) => Some(
                JoinCommand::multi(first.clone(), JoinKind::Aspect).on(self.selector.clone()),
            ),
            _ => None,
        }
    }

    fn build_predicate_commands(
        &self,
        alias: Option<&str>,
        fragments: &mut Vec<PredicateFragment>,
    ) {
        let target = match (self.kind, alias) {
            (ClassKind::Aspect, Some(alias)) => FragmentTarget::Aspect {
                alias: alias.to_owned(),
            },
            _ => FragmentTarget::Type,
        };
        add_predicate_fragment(
            fragments,
            PredicateFragment {
                selector: self.selector.clone(),
                target,
                mode: self.mode,
                values: FragmentValues::TypeIds(self.ids.clone()),
            },
        );
    }
}
