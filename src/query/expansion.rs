//! Type expansion policies.
//!
//! Decides which classes a type or aspect name stands for in a type-identity
//! test. The policy is pluggable so deployments can validate it against their
//! own dictionaries.

use std::collections::VecDeque;
use std::sync::Arc;

use rustc_hash::FxHashSet;

use crate::catalog::{ClassDef, Dictionary};
use crate::types::{QName, Result};

/// Expands a class into the closed set of class names it matches.
pub trait TypeExpansionPolicy: Send + Sync {
    /// Returns the matching class names, `class` first.
    fn expand(
        &self,
        dictionary: &dyn Dictionary,
        class: &ClassDef,
        include_subtypes: bool,
    ) -> Result<Vec<QName>>;

    /// Policy name as used in configuration.
    fn name(&self) -> &'static str;
}

/// Walks the class hierarchy: the transitive sub-class closure when sub-types
/// are requested, the exact class otherwise.
#[derive(Clone, Copy, Debug, Default)]
pub struct HierarchyExpansion;

impl TypeExpansionPolicy for HierarchyExpansion {
    fn expand(
        &self,
        dictionary: &dyn Dictionary,
        class: &ClassDef,
        include_subtypes: bool,
    ) -> Result<Vec<QName>> {
        let mut out = vec![class.name.clone()];
        if !include_subtypes {
            return Ok(out);
        }
        let mut seen: FxHashSet<QName> = FxHashSet::default();
        seen.insert(class.name.clone());
        let mut queue = VecDeque::from([class.name.clone()]);
        while let Some(current) = queue.pop_front() {
            for child in dictionary.direct_sub_classes(&current)? {
                if seen.insert(child.clone()) {
                    out.push(child.clone());
                    queue.push_back(child);
                }
            }
        }
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "hierarchy"
    }
}

/// Always matches the named class only, whatever the caller requested.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExactExpansion;

impl TypeExpansionPolicy for ExactExpansion {
    fn expand(
        &self,
        _dictionary: &dyn Dictionary,
        class: &ClassDef,
        _include_subtypes: bool,
    ) -> Result<Vec<QName>> {
        Ok(vec![class.name.clone()])
    }

    fn name(&self) -> &'static str {
        "exact"
    }
}

/// Looks up a built-in policy by its configuration name.
pub fn policy_by_name(name: &str) -> Option<Arc<dyn TypeExpansionPolicy>> {
    match name {
        "hierarchy" => Some(Arc::new(HierarchyExpansion)),
        "exact" => Some(Arc::new(ExactExpansion)),
        _ => None,
    }
}
