//! Identifier resolution bridging query names to catalog identifiers.
//!
//! Predicates name objects by reference, classes by prefixed name and
//! properties by qualified name. Builder supports need surrogate keys, class
//! ids and physical columns, so the resolver translates between the two.
//! Lookups are cached; class and property entries are dropped whenever the
//! dictionary epoch moves.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::catalog::{
    model, ClassKind, DataType, Dictionary, FixedTenant, NamespaceResolver, NodeCatalog,
    PropertyDef, QNameCatalog, TenantContext,
};
use crate::query::ast::{Literal, PropertyRef, SpecialProperty};
use crate::query::errors::CompileError;
use crate::query::expansion::{HierarchyExpansion, TypeExpansionPolicy};
use crate::query::joins::{JoinCardinality, JoinKind};
use crate::query::value::{self, PhysicalField, PhysicalLiteral};
use crate::types::{NodeId, ObjectRef, QName, QNameId};

/// Identity of a filtered property, computed once per predicate.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PropertyKind {
    /// Primary parent surrogate key.
    ParentId,
    /// Object id.
    ObjectId,
    /// Object type, matched with sub-types.
    ObjectTypeId,
    /// Base type, matched exactly.
    BaseTypeId,
    /// Content mimetype.
    ContentMimetype,
    /// Content size.
    ContentLength,
    /// Dictionary property.
    Generic(QName),
}

/// Dictionary metadata of a filtered property.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedProperty {
    /// Qualified property name.
    pub qname: QName,
    /// Name as reported in diagnostics.
    pub display: String,
    /// Dictionary data type.
    pub data_type: DataType,
    /// Whether the property holds several values per object.
    pub multi_valued: bool,
    /// Column the predicate filters on.
    pub physical_field: PhysicalField,
    /// Relation the predicate joins.
    pub join_kind: JoinKind,
}

impl ResolvedProperty {
    /// Join cardinality implied by the property cardinality.
    pub fn cardinality(&self) -> JoinCardinality {
        if self.multi_valued {
            JoinCardinality::Multi
        } else {
            JoinCardinality::Single
        }
    }
}

/// Class resolved to the ids of every class it matches.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedClass {
    /// Class the name resolved to.
    pub name: QName,
    /// Type or aspect.
    pub kind: ClassKind,
    /// Ids of the matching classes, `name` first when persisted.
    pub ids: Arc<[QNameId]>,
}

/// Collaborators the resolver reads from.
#[derive(Clone)]
pub struct Collaborators {
    /// Prefix resolution.
    pub namespaces: Arc<dyn NamespaceResolver>,
    /// Class and property definitions.
    pub dictionary: Arc<dyn Dictionary>,
    /// Qualified-name ids.
    pub qnames: Arc<dyn QNameCatalog>,
    /// Object reference to surrogate key mapping.
    pub nodes: Arc<dyn NodeCatalog>,
    /// Active tenant.
    pub tenant: Arc<dyn TenantContext>,
}

impl Collaborators {
    /// Uses one catalog for every collaborator, with no active tenant.
    pub fn from_catalog<C>(catalog: Arc<C>) -> Self
    where
        C: NamespaceResolver + Dictionary + QNameCatalog + NodeCatalog + 'static,
    {
        Self {
            namespaces: catalog.clone(),
            dictionary: catalog.clone(),
            qnames: catalog.clone(),
            nodes: catalog,
            tenant: Arc::new(FixedTenant::default()),
        }
    }

    /// Replaces the tenant context.
    pub fn with_tenant(mut self, tenant: Arc<dyn TenantContext>) -> Self {
        self.tenant = tenant;
        self
    }
}

/// Cache capacities; zero disables a cache.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ResolverOptions {
    /// Expanded class entries.
    pub type_cache_capacity: usize,
    /// Property definitions.
    pub property_cache_capacity: usize,
    /// Object reference to surrogate key entries.
    pub reference_cache_capacity: usize,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            type_cache_capacity: 256,
            property_cache_capacity: 1024,
            reference_cache_capacity: 4096,
        }
    }
}

/// Entries carry the dictionary epoch they were computed under.
type TypeCache = LruCache<(QName, bool), (u64, ResolvedClass)>;
type PropertyCache = LruCache<QName, (u64, PropertyDef)>;

/// Resolves symbolic identifiers for the predicate compiler.
pub struct IdentifierResolver {
    collaborators: Collaborators,
    expansion: Arc<dyn TypeExpansionPolicy>,
    epoch: AtomicU64,
    types: Option<Mutex<TypeCache>>,
    properties: Option<Mutex<PropertyCache>>,
    references: Option<Mutex<LruCache<ObjectRef, NodeId>>>,
}

impl IdentifierResolver {
    /// Creates a resolver using the hierarchy expansion policy.
    pub fn new(collaborators: Collaborators, opts: ResolverOptions) -> Self {
        let epoch = collaborators.dictionary.epoch();
        Self {
            collaborators,
            expansion: Arc::new(HierarchyExpansion),
            epoch: AtomicU64::new(epoch),
            types: NonZeroUsize::new(opts.type_cache_capacity)
                .map(|cap| Mutex::new(LruCache::new(cap))),
            properties: NonZeroUsize::new(opts.property_cache_capacity)
                .map(|cap| Mutex::new(LruCache::new(cap))),
            references: NonZeroUsize::new(opts.reference_cache_capacity)
                .map(|cap| Mutex::new(LruCache::new(cap))),
        }
    }

    /// Replaces the type expansion policy.
    pub fn with_expansion(mut self, policy: Arc<dyn TypeExpansionPolicy>) -> Self {
        self.expansion = policy;
        self
    }

    /// Active type expansion policy.
    pub fn expansion(&self) -> &dyn TypeExpansionPolicy {
        self.expansion.as_ref()
    }

    /// Collaborators the resolver reads from.
    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    /// Parses a `prefix:local` or `{uri}local` name; `None` when it does not parse.
    pub fn parse_qname(&self, text: &str) -> Option<QName> {
        QName::parse_with(text, |prefix| self.collaborators.namespaces.namespace_uri(prefix))
            .ok()
            .flatten()
    }

    /// Renders `name` with its first registered prefix, falling back to `{uri}local`.
    pub fn display_name(&self, name: &QName) -> String {
        match self.collaborators.namespaces.prefixes(name.namespace()).first() {
            Some(prefix) => name.to_prefixed(prefix),
            None => name.to_string(),
        }
    }

    /// Classifies a property reference.
    pub fn classify(&self, property: &PropertyRef) -> Result<PropertyKind, CompileError> {
        let kind = match property {
            PropertyRef::Special(SpecialProperty::ParentId) => PropertyKind::ParentId,
            PropertyRef::Special(SpecialProperty::ObjectId) => PropertyKind::ObjectId,
            PropertyRef::Special(SpecialProperty::ObjectTypeId) => PropertyKind::ObjectTypeId,
            PropertyRef::Special(SpecialProperty::BaseTypeId) => PropertyKind::BaseTypeId,
            PropertyRef::Special(SpecialProperty::ContentMimetype) => {
                PropertyKind::ContentMimetype
            }
            PropertyRef::Special(SpecialProperty::ContentLength) => PropertyKind::ContentLength,
            PropertyRef::Named(name) => match self.parse_qname(name) {
                Some(qname) => PropertyKind::Generic(qname),
                None => return Err(CompileError::unknown_property(name.as_str())),
            },
        };
        Ok(kind)
    }

    /// Maps an object reference to its surrogate key.
    pub fn resolve_object_ref(&self, reference: &str) -> Result<NodeId, CompileError> {
        let parsed = self.qualify(reference)?;
        if let Some(id) = self.cached_reference(&parsed) {
            return Ok(id);
        }
        match self.collaborators.nodes.node_id(&parsed)? {
            Some(id) => {
                self.remember_reference(parsed, id);
                Ok(id)
            }
            None => Err(CompileError::unresolvable(reference)),
        }
    }

    /// Batch form of [`Self::resolve_object_ref`]; preserves input order.
    pub fn resolve_object_refs<S: AsRef<str>>(
        &self,
        references: &[S],
    ) -> Result<Vec<NodeId>, CompileError> {
        let parsed = references
            .iter()
            .map(|r| self.qualify(r.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        let mut resolved: Vec<Option<NodeId>> =
            parsed.iter().map(|r| self.cached_reference(r)).collect();
        let missing: Vec<usize> = resolved
            .iter()
            .enumerate()
            .filter_map(|(idx, id)| id.is_none().then_some(idx))
            .collect();
        if !missing.is_empty() {
            let batch: Vec<ObjectRef> = missing.iter().map(|&idx| parsed[idx].clone()).collect();
            trace!(count = batch.len(), "resolver.references.miss");
            let found = self.collaborators.nodes.node_ids(&batch)?;
            for (&idx, id) in missing.iter().zip(found) {
                if let Some(id) = id {
                    self.remember_reference(parsed[idx].clone(), id);
                }
                resolved[idx] = id;
            }
        }
        resolved
            .into_iter()
            .zip(references)
            .map(|(id, reference)| id.ok_or_else(|| CompileError::unresolvable(reference.as_ref())))
            .collect()
    }

    /// Canonicalises object-id literals.
    ///
    /// Accepts bare ids and full object references; a `;version` suffix is dropped.
    pub fn resolve_uuids(&self, values: &[Literal]) -> Result<Vec<String>, CompileError> {
        values
            .iter()
            .map(|literal| {
                let Literal::String(text) = literal else {
                    return Err(CompileError::unresolvable(literal.to_string()));
                };
                let uuid = if text.contains("://") {
                    text.parse::<ObjectRef>()
                        .map(|r| r.id().to_owned())
                        .map_err(|_| CompileError::unresolvable(text.as_str()))?
                } else {
                    text.split(';').next().unwrap_or_default().trim().to_owned()
                };
                if uuid.is_empty() || uuid.contains('/') {
                    return Err(CompileError::unresolvable(text.as_str()));
                }
                Ok(uuid)
            })
            .collect()
    }

    /// Resolves a type id or prefixed class name to the classes it matches.
    ///
    /// `cmis:document`, `cmis:folder` and `cmis:item` alias the content model
    /// classes; anything else must be a declared class.
    pub fn resolve_type_ids(
        &self,
        type_name: &str,
        include_subtypes: bool,
    ) -> Result<ResolvedClass, CompileError> {
        let epoch = self.sync_epoch();
        let unknown = || CompileError::UnknownType {
            type_name: type_name.to_owned(),
        };
        let qname = model::cmis_type_alias(type_name)
            .or_else(|| self.parse_qname(type_name))
            .ok_or_else(unknown)?;
        let key = (qname, include_subtypes);
        if let Some(cache) = &self.types {
            if let Some((seen, hit)) = cache.lock().get(&key) {
                if *seen == epoch {
                    trace!(class = %key.0, "resolver.types.hit");
                    return Ok(hit.clone());
                }
            }
        }
        let dictionary = self.collaborators.dictionary.as_ref();
        let class = dictionary.class(&key.0)?.ok_or_else(unknown)?;
        let names = self.expansion.expand(dictionary, &class, include_subtypes)?;
        let ids: Vec<QNameId> = self
            .collaborators
            .qnames
            .qname_ids(&names)?
            .into_iter()
            .flatten()
            .collect();
        debug!(
            class = %key.0,
            include_subtypes,
            policy = self.expansion.name(),
            matched = names.len(),
            persisted = ids.len(),
            "resolver.types.expand"
        );
        let resolved = ResolvedClass {
            name: class.name,
            kind: class.kind,
            ids: ids.into(),
        };
        if let Some(cache) = &self.types {
            cache.lock().put(key, (epoch, resolved.clone()));
        }
        Ok(resolved)
    }

    /// Resolves a dictionary property and the column backing it.
    pub fn resolve_property(
        &self,
        qname: &QName,
        support_boolean_float_double: bool,
    ) -> Result<ResolvedProperty, CompileError> {
        let def = self.property_def(qname)?;
        let display = self.display_name(qname);
        let physical_field =
            PhysicalField::for_data_type(&display, def.data_type, support_boolean_float_double)?;
        Ok(ResolvedProperty {
            qname: def.name,
            display,
            data_type: def.data_type,
            multi_valued: def.multi_valued,
            physical_field,
            join_kind: JoinKind::Property,
        })
    }

    /// Resolves one of the content stream properties.
    ///
    /// Both hang off the content property, with the column and join forced.
    pub fn resolve_content_property(
        &self,
        special: SpecialProperty,
    ) -> Result<ResolvedProperty, CompileError> {
        let (physical_field, join_kind, data_type) = match special {
            SpecialProperty::ContentMimetype => {
                (PhysicalField::MimetypeStr, JoinKind::ContentMimetype, DataType::Text)
            }
            SpecialProperty::ContentLength => {
                (PhysicalField::ContentSize, JoinKind::ContentUrl, DataType::Long)
            }
            other => return Err(CompileError::unknown_property(other.name())),
        };
        let def = self.property_def(&model::prop_content())?;
        Ok(ResolvedProperty {
            qname: def.name,
            display: special.name().to_owned(),
            data_type,
            multi_valued: false,
            physical_field,
            join_kind,
        })
    }

    /// Coerces a literal into the representation of the property's column.
    pub fn translate_value_for_field(
        &self,
        property: &ResolvedProperty,
        literal: &Literal,
    ) -> Result<PhysicalLiteral, CompileError> {
        value::translate_value(
            &property.display,
            property.data_type,
            property.physical_field,
            literal,
        )
    }

    fn property_def(&self, qname: &QName) -> Result<PropertyDef, CompileError> {
        let epoch = self.sync_epoch();
        if let Some(cache) = &self.properties {
            if let Some((seen, hit)) = cache.lock().get(qname) {
                if *seen == epoch {
                    return Ok(hit.clone());
                }
            }
        }
        let def = self
            .collaborators
            .dictionary
            .property(qname)?
            .ok_or_else(|| CompileError::unknown_property(self.display_name(qname)))?;
        if let Some(cache) = &self.properties {
            cache.lock().put(qname.clone(), (epoch, def.clone()));
        }
        Ok(def)
    }

    fn qualify(&self, reference: &str) -> Result<ObjectRef, CompileError> {
        let parsed: ObjectRef = reference
            .parse()
            .map_err(|_| CompileError::unresolvable(reference))?;
        Ok(match self.collaborators.tenant.current_domain() {
            Some(domain) => parsed.with_tenant(&domain),
            None => parsed,
        })
    }

    fn cached_reference(&self, reference: &ObjectRef) -> Option<NodeId> {
        self.references
            .as_ref()
            .and_then(|cache| cache.lock().get(reference).copied())
    }

    fn remember_reference(&self, reference: ObjectRef, id: NodeId) {
        if let Some(cache) = &self.references {
            cache.lock().put(reference, id);
        }
    }

    /// Drops dictionary-derived entries when the dictionary has changed and
    /// returns the current epoch.
    fn sync_epoch(&self) -> u64 {
        let current = self.collaborators.dictionary.epoch();
        let seen = self.epoch.swap(current, Ordering::AcqRel);
        if seen == current {
            return current;
        }
        debug!(from = seen, to = current, "resolver.epoch.changed");
        if let Some(cache) = &self.types {
            cache.lock().clear();
        }
        if let Some(cache) = &self.properties {
            cache.lock().clear();
        }
        current
    }
}
