#![forbid(unsafe_code)]

//! Collaborator interfaces consumed by the identifier resolver.
//!
//! The query layer never reaches for ambient services: every lookup goes
//! through one of the traits below, handed to the resolver at construction.
//! [`memory::InMemoryCatalog`] implements all of them for tests and tooling.

pub mod dictionary;
pub mod memory;
pub mod model;

pub use dictionary::{ClassDef, ClassKind, DataType, PropertyDef};
pub use memory::{CatalogFixture, InMemoryCatalog};

use crate::types::{NodeId, ObjectRef, QName, QNameId, Result};

/// Prefix to namespace-uri mapping.
pub trait NamespaceResolver: Send + Sync {
    /// Resolves a prefix to its namespace uri.
    fn namespace_uri(&self, prefix: &str) -> Option<String>;
    /// Returns the prefixes registered for a namespace uri.
    fn prefixes(&self, uri: &str) -> Vec<String>;
}

/// Property and class metadata.
pub trait Dictionary: Send + Sync {
    /// Looks up a property definition.
    fn property(&self, name: &QName) -> Result<Option<PropertyDef>>;
    /// Looks up a type or aspect definition.
    fn class(&self, name: &QName) -> Result<Option<ClassDef>>;
    /// Returns the direct sub-classes of `name`.
    fn direct_sub_classes(&self, name: &QName) -> Result<Vec<QName>>;
    /// Monotonic version, bumped on every model change.
    fn epoch(&self) -> u64;
}

/// Qualified name to numeric id mapping.
pub trait QNameCatalog: Send + Sync {
    /// Looks up the id of a persisted qualified name.
    fn qname_id(&self, name: &QName) -> Result<Option<QNameId>>;

    /// Batch form of [`QNameCatalog::qname_id`]; output order matches input order.
    fn qname_ids(&self, names: &[QName]) -> Result<Vec<Option<QNameId>>> {
        names.iter().map(|name| self.qname_id(name)).collect()
    }

    /// Reverse lookup.
    fn qname(&self, id: QNameId) -> Result<Option<QName>>;
}

/// Object reference to surrogate key mapping.
pub trait NodeCatalog: Send + Sync {
    /// Resolves a (tenant-qualified) object reference.
    fn node_id(&self, reference: &ObjectRef) -> Result<Option<NodeId>>;

    /// Batch form of [`NodeCatalog::node_id`]; output order matches input order.
    fn node_ids(&self, references: &[ObjectRef]) -> Result<Vec<Option<NodeId>>> {
        references.iter().map(|r| self.node_id(r)).collect()
    }
}

/// Supplies the active tenant domain.
pub trait TenantContext: Send + Sync {
    /// Domain of the current tenant, `None` for the default tenant.
    fn current_domain(&self) -> Option<String>;
}

/// Tenant context pinned to one domain (or to the default tenant).
#[derive(Clone, Debug, Default)]
pub struct FixedTenant(pub Option<String>);

impl TenantContext for FixedTenant {
    fn current_domain(&self) -> Option<String> {
        self.0.clone()
    }
}
