//! In-memory implementation of every catalog collaborator.
//!
//! Used by tests, the CLI and benchmarks. Definitions can be registered through
//! the consuming `with_*` builders, through the `define_*` methods at runtime
//! (which bump the dictionary epoch), or loaded from a TOML fixture.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde::Deserialize;
use tracing::debug;

use super::dictionary::{ClassDef, ClassKind, DataType, PropertyDef};
use super::model::{
    self, CMIS_URI, CONTENT_MODEL_URI, DICTIONARY_MODEL_URI, SYSTEM_MODEL_URI,
};
use super::{Dictionary, NamespaceResolver, NodeCatalog, QNameCatalog};
use crate::types::{NodeId, ObjectRef, QName, QNameId, QuarryError, Result};

#[derive(Default)]
struct State {
    namespaces: FxHashMap<String, String>,
    classes: FxHashMap<QName, ClassDef>,
    children: FxHashMap<QName, Vec<QName>>,
    properties: FxHashMap<QName, PropertyDef>,
    qname_ids: FxHashMap<QName, QNameId>,
    qnames_by_id: FxHashMap<QNameId, QName>,
    nodes: FxHashMap<ObjectRef, NodeId>,
    next_qname_id: u64,
}

impl State {
    fn persist_qname(&mut self, name: &QName) -> QNameId {
        if let Some(id) = self.qname_ids.get(name) {
            return *id;
        }
        self.next_qname_id += 1;
        let id = QNameId(self.next_qname_id);
        self.qname_ids.insert(name.clone(), id);
        self.qnames_by_id.insert(id, name.clone());
        id
    }

    fn insert_class(&mut self, def: ClassDef) {
        self.persist_qname(&def.name);
        if let Some(previous) = self.classes.get(&def.name).and_then(|c| c.parent.clone()) {
            if let Some(siblings) = self.children.get_mut(&previous) {
                siblings.retain(|child| child != &def.name);
            }
        }
        if let Some(parent) = &def.parent {
            let siblings = self.children.entry(parent.clone()).or_default();
            if !siblings.contains(&def.name) {
                siblings.push(def.name.clone());
            }
        }
        self.classes.insert(def.name.clone(), def);
    }

    fn insert_property(&mut self, def: PropertyDef) {
        self.persist_qname(&def.name);
        self.properties.insert(def.name.clone(), def);
    }

    fn resolve_prefixed(&self, text: &str) -> Result<QName> {
        QName::parse_with(text, |prefix| self.namespaces.get(prefix).cloned())?
            .ok_or_else(|| {
                QuarryError::InvalidOwned(format!("unknown namespace prefix in '{text}'"))
            })
    }
}

/// Catalog held entirely in memory.
pub struct InMemoryCatalog {
    state: RwLock<State>,
    epoch: AtomicU64,
}

impl Default for InMemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State::default()),
            epoch: AtomicU64::new(1),
        }
    }

    /// Creates a catalog seeded with the base content model.
    pub fn with_base_model() -> Self {
        let cm = |local: &str| QName::new(CONTENT_MODEL_URI, local);
        Self::new()
            .with_namespace("cm", CONTENT_MODEL_URI)
            .with_namespace("sys", SYSTEM_MODEL_URI)
            .with_namespace("d", DICTIONARY_MODEL_URI)
            .with_namespace("cmis", CMIS_URI)
            .with_class(model::type_base(), ClassKind::Type, None)
            .with_class(model::type_cmobject(), ClassKind::Type, Some(model::type_base()))
            .with_class(model::type_content(), ClassKind::Type, Some(model::type_cmobject()))
            .with_class(model::type_folder(), ClassKind::Type, Some(model::type_cmobject()))
            .with_class(cm("titled"), ClassKind::Aspect, None)
            .with_class(cm("auditable"), ClassKind::Aspect, None)
            .with_property(model::prop_node_uuid(), DataType::Text, false, model::type_base())
            .with_property(cm("name"), DataType::Text, false, model::type_cmobject())
            .with_property(model::prop_content(), DataType::Content, false, model::type_content())
            .with_property(cm("title"), DataType::MlText, false, cm("titled"))
            .with_property(cm("description"), DataType::MlText, false, cm("titled"))
            .with_property(cm("created"), DataType::DateTime, false, cm("auditable"))
            .with_property(cm("creator"), DataType::Text, false, cm("auditable"))
    }

    /// Registers a namespace prefix.
    pub fn with_namespace(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        self.state
            .get_mut()
            .namespaces
            .insert(prefix.into(), uri.into());
        self
    }

    /// Registers a type or aspect.
    pub fn with_class(mut self, name: QName, kind: ClassKind, parent: Option<QName>) -> Self {
        self.state.get_mut().insert_class(ClassDef {
            name,
            kind,
            parent,
            mandatory_aspects: Vec::new(),
        });
        self
    }

    /// Registers a property declared by `container`.
    pub fn with_property(
        mut self,
        name: QName,
        data_type: DataType,
        multi_valued: bool,
        container: QName,
    ) -> Self {
        self.state.get_mut().insert_property(PropertyDef {
            name,
            data_type,
            multi_valued,
            container,
        });
        self
    }

    /// Registers an object reference with its surrogate key.
    pub fn with_node(mut self, reference: ObjectRef, id: NodeId) -> Self {
        self.state.get_mut().nodes.insert(reference, id);
        self
    }

    /// Adds or replaces a class definition and bumps the dictionary epoch.
    pub fn define_class(&self, def: ClassDef) {
        debug!(class = %def.name, "catalog.define_class");
        self.state.write().insert_class(def);
        self.epoch.fetch_add(1, Ordering::AcqRel);
    }

    /// Adds or replaces a property definition and bumps the dictionary epoch.
    pub fn define_property(&self, def: PropertyDef) {
        debug!(property = %def.name, "catalog.define_property");
        self.state.write().insert_property(def);
        self.epoch.fetch_add(1, Ordering::AcqRel);
    }

    /// Registers an object reference at runtime.
    pub fn register_node(&self, reference: ObjectRef, id: NodeId) {
        self.state.write().nodes.insert(reference, id);
    }

    /// Resolves a `prefix:local` or `{uri}local` name against the registered namespaces.
    pub fn resolve_name(&self, text: &str) -> Result<QName> {
        self.state.read().resolve_prefixed(text)
    }

    /// Builds a catalog from a parsed fixture.
    pub fn from_fixture(fixture: &CatalogFixture) -> Result<Self> {
        let catalog = if fixture.base_model {
            Self::with_base_model()
        } else {
            Self::new()
        };
        let mut catalog = fixture
            .namespaces
            .iter()
            .fold(catalog, |acc, (prefix, uri)| acc.with_namespace(prefix, uri));
        let state = catalog.state.get_mut();
        for class in &fixture.classes {
            let def = ClassDef {
                name: state.resolve_prefixed(&class.name)?,
                kind: class.kind,
                parent: class
                    .parent
                    .as_deref()
                    .map(|p| state.resolve_prefixed(p))
                    .transpose()?,
                mandatory_aspects: class
                    .mandatory_aspects
                    .iter()
                    .map(|a| state.resolve_prefixed(a))
                    .collect::<Result<_>>()?,
            };
            state.insert_class(def);
        }
        for prop in &fixture.properties {
            let def = PropertyDef {
                name: state.resolve_prefixed(&prop.name)?,
                data_type: prop.data_type.parse()?,
                multi_valued: prop.multiple,
                container: state.resolve_prefixed(&prop.container)?,
            };
            state.insert_property(def);
        }
        for node in &fixture.nodes {
            let reference: ObjectRef = node.reference.parse()?;
            state.nodes.insert(reference, NodeId(node.id));
        }
        Ok(catalog)
    }

    /// Parses a TOML fixture and builds a catalog from it.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let fixture: CatalogFixture = toml::from_str(text)
            .map_err(|err| QuarryError::InvalidOwned(format!("catalog fixture: {err}")))?;
        Self::from_fixture(&fixture)
    }
}

impl NamespaceResolver for InMemoryCatalog {
    fn namespace_uri(&self, prefix: &str) -> Option<String> {
        self.state.read().namespaces.get(prefix).cloned()
    }

    fn prefixes(&self, uri: &str) -> Vec<String> {
        let state = self.state.read();
        let mut prefixes: Vec<String> = state
            .namespaces
            .iter()
            .filter(|(_, u)| u.as_str() == uri)
            .map(|(p, _)| p.clone())
            .collect();
        prefixes.sort();
        prefixes
    }
}

impl Dictionary for InMemoryCatalog {
    fn property(&self, name: &QName) -> Result<Option<PropertyDef>> {
        Ok(self.state.read().properties.get(name).cloned())
    }

    fn class(&self, name: &QName) -> Result<Option<ClassDef>> {
        Ok(self.state.read().classes.get(name).cloned())
    }

    fn direct_sub_classes(&self, name: &QName) -> Result<Vec<QName>> {
        Ok(self
            .state
            .read()
            .children
            .get(name)
            .cloned()
            .unwrap_or_default())
    }

    fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }
}

impl QNameCatalog for InMemoryCatalog {
    fn qname_id(&self, name: &QName) -> Result<Option<QNameId>> {
        Ok(self.state.read().qname_ids.get(name).copied())
    }

    fn qname_ids(&self, names: &[QName]) -> Result<Vec<Option<QNameId>>> {
        let state = self.state.read();
        Ok(names
            .iter()
            .map(|name| state.qname_ids.get(name).copied())
            .collect())
    }

    fn qname(&self, id: QNameId) -> Result<Option<QName>> {
        Ok(self.state.read().qnames_by_id.get(&id).cloned())
    }
}

impl NodeCatalog for InMemoryCatalog {
    fn node_id(&self, reference: &ObjectRef) -> Result<Option<NodeId>> {
        Ok(self.state.read().nodes.get(reference).copied())
    }

    fn node_ids(&self, references: &[ObjectRef]) -> Result<Vec<Option<NodeId>>> {
        let state = self.state.read();
        Ok(references
            .iter()
            .map(|r| state.nodes.get(r).copied())
            .collect())
    }
}

/// TOML description of a catalog.
#[derive(Debug, Default, Deserialize)]
pub struct CatalogFixture {
    /// Seed the base content model before applying the fixture.
    #[serde(default = "default_true")]
    pub base_model: bool,
    /// Extra namespace prefixes.
    #[serde(default)]
    pub namespaces: BTreeMap<String, String>,
    /// Types and aspects, registered in order.
    #[serde(default)]
    pub classes: Vec<ClassFixture>,
    /// Property definitions.
    #[serde(default)]
    pub properties: Vec<PropertyFixture>,
    /// Known object references.
    #[serde(default)]
    pub nodes: Vec<NodeFixture>,
}

/// Fixture entry for a type or aspect.
#[derive(Debug, Deserialize)]
pub struct ClassFixture {
    /// Prefixed class name.
    pub name: String,
    /// Type or aspect.
    #[serde(default = "default_kind")]
    pub kind: ClassKind,
    /// Prefixed parent class name.
    #[serde(default)]
    pub parent: Option<String>,
    /// Prefixed mandatory aspect names.
    #[serde(default)]
    pub mandatory_aspects: Vec<String>,
}

/// Fixture entry for a property.
#[derive(Debug, Deserialize)]
pub struct PropertyFixture {
    /// Prefixed property name.
    pub name: String,
    /// Prefixed declaring class.
    pub container: String,
    /// Data type, e.g. `d:text`.
    #[serde(rename = "type")]
    pub data_type: String,
    /// Multi-valued flag.
    #[serde(default)]
    pub multiple: bool,
}

/// Fixture entry for an object reference.
#[derive(Debug, Deserialize)]
pub struct NodeFixture {
    /// Object reference, `protocol://store/id`.
    #[serde(rename = "ref")]
    pub reference: String,
    /// Surrogate key.
    pub id: u64,
}

fn default_true() -> bool {
    true
}

fn default_kind() -> ClassKind {
    ClassKind::Type
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"
        [namespaces]
        test = "http://example.org/test"

        [[classes]]
        name = "test:report"
        parent = "cm:content"

        [[classes]]
        name = "test:reviewed"
        kind = "aspect"

        [[properties]]
        name = "test:score"
        container = "test:report"
        type = "d:double"

        [[properties]]
        name = "test:tags"
        container = "test:report"
        type = "d:text"
        multiple = true

        [[nodes]]
        ref = "workspace://SpacesStore/root"
        id = 7
    "#;

    #[test]
    fn loads_fixture_on_top_of_base_model() {
        let catalog = InMemoryCatalog::from_toml_str(FIXTURE).expect("fixture loads");
        let report = catalog.resolve_name("test:report").expect("name");
        let class = catalog.class(&report).expect("lookup").expect("class");
        assert_eq!(class.parent, Some(model::type_content()));
        assert_eq!(
            catalog.direct_sub_classes(&model::type_content()).expect("subs"),
            vec![report.clone()]
        );
        let tags = catalog.resolve_name("test:tags").expect("name");
        let prop = catalog.property(&tags).expect("lookup").expect("prop");
        assert!(prop.multi_valued);
        assert!(catalog.qname_id(&tags).expect("lookup").is_some());
        let root: ObjectRef = "workspace://SpacesStore/root".parse().expect("ref");
        assert_eq!(catalog.node_id(&root).expect("lookup"), Some(NodeId(7)));
    }

    #[test]
    fn unknown_prefix_in_fixture_fails() {
        let err = InMemoryCatalog::from_toml_str(
            r#"
            [[classes]]
            name = "nope:thing"
            "#,
        );
        assert!(matches!(err, Err(QuarryError::InvalidOwned(_))));
    }

    #[test]
    fn runtime_definitions_bump_epoch_and_reparent() {
        let catalog = InMemoryCatalog::with_base_model();
        let before = catalog.epoch();
        let special = QName::new(CONTENT_MODEL_URI, "special");
        catalog.define_class(ClassDef {
            name: special.clone(),
            kind: ClassKind::Type,
            parent: Some(model::type_folder()),
            mandatory_aspects: Vec::new(),
        });
        assert!(catalog.epoch() > before);
        catalog.define_class(ClassDef {
            name: special.clone(),
            kind: ClassKind::Type,
            parent: Some(model::type_content()),
            mandatory_aspects: Vec::new(),
        });
        assert!(!catalog
            .direct_sub_classes(&model::type_folder())
            .expect("subs")
            .contains(&special));
        assert!(catalog
            .direct_sub_classes(&model::type_content())
            .expect("subs")
            .contains(&special));
    }

    #[test]
    fn qname_ids_are_stable_and_reversible() {
        let catalog = InMemoryCatalog::with_base_model();
        let id = catalog
            .qname_id(&model::type_folder())
            .expect("lookup")
            .expect("persisted");
        assert_eq!(catalog.qname(id).expect("lookup"), Some(model::type_folder()));
        let unknown = QName::new(CONTENT_MODEL_URI, "missing");
        assert_eq!(
            catalog
                .qname_ids(&[model::type_folder(), unknown])
                .expect("batch"),
            vec![Some(id), None]
        );
    }
}
