#![allow(missing_docs)]

use std::fs;
use std::sync::Arc;
use std::thread;

use proptest::prelude::*;
use quarry::catalog::{
    model, ClassDef, ClassKind, InMemoryCatalog, NodeCatalog, QNameCatalog,
};
use quarry::query::ast::{Literal, PropertyRef};
use quarry::query::value::PhysicalField;
use quarry::query::{Collaborators, CompileError, IdentifierResolver, PropertyKind, ResolverOptions};
use quarry::types::{NodeId, ObjectRef};
use tempfile::TempDir;

const FIXTURE: &str = r#"
[namespaces]
acc = "http://example.org/accounts"

[[classes]]
name = "acc:invoice"
parent = "cm:content"

[[classes]]
name = "acc:credit_note"
parent = "acc:invoice"

[[classes]]
name = "acc:audited"
kind = "aspect"

[[properties]]
name = "acc:amount"
container = "acc:invoice"
type = "d:double"

[[properties]]
name = "acc:labels"
container = "acc:audited"
type = "d:text"
multiple = true

[[nodes]]
ref = "workspace://SpacesStore/ledger"
id = 40

[[nodes]]
ref = "workspace://SpacesStore/journal"
id = 41
"#;

fn load_fixture() -> (TempDir, Arc<InMemoryCatalog>) {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("catalog.toml");
    fs::write(&path, FIXTURE).expect("write fixture");
    let text = fs::read_to_string(&path).expect("read fixture");
    let catalog = InMemoryCatalog::from_toml_str(&text).expect("fixture");
    (dir, Arc::new(catalog))
}

fn resolver(catalog: Arc<InMemoryCatalog>) -> IdentifierResolver {
    IdentifierResolver::new(Collaborators::from_catalog(catalog), ResolverOptions::default())
}

#[test]
fn fixture_file_feeds_the_resolver() {
    let (_dir, catalog) = load_fixture();
    let resolver = resolver(catalog.clone());

    let invoice = resolver.resolve_type_ids("acc:invoice", true).expect("invoice");
    assert_eq!(invoice.kind, ClassKind::Type);
    assert_eq!(invoice.ids.len(), 2);
    let exact = resolver.resolve_type_ids("acc:invoice", false).expect("exact");
    assert_eq!(exact.ids.len(), 1);

    let amount = resolver
        .parse_qname("acc:amount")
        .expect("prefix registered");
    let prop = resolver.resolve_property(&amount, true).expect("amount");
    assert_eq!(prop.physical_field, PhysicalField::DoubleValue);
    let legacy = resolver.resolve_property(&amount, false).expect("amount");
    assert_eq!(legacy.physical_field, PhysicalField::StringValue);

    let keys = resolver
        .resolve_object_refs(&[
            "workspace://SpacesStore/journal",
            "workspace://SpacesStore/ledger",
            "workspace://SpacesStore/journal",
        ])
        .expect("refs");
    assert_eq!(keys, vec![NodeId(41), NodeId(40), NodeId(41)]);
    assert_eq!(
        catalog
            .node_id(&"workspace://SpacesStore/ledger".parse::<ObjectRef>().expect("ref"))
            .expect("lookup"),
        Some(NodeId(40))
    );
}

#[test]
fn classify_distinguishes_special_and_dictionary_properties() {
    let (_dir, catalog) = load_fixture();
    let resolver = resolver(catalog);
    assert_eq!(
        resolver
            .classify(&PropertyRef::from("cmis:baseTypeId"))
            .expect("special"),
        PropertyKind::BaseTypeId
    );
    let labels = resolver
        .classify(&PropertyRef::from("acc:labels"))
        .expect("named");
    assert!(matches!(labels, PropertyKind::Generic(ref q) if q.local_name() == "labels"));
    let err = resolver
        .classify(&PropertyRef::from("nope:thing"))
        .expect_err("unknown prefix");
    assert!(matches!(err, CompileError::UnknownProperty { .. }));
}

#[test]
fn qname_ids_round_trip_through_the_catalog() {
    let (_dir, catalog) = load_fixture();
    for name in ["acc:invoice", "acc:audited", "acc:amount", "cm:content"] {
        let qname = catalog.resolve_name(name).expect("name");
        let id = catalog
            .qname_id(&qname)
            .expect("lookup")
            .expect("persisted");
        assert_eq!(catalog.qname(id).expect("reverse"), Some(qname));
    }
}

#[test]
fn dictionary_changes_reach_cached_expansions() {
    let (_dir, catalog) = load_fixture();
    let resolver = resolver(catalog.clone());
    let before = resolver.resolve_type_ids("acc:invoice", true).expect("before");
    assert_eq!(before.ids.len(), 2);

    catalog.define_class(ClassDef {
        name: catalog.resolve_name("acc:receipt").expect("name"),
        kind: ClassKind::Type,
        parent: Some(catalog.resolve_name("acc:invoice").expect("name")),
        mandatory_aspects: Vec::new(),
    });
    let after = resolver.resolve_type_ids("acc:invoice", true).expect("after");
    assert_eq!(after.ids.len(), 3);
}

#[test]
fn concurrent_readers_see_consistent_expansions() {
    let (_dir, catalog) = load_fixture();
    let resolver = Arc::new(resolver(catalog.clone()));
    let parent = catalog.resolve_name("acc:invoice").expect("name");

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let resolver = Arc::clone(&resolver);
            thread::spawn(move || {
                for _ in 0..200 {
                    let class = resolver
                        .resolve_type_ids("acc:invoice", true)
                        .expect("expansion");
                    let count = class.ids.len();
                    assert!((2..=7).contains(&count), "unexpected size {count}");
                    let uuids = resolver
                        .resolve_uuids(&[Literal::from("workspace://SpacesStore/abc;1.2")])
                        .expect("uuids");
                    assert_eq!(uuids, vec!["abc".to_owned()]);
                }
            })
        })
        .collect();

    for idx in 0..5 {
        catalog.define_class(ClassDef {
            name: catalog
                .resolve_name(&format!("acc:variant_{idx}"))
                .expect("name"),
            kind: ClassKind::Type,
            parent: Some(parent.clone()),
            mandatory_aspects: Vec::new(),
        });
    }
    for reader in readers {
        reader.join().expect("reader thread");
    }
    let settled = resolver.resolve_type_ids("acc:invoice", true).expect("settled");
    assert_eq!(settled.ids.len(), 7);
}

#[test]
fn disabled_caches_still_resolve() {
    let (_dir, catalog) = load_fixture();
    let resolver = IdentifierResolver::new(
        Collaborators::from_catalog(catalog),
        ResolverOptions {
            type_cache_capacity: 0,
            property_cache_capacity: 0,
            reference_cache_capacity: 0,
        },
    );
    let first = resolver.resolve_type_ids("cmis:document", true).expect("first");
    let second = resolver.resolve_type_ids("cmis:document", true).expect("second");
    assert_eq!(first.ids, second.ids);
    assert_eq!(first.name, model::type_content());
    assert_eq!(
        resolver
            .resolve_object_ref("workspace://SpacesStore/ledger")
            .expect("ref"),
        NodeId(40)
    );
}

proptest! {
    #[test]
    fn type_resolution_is_idempotent(
        name in prop::sample::select(vec![
            "cmis:document",
            "cmis:folder",
            "cmis:item",
            "acc:invoice",
            "acc:credit_note",
            "acc:audited",
        ]),
        include in any::<bool>(),
    ) {
        let (_dir, catalog) = load_fixture();
        let resolver = resolver(catalog);
        let first = resolver.resolve_type_ids(name, include).expect("first");
        let second = resolver.resolve_type_ids(name, include).expect("second");
        prop_assert_eq!(&first.ids, &second.ids);
        prop_assert!(!first.ids.is_empty());
        if !include {
            prop_assert_eq!(first.ids.len(), 1);
        }
    }
}
