#![allow(missing_docs)]

use std::sync::Arc;

use quarry::catalog::model::{self, CONTENT_MODEL_URI};
use quarry::catalog::{ClassKind, DataType, FixedTenant, InMemoryCatalog, QNameCatalog};
use quarry::config::CompilerOptions;
use quarry::query::ast::{
    ComparisonOp, Literal, Predicate, PropertyArg, Selector, SpecialProperty,
};
use quarry::query::fragments::{FragmentTarget, FragmentValues, PredicateMode};
use quarry::query::joins::{JoinCardinality, JoinKey, JoinKind};
use quarry::query::value::{PhysicalField, PhysicalLiteral};
use quarry::query::{Collaborators, CompileError, Query, QueryCompiler};
use quarry::types::{NodeId, ObjectRef, QName, StoreRef};

fn cm(local: &str) -> QName {
    QName::new(CONTENT_MODEL_URI, local)
}

fn catalog() -> Arc<InMemoryCatalog> {
    let store = StoreRef::new("workspace", "SpacesStore");
    Arc::new(
        InMemoryCatalog::with_base_model()
            .with_class(cm("report"), ClassKind::Type, Some(model::type_content()))
            .with_class(cm("memo"), ClassKind::Type, Some(cm("report")))
            .with_class(cm("tagged"), ClassKind::Aspect, None)
            .with_property(cm("tags"), DataType::Text, true, cm("tagged"))
            .with_property(cm("published"), DataType::Boolean, false, cm("report"))
            .with_property(cm("score"), DataType::Float, false, cm("report"))
            .with_property(cm("due"), DataType::DateTime, false, cm("report"))
            .with_node(ObjectRef::new(store.clone(), "root"), NodeId(1))
            .with_node(ObjectRef::new(store.clone(), "archive"), NodeId(2))
            .with_node(ObjectRef::new(store.with_tenant("acme"), "root"), NodeId(101)),
    )
}

fn compiler_with(catalog: Arc<InMemoryCatalog>, options: CompilerOptions) -> QueryCompiler {
    QueryCompiler::open(Collaborators::from_catalog(catalog), options).expect("compiler")
}

fn compiler() -> QueryCompiler {
    compiler_with(catalog(), CompilerOptions::default())
}

#[test]
fn type_and_mimetype_scenario() {
    let compiler = compiler();
    let query = Query::new(["A"])
        .with(Predicate::set_membership(
            SpecialProperty::ObjectTypeId,
            ["cmis:document"],
            false,
        ))
        .with(Predicate::set_membership(
            SpecialProperty::ContentMimetype,
            ["image/png"],
            false,
        ));
    let compiled = compiler.compile(&query).expect("compiled");

    assert_eq!(compiled.fragments.len(), 2);
    let types = &compiled.fragments[0];
    assert_eq!(types.target, FragmentTarget::Type);
    assert_eq!(types.mode, PredicateMode::In);
    let FragmentValues::TypeIds(ids) = &types.values else {
        panic!("expected type ids, got {:?}", types.values);
    };
    assert_eq!(ids.len(), 3, "cm:content, cm:report and cm:memo");

    let mimetype = &compiled.fragments[1];
    assert_eq!(mimetype.mode, PredicateMode::In);
    assert_eq!(
        mimetype.target,
        FragmentTarget::Field {
            alias: "mimetype_content".into(),
            field: PhysicalField::MimetypeStr,
        }
    );
    assert_eq!(
        mimetype.values,
        FragmentValues::Literals(vec![PhysicalLiteral::String("image/png".into())])
    );

    assert_eq!(compiled.single_joins.len(), 1);
    assert!(compiled.single_joins.contains_key(&JoinKey {
        selector: Some(Selector::new("A")),
        qname: model::prop_content(),
        kind: JoinKind::ContentMimetype,
    }));
    assert!(compiled.multi_joins.is_empty());
    assert_eq!(
        compiled.strategies,
        vec!["type_identity_membership", "property_comparison"]
    );
}

#[test]
fn single_valued_property_joins_once_per_query() {
    let compiler = compiler();
    let query = Query::new(["A"])
        .with(Predicate::comparison("cm:name", ComparisonOp::Ge, "a"))
        .with(Predicate::pattern_match("cm:name", "rep%", true))
        .with(Predicate::exists("cm:name", false));
    let compiled = compiler.compile(&query).expect("compiled");
    assert_eq!(compiled.single_joins.len(), 1);
    assert!(compiled.single_joins.contains_key(&JoinKey {
        selector: Some(Selector::new("A")),
        qname: cm("name"),
        kind: JoinKind::Property,
    }));
    let modes: Vec<PredicateMode> = compiled.fragments.iter().map(|f| f.mode).collect();
    assert_eq!(
        modes,
        vec![
            PredicateMode::GreaterThanEquals,
            PredicateMode::NotLike,
            PredicateMode::IsNotNull
        ]
    );
}

#[test]
fn multi_valued_property_joins_per_predicate() {
    let compiler = compiler();
    let mut query = Query::new(["A"]);
    for tag in ["red", "green", "blue"] {
        query = query.with(Predicate::set_membership("cm:tags", [tag], false));
    }
    let compiled = compiler.compile(&query).expect("compiled");
    assert_eq!(compiled.multi_joins.len(), 3);
    assert!(compiled.single_joins.is_empty());
    let aliases: Vec<&str> = compiled.multi_joins.iter().map(|j| j.alias.as_str()).collect();
    assert_eq!(aliases, vec!["property_tags_0", "property_tags_1", "property_tags_2"]);
    for (fragment, alias) in compiled.fragments.iter().zip(aliases) {
        match &fragment.target {
            FragmentTarget::Field { alias: used, .. } => assert_eq!(used, alias),
            other => panic!("unexpected target {other:?}"),
        }
    }
}

#[test]
fn base_type_is_matched_exactly() {
    let catalog = catalog();
    let compiler = compiler_with(catalog.clone(), CompilerOptions::default());
    let compiled = compiler
        .compile(&Query::new(["A"]).with(Predicate::set_membership(
            SpecialProperty::BaseTypeId,
            ["cmis:document"],
            true,
        )))
        .expect("compiled");
    let content_id = catalog
        .qname_id(&model::type_content())
        .expect("lookup")
        .expect("persisted");
    assert_eq!(compiled.fragments[0].mode, PredicateMode::NotIn);
    assert_eq!(
        compiled.fragments[0].values,
        FragmentValues::TypeIds(vec![content_id])
    );
}

#[test]
fn aspects_filter_through_an_aspect_join() {
    let compiler = compiler();
    let compiled = compiler
        .compile(&Query::new(["A"]).with(Predicate::comparison(
            SpecialProperty::ObjectTypeId,
            ComparisonOp::Eq,
            "cm:tagged",
        )))
        .expect("compiled");
    assert_eq!(compiled.multi_joins.len(), 1);
    let join = &compiled.multi_joins[0];
    assert_eq!(join.key.kind, JoinKind::Aspect);
    assert_eq!(join.cardinality, JoinCardinality::Multi);
    assert_eq!(compiled.fragments[0].mode, PredicateMode::In);
    assert_eq!(
        compiled.fragments[0].target,
        FragmentTarget::Aspect {
            alias: join.alias.clone()
        }
    );

    let err = compiler
        .compile(&Query::new(["A"]).with(Predicate::set_membership(
            SpecialProperty::ObjectTypeId,
            ["cm:report", "cm:tagged"],
            false,
        )))
        .expect_err("mixed kinds");
    assert!(matches!(err, CompileError::MixedClassKinds { .. }));
}

#[test]
fn legacy_layout_stores_booleans_and_floats_as_text() {
    let compiler = compiler_with(catalog(), CompilerOptions::legacy());
    let query = Query::new(["A"])
        .with(Predicate::comparison("cm:published", ComparisonOp::Eq, true))
        .with(Predicate::set_membership(
            "cm:score",
            [Literal::Float(1.5), Literal::Int(2)],
            false,
        ));
    let compiled = compiler.compile(&query).expect("legacy");
    assert_eq!(
        compiled.fragments[0].values,
        FragmentValues::Literals(vec![PhysicalLiteral::String("true".into())])
    );
    assert!(matches!(
        &compiled.fragments[1].target,
        FragmentTarget::Field { field: PhysicalField::StringValue, .. }
    ));

    let current = compiler
        .compile(&query.clone().with_legacy_layout(false))
        .expect("current");
    assert!(matches!(
        &current.fragments[0].target,
        FragmentTarget::Field { field: PhysicalField::BooleanValue, .. }
    ));
    assert_eq!(
        current.fragments[1].values,
        FragmentValues::Literals(vec![PhysicalLiteral::Double(1.5), PhysicalLiteral::Double(2.0)])
    );
}

#[test]
fn dates_are_normalised_to_utc() {
    let compiler = compiler();
    let compiled = compiler
        .compile(&Query::new(["A"]).with(Predicate::comparison(
            "cm:due",
            ComparisonOp::Lt,
            "2024-03-01T10:00:00+02:00",
        )))
        .expect("compiled");
    assert_eq!(
        compiled.fragments[0].values,
        FragmentValues::Literals(vec![PhysicalLiteral::String(
            "2024-03-01T08:00:00.000Z".into()
        )])
    );
    let err = compiler
        .compile(&Query::new(["A"]).with(Predicate::comparison(
            "cm:due",
            ComparisonOp::Lt,
            "yesterday",
        )))
        .expect_err("not a date");
    assert_eq!(err.code(), "InvalidLiteral");
}

#[test]
fn parent_membership_resolves_references_in_order() {
    let compiler = compiler();
    let compiled = compiler
        .compile(
            &Query::new(["A", "B"])
                .with(Predicate::child_of_on("workspace://SpacesStore/archive", "B"))
                .with(Predicate::set_membership(
                    PropertyArg::from(SpecialProperty::ParentId).on("A"),
                    [
                        "workspace://SpacesStore/archive",
                        "workspace://SpacesStore/root",
                    ],
                    true,
                )),
        )
        .expect("compiled");
    assert_eq!(compiled.fragments[0].to_string(), "B.parent_node_id = 2");
    assert_eq!(
        compiled.fragments[1].values,
        FragmentValues::Keys(vec![NodeId(2), NodeId(1)])
    );
    assert_eq!(compiled.fragments[1].mode, PredicateMode::NotIn);
    assert!(compiled.single_joins.is_empty() && compiled.multi_joins.is_empty());
}

#[test]
fn tenant_qualifies_unqualified_references() {
    let options = CompilerOptions {
        default_tenant: Some("acme".into()),
        ..CompilerOptions::default()
    };
    let compiler = compiler_with(catalog(), options);
    let compiled = compiler
        .compile(&Query::new(["A"]).with(Predicate::child_of("workspace://SpacesStore/root")))
        .expect("compiled");
    assert_eq!(compiled.fragments[0].values, FragmentValues::Keys(vec![NodeId(101)]));

    let explicit = QueryCompiler::open(
        Collaborators::from_catalog(catalog()).with_tenant(Arc::new(FixedTenant(None))),
        CompilerOptions::default(),
    )
    .expect("compiler");
    let compiled = explicit
        .compile(&Query::new(["A"]).with(Predicate::child_of("workspace://SpacesStore/root")))
        .expect("compiled");
    assert_eq!(compiled.fragments[0].values, FragmentValues::Keys(vec![NodeId(1)]));
}

#[test]
fn compile_errors_abort_the_query() {
    let compiler = compiler();
    let cases: Vec<(Predicate, &str)> = vec![
        (Predicate::child_of("workspace://Nowhere/x"), "UnresolvableReference"),
        (
            Predicate::set_membership(SpecialProperty::ObjectTypeId, ["cm:ghost"], false),
            "UnknownType",
        ),
        (Predicate::set_membership("cm:ghost", ["x"], false), "UnknownProperty"),
        (
            Predicate::set_membership(PropertyArg::from("cm:name").on("Z"), ["x"], false),
            "UnknownSelector",
        ),
        (
            Predicate::pattern_match(SpecialProperty::ContentLength, "1%", false),
            "UnsupportedPredicate",
        ),
        (
            Predicate::comparison("cm:content", ComparisonOp::Eq, "x"),
            "UnsupportedDataType",
        ),
    ];
    for (predicate, code) in cases {
        let query = Query::new(["A"])
            .with(Predicate::set_membership("cm:name", ["ok"], false))
            .with(predicate);
        let err = compiler.compile(&query).expect_err(code);
        assert_eq!(err.code(), code, "{err}");
    }
}

#[test]
fn queries_deserialise_from_json() {
    let query: Query = serde_json::from_str(
        r#"{
            "selectors": ["A"],
            "predicates": [
                {"fn": "in", "property": {"name": "cmis:objectId"},
                 "values": ["abc;1.0"], "negated": false},
                {"fn": "compare", "property": {"name": "cmis:contentStreamLength"},
                 "op": ">", "value": 1024}
            ]
        }"#,
    )
    .expect("query json");
    let compiled = compiler().compile(&query).expect("compiled");
    assert_eq!(compiled.fragments[0].values, FragmentValues::Uuids(vec!["abc".into()]));
    assert_eq!(
        compiled.fragments[1].to_string(),
        "content_url_content.content_size > 1024"
    );
    assert!(compiled.single_joins.contains_key(&JoinKey {
        selector: Some(Selector::new("A")),
        qname: model::prop_content(),
        kind: JoinKind::ContentUrl,
    }));
}

fn field_alias(target: &FragmentTarget) -> &str {
    match target {
        FragmentTarget::Field { alias, .. } => alias,
        other => panic!("unexpected target {other:?}"),
    }
}

#[test]
fn same_local_name_across_namespaces_joins_twice() {
    let catalog = InMemoryCatalog::with_base_model()
        .with_namespace("app", "http://example.org/app")
        .with_class(cm("report"), ClassKind::Type, Some(model::type_content()))
        .with_property(cm("title2"), DataType::Text, false, cm("report"))
        .with_property(
            QName::new("http://example.org/app", "title2"),
            DataType::Text,
            false,
            cm("report"),
        );
    let compiler = compiler_with(Arc::new(catalog), CompilerOptions::default());
    let compiled = compiler
        .compile(
            &Query::new(["A"])
                .with(Predicate::set_membership("cm:title2", ["x"], false))
                .with(Predicate::set_membership("app:title2", ["y"], false))
                .with(Predicate::exists("cm:title2", false)),
        )
        .expect("compiled");

    assert_eq!(compiled.single_joins.len(), 2);
    let aliases: Vec<&str> = compiled.single_joins.iter().map(|j| j.alias.as_str()).collect();
    assert_ne!(aliases[0], aliases[1]);
    let used: Vec<&str> = compiled.fragments.iter().map(|f| field_alias(&f.target)).collect();
    assert_eq!(used[0], aliases[0]);
    assert_eq!(used[1], aliases[1]);
    assert_eq!(used[2], aliases[0], "cm:title2 reuses its own join");
    assert_eq!(
        compiled.fragments[1].to_string(),
        format!("{}.string_value IN ('y')", aliases[1])
    );
}

#[test]
fn each_selector_joins_its_own_rows() {
    let compiler = compiler();
    let compiled = compiler
        .compile(
            &Query::new(["A", "B"])
                .with(Predicate::set_membership(
                    PropertyArg::from("cm:name").on("A"),
                    ["x"],
                    false,
                ))
                .with(Predicate::set_membership(
                    PropertyArg::from("cm:name").on("B"),
                    ["y"],
                    false,
                ))
                .with(Predicate::comparison(
                    PropertyArg::from("cm:name").on("A"),
                    ComparisonOp::Ne,
                    "z",
                )),
        )
        .expect("compiled");

    assert_eq!(compiled.single_joins.len(), 2);
    for (selector, fragment_idx) in [("A", 0), ("B", 1), ("A", 2)] {
        let key = JoinKey {
            selector: Some(Selector::new(selector)),
            qname: cm("name"),
            kind: JoinKind::Property,
        };
        let join = compiled.single_joins.get(&key).expect("join per selector");
        let fragment = &compiled.fragments[fragment_idx];
        assert_eq!(fragment.selector, Some(Selector::new(selector)));
        assert_eq!(field_alias(&fragment.target), join.alias);
    }
    assert_ne!(
        field_alias(&compiled.fragments[0].target),
        field_alias(&compiled.fragments[1].target)
    );
}
