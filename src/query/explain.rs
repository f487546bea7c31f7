//! Human-readable explain trees for compiled queries.

use std::fmt::Write as _;

use serde_json::{Map, Value};

use crate::query::compiler::CompiledQuery;
use crate::query::fragments::PredicateFragment;
use crate::query::joins::JoinCommand;

/// Explain tree plus the plan hash.
#[derive(Clone, Debug)]
pub struct PlanExplain {
    /// Root node of the explain tree.
    pub root: ExplainNode,
    /// Deterministic hash for the plan.
    pub plan_hash: u64,
}

/// Explain node with optional metadata.
#[derive(Clone, Debug)]
pub struct ExplainNode {
    /// Node name.
    pub op: String,
    /// Additional properties describing the node.
    pub props: Vec<ExplainProp>,
    /// Child nodes.
    pub inputs: Vec<ExplainNode>,
}

impl ExplainNode {
    /// Creates a new explain node with the given name.
    pub fn new(op: impl Into<String>) -> Self {
        Self {
            op: op.into(),
            props: Vec::new(),
            inputs: Vec::new(),
        }
    }
}

/// Single property associated with an [`ExplainNode`].
#[derive(Clone, Debug)]
pub struct ExplainProp {
    /// Property key.
    pub key: String,
    /// Property value serialized for display.
    pub value: String,
    /// Whether this property contains literal data that may be redacted.
    pub redactable: bool,
}

impl ExplainProp {
    fn plain(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            redactable: false,
        }
    }

    fn literal(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            redactable: true,
        }
    }
}

/// Builds the explain tree of a compiled query.
pub fn explain(compiled: &CompiledQuery) -> PlanExplain {
    let mut root = ExplainNode::new("Query");
    let selectors: Vec<&str> = compiled.selectors.iter().map(|s| s.0.as_str()).collect();
    root.props
        .push(ExplainProp::plain("selectors", selectors.join(", ")));

    let mut joins = ExplainNode::new("Joins");
    joins.inputs.extend(compiled.single_joins.iter().map(join_node));
    joins.inputs.extend(compiled.multi_joins.iter().map(join_node));
    root.inputs.push(joins);

    let mut filter = ExplainNode::new("Filter");
    filter.inputs.extend(
        compiled
            .fragments
            .iter()
            .zip(&compiled.strategies)
            .map(|(fragment, strategy)| fragment_node(fragment, strategy)),
    );
    root.inputs.push(filter);

    PlanExplain {
        root,
        plan_hash: compiled.plan_hash,
    }
}

fn join_node(join: &JoinCommand) -> ExplainNode {
    let mut node = ExplainNode::new(format!("Join({})", join.key.kind.label()));
    node.props.push(ExplainProp::plain("alias", join.alias.clone()));
    if let Some(selector) = &join.key.selector {
        node.props.push(ExplainProp::plain("selector", selector.0.clone()));
    }
    node.props.push(ExplainProp::plain("qname", join.key.qname.to_string()));
    node.props.push(ExplainProp::plain(
        "cardinality",
        format!("{:?}", join.cardinality).to_lowercase(),
    ));
    node
}

fn fragment_node(fragment: &PredicateFragment, strategy: &str) -> ExplainNode {
    let mut node = ExplainNode::new(strategy);
    if let Some(selector) = &fragment.selector {
        node.props.push(ExplainProp::plain("selector", selector.0.clone()));
    }
    node.props
        .push(ExplainProp::plain("target", fragment.target.to_string()));
    node.props
        .push(ExplainProp::plain("mode", fragment.mode.operator()));
    if !fragment.values.is_empty() {
        node.props
            .push(ExplainProp::literal("condition", fragment.to_string()));
    }
    node
}

/// Renders the tree as indented text; `redact` hides literal values.
pub fn render_text(explain: &PlanExplain, redact: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "plan_hash: {:016x}", explain.plan_hash);
    render_node(&explain.root, 0, redact, &mut out);
    out
}

fn render_node(node: &ExplainNode, depth: usize, redact: bool, out: &mut String) {
    let _ = write!(out, "{}{}", "  ".repeat(depth), node.op);
    for prop in &node.props {
        let value = if redact && prop.redactable {
            "<redacted>"
        } else {
            prop.value.as_str()
        };
        let _ = write!(out, " {}={}", prop.key, value);
    }
    out.push('\n');
    for child in &node.inputs {
        render_node(child, depth + 1, redact, out);
    }
}

/// Converts the tree into JSON.
pub fn explain_to_value(explain: &PlanExplain, redact: bool) -> Value {
    let mut root = Map::new();
    root.insert(
        "plan_hash".into(),
        Value::String(format!("{:016x}", explain.plan_hash)),
    );
    root.insert("plan".into(), explain_node_to_value(&explain.root, redact));
    Value::Object(root)
}

fn explain_node_to_value(node: &ExplainNode, redact: bool) -> Value {
    let mut map = Map::new();
    map.insert("op".into(), Value::String(node.op.clone()));
    if !node.props.is_empty() {
        let mut props = Map::new();
        for prop in &node.props {
            let value = if redact && prop.redactable {
                "<redacted>".to_owned()
            } else {
                prop.value.clone()
            };
            props.insert(prop.key.clone(), Value::String(value));
        }
        map.insert("props".into(), Value::Object(props));
    }
    let inputs = node
        .inputs
        .iter()
        .map(|child| explain_node_to_value(child, redact))
        .collect::<Vec<_>>();
    map.insert("inputs".into(), Value::Array(inputs));
    Value::Object(map)
}
