//! Join planning.
//!
//! Builder supports describe the joins their predicate needs as
//! [`JoinCommand`]s. Single joins are shared by every predicate of a query
//! that filters the same single-valued property of the same selector; multi
//! joins are appended once per predicate so multi-valued rows never
//! cross-multiply. Every planned join gets an alias no other join of the query
//! carries.

use serde::Serialize;
use tracing::trace;

use crate::query::ast::Selector;
use crate::types::QName;

/// Physical relation a join reaches.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinKind {
    /// Property-value row of a dictionary property.
    Property,
    /// Content-data row carrying the mimetype.
    ContentMimetype,
    /// Content-url row carrying the content size.
    ContentUrl,
    /// Aspect membership row.
    Aspect,
}

impl JoinKind {
    /// Short label used in plans and logs.
    pub fn label(self) -> &'static str {
        match self {
            JoinKind::Property => "property",
            JoinKind::ContentMimetype => "mimetype",
            JoinKind::ContentUrl => "content_url",
            JoinKind::Aspect => "aspect",
        }
    }
}

/// Whether a join may be shared between predicates.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinCardinality {
    /// Deduplicated by [`JoinKey`].
    Single,
    /// Appended unconditionally.
    Multi,
}

/// Deduplication key of a single join.
///
/// The mimetype and content-url joins both hang off the content property, so
/// the join kind is part of the key. Each selector joins its own rows.
#[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize)]
pub struct JoinKey {
    /// Selector whose row the join hangs off.
    pub selector: Option<Selector>,
    /// Qualified name of the joined property or aspect.
    pub qname: QName,
    /// Relation reached by the join.
    pub kind: JoinKind,
}

/// One required join.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct JoinCommand {
    /// Key the join is deduplicated by.
    pub key: JoinKey,
    /// Single or multi.
    pub cardinality: JoinCardinality,
    /// Alias the join is rendered under.
    pub alias: String,
}

impl JoinCommand {
    /// Builds a join whose alias derives from `kind` and the local name.
    ///
    /// The alias is only a base; [`add_join`] disambiguates it against the
    /// joins already planned.
    pub fn new(qname: QName, kind: JoinKind, cardinality: JoinCardinality) -> Self {
        let alias = format!("{}_{}", kind.label(), qname.local_name());
        Self {
            key: JoinKey {
                selector: None,
                qname,
                kind,
            },
            cardinality,
            alias,
        }
    }

    /// Hangs the join off `selector`'s row.
    pub fn on(mut self, selector: Option<Selector>) -> Self {
        self.key.selector = selector;
        self
    }

    /// Builds a deduplicated join.
    pub fn single(qname: QName, kind: JoinKind) -> Self {
        Self::new(qname, kind, JoinCardinality::Single)
    }

    /// Builds a per-predicate join.
    pub fn multi(qname: QName, kind: JoinKind) -> Self {
        Self::new(qname, kind, JoinCardinality::Multi)
    }
}

/// Insertion-ordered map of single joins.
///
/// Keeps declaration order so compiled plans are deterministic.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(transparent)]
pub struct SingleJoins {
    entries: Vec<JoinCommand>,
}

impl SingleJoins {
    /// Looks up the join for `key`.
    pub fn get(&self, key: &JoinKey) -> Option<&JoinCommand> {
        self.entries.iter().find(|join| &join.key == key)
    }

    /// Whether a join for `key` exists.
    pub fn contains_key(&self, key: &JoinKey) -> bool {
        self.get(key).is_some()
    }

    /// Number of distinct joins.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no single join has been planned.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &JoinCommand> {
        self.entries.iter()
    }

    fn insert(&mut self, command: JoinCommand) {
        self.entries.push(command);
    }
}

/// Adds `command` to the accumulators and returns the alias the predicate
/// must filter through.
///
/// A single join already present is reused; multi joins always append, and
/// get a positional suffix. A new single join whose base alias is taken by a
/// different key (same local name in another namespace, or another selector)
/// gets the first free numeric suffix.
pub fn add_join(
    single_joins: &mut SingleJoins,
    multi_joins: &mut Vec<JoinCommand>,
    mut command: JoinCommand,
) -> String {
    match command.cardinality {
        JoinCardinality::Single => {
            if let Some(existing) = single_joins.get(&command.key) {
                trace!(alias = %existing.alias, "query.joins.reuse");
                return existing.alias.clone();
            }
            if alias_taken(single_joins, multi_joins, &command.alias) {
                command.alias = free_alias(single_joins, multi_joins, &command.alias, 1);
                trace!(alias = %command.alias, "query.joins.renamed");
            }
            let alias = command.alias.clone();
            single_joins.insert(command);
            alias
        }
        JoinCardinality::Multi => {
            let start = multi_joins.len();
            command.alias = free_alias(single_joins, multi_joins, &command.alias, start);
            let alias = command.alias.clone();
            multi_joins.push(command);
            alias
        }
    }
}

fn alias_taken(single_joins: &SingleJoins, multi_joins: &[JoinCommand], alias: &str) -> bool {
    single_joins
        .iter()
        .chain(multi_joins)
        .any(|join| join.alias == alias)
}

/// First `{base}_{n}` with `n >= start` that no planned join uses.
fn free_alias(
    single_joins: &SingleJoins,
    multi_joins: &[JoinCommand],
    base: &str,
    start: usize,
) -> String {
    let mut n = start;
    loop {
        let candidate = format!("{base}_{n}");
        if !alias_taken(single_joins, multi_joins, &candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// Join accumulators shared by every predicate of one query.
#[derive(Clone, Debug, Default)]
pub struct JoinPlanner {
    /// Deduplicated joins.
    pub single_joins: SingleJoins,
    /// Per-predicate joins.
    pub multi_joins: Vec<JoinCommand>,
}

impl JoinPlanner {
    /// Creates empty accumulators.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one join; see [`add_join`].
    pub fn add(&mut self, command: JoinCommand) -> String {
        add_join(&mut self.single_joins, &mut self.multi_joins, command)
    }

    /// Total number of planned joins.
    pub fn len(&self) -> usize {
        self.single_joins.len() + self.multi_joins.len()
    }

    /// Whether no join has been planned.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::model::{self, CONTENT_MODEL_URI};

    #[test]
    fn single_joins_are_idempotent() {
        let mut planner = JoinPlanner::new();
        let title = QName::new(CONTENT_MODEL_URI, "title");
        let a = planner.add(JoinCommand::single(title.clone(), JoinKind::Property));
        let b = planner.add(JoinCommand::single(title, JoinKind::Property));
        assert_eq!(a, b);
        assert_eq!(planner.single_joins.len(), 1);
        assert!(planner.multi_joins.is_empty());
    }

    #[test]
    fn multi_joins_always_append() {
        let mut planner = JoinPlanner::new();
        let tags = QName::new(CONTENT_MODEL_URI, "tags");
        let a = planner.add(JoinCommand::multi(tags.clone(), JoinKind::Property));
        let b = planner.add(JoinCommand::multi(tags, JoinKind::Property));
        assert_ne!(a, b);
        assert_eq!(planner.multi_joins.len(), 2);
        assert!(planner.single_joins.is_empty());
    }

    #[test]
    fn content_joins_are_keyed_by_kind() {
        let mut planner = JoinPlanner::new();
        planner.add(JoinCommand::single(model::prop_content(), JoinKind::ContentMimetype));
        planner.add(JoinCommand::single(model::prop_content(), JoinKind::ContentUrl));
        assert_eq!(planner.single_joins.len(), 2);
        let key = JoinKey {
            selector: None,
            qname: model::prop_content(),
            kind: JoinKind::ContentMimetype,
        };
        assert_eq!(
            planner.single_joins.get(&key).map(|j| j.alias.as_str()),
            Some("mimetype_content")
        );
    }

    #[test]
    fn same_local_name_in_two_namespaces_gets_two_aliases() {
        let mut planner = JoinPlanner::new();
        let cm_title = QName::new(CONTENT_MODEL_URI, "title2");
        let app_title = QName::new("http://example.org/app", "title2");
        let a = planner.add(JoinCommand::single(cm_title.clone(), JoinKind::Property));
        let b = planner.add(JoinCommand::single(app_title.clone(), JoinKind::Property));
        assert_eq!(a, "property_title2");
        assert_eq!(b, "property_title2_1");
        assert_eq!(planner.single_joins.len(), 2);

        assert_eq!(planner.add(JoinCommand::single(cm_title, JoinKind::Property)), a);
        assert_eq!(planner.add(JoinCommand::single(app_title, JoinKind::Property)), b);
        assert_eq!(planner.single_joins.len(), 2);
    }

    #[test]
    fn selectors_do_not_share_single_joins() {
        let mut planner = JoinPlanner::new();
        let name = QName::new(CONTENT_MODEL_URI, "name");
        let on = |alias: &str| {
            JoinCommand::single(name.clone(), JoinKind::Property).on(Some(Selector::new(alias)))
        };
        let a = planner.add(on("A"));
        let b = planner.add(on("B"));
        assert_ne!(a, b);
        assert_eq!(planner.add(on("A")), a);
        let selectors: Vec<Option<&str>> = planner
            .single_joins
            .iter()
            .map(|join| join.key.selector.as_ref().map(|s| s.0.as_str()))
            .collect();
        assert_eq!(selectors, vec![Some("A"), Some("B")]);
    }

    #[test]
    fn renamed_single_aliases_never_shadow_multi_aliases() {
        let mut planner = JoinPlanner::new();
        let tags = QName::new(CONTENT_MODEL_URI, "tags");
        let other = QName::new("http://example.org/app", "tags");
        let multi = planner.add(JoinCommand::multi(tags.clone(), JoinKind::Property));
        let plain = planner.add(JoinCommand::single(tags, JoinKind::Property));
        let renamed = planner.add(JoinCommand::single(other, JoinKind::Property));
        assert_eq!(multi, "property_tags_0");
        assert_eq!(plain, "property_tags");
        assert_eq!(renamed, "property_tags_1");
        let next = planner.add(JoinCommand::multi(
            QName::new(CONTENT_MODEL_URI, "tags"),
            JoinKind::Property,
        ));
        assert_eq!(next, "property_tags_2");
    }
}
