//! Function-style predicates as they arrive from the query parser.
//!
//! The structures here are intentionally type-agnostic: properties are still
//! symbolic names and literals are untyped until the compiler resolves them
//! against the dictionary.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Named scope binding within a query, like a relation alias.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Selector(pub String);

impl Selector {
    /// Builds a selector from its alias.
    pub fn new(alias: impl Into<String>) -> Self {
        Selector(alias.into())
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Selector {
    fn from(value: &str) -> Self {
        Selector(value.to_owned())
    }
}

/// System properties with dedicated lowering strategies.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum SpecialProperty {
    /// Surrogate key of the primary parent.
    ParentId,
    /// Object id.
    ObjectId,
    /// Object type, matched with sub-types.
    ObjectTypeId,
    /// Object base type, matched exactly.
    BaseTypeId,
    /// Mimetype of the content stream.
    ContentMimetype,
    /// Size of the content stream.
    ContentLength,
}

impl SpecialProperty {
    const ALL: [SpecialProperty; 6] = [
        SpecialProperty::ParentId,
        SpecialProperty::ObjectId,
        SpecialProperty::ObjectTypeId,
        SpecialProperty::BaseTypeId,
        SpecialProperty::ContentMimetype,
        SpecialProperty::ContentLength,
    ];

    /// Wire name of the property.
    pub fn name(self) -> &'static str {
        match self {
            SpecialProperty::ParentId => "cmis:parentId",
            SpecialProperty::ObjectId => "cmis:objectId",
            SpecialProperty::ObjectTypeId => "cmis:objectTypeId",
            SpecialProperty::BaseTypeId => "cmis:baseTypeId",
            SpecialProperty::ContentMimetype => "cmis:contentStreamMimeType",
            SpecialProperty::ContentLength => "cmis:contentStreamLength",
        }
    }

    /// Looks up a special property by wire name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }
}

/// Reference to a special system property or a dictionary property.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PropertyRef {
    /// System property.
    Special(SpecialProperty),
    /// Dictionary property, `prefix:local` or `{uri}local`.
    Named(String),
}

impl PropertyRef {
    /// Display name used in diagnostics.
    pub fn name(&self) -> &str {
        match self {
            PropertyRef::Special(special) => special.name(),
            PropertyRef::Named(name) => name,
        }
    }
}

impl From<&str> for PropertyRef {
    fn from(value: &str) -> Self {
        match SpecialProperty::from_name(value) {
            Some(special) => PropertyRef::Special(special),
            None => PropertyRef::Named(value.to_owned()),
        }
    }
}

impl From<String> for PropertyRef {
    fn from(value: String) -> Self {
        match SpecialProperty::from_name(&value) {
            Some(special) => PropertyRef::Special(special),
            None => PropertyRef::Named(value),
        }
    }
}

impl From<PropertyRef> for String {
    fn from(value: PropertyRef) -> Self {
        match value {
            PropertyRef::Special(special) => special.name().to_owned(),
            PropertyRef::Named(name) => name,
        }
    }
}

impl From<SpecialProperty> for PropertyRef {
    fn from(value: SpecialProperty) -> Self {
        PropertyRef::Special(value)
    }
}

impl fmt::Display for PropertyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Property argument: the property plus an optional explicit selector.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PropertyArg {
    /// Referenced property.
    pub name: PropertyRef,
    /// Explicit selector qualifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<Selector>,
}

impl PropertyArg {
    /// Qualifies the property with an explicit selector.
    pub fn on(mut self, selector: impl Into<Selector>) -> Self {
        self.selector = Some(selector.into());
        self
    }
}

impl From<PropertyRef> for PropertyArg {
    fn from(value: PropertyRef) -> Self {
        PropertyArg {
            name: value,
            selector: None,
        }
    }
}

impl From<&str> for PropertyArg {
    fn from(value: &str) -> Self {
        PropertyRef::from(value).into()
    }
}

impl From<String> for PropertyArg {
    fn from(value: String) -> Self {
        PropertyRef::from(value).into()
    }
}

impl From<SpecialProperty> for PropertyArg {
    fn from(value: SpecialProperty) -> Self {
        PropertyRef::Special(value).into()
    }
}

/// Untyped literal supplied by the query.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed 64-bit integer value.
    Int(i64),
    /// 64-bit floating point value.
    Float(f64),
    /// String value.
    String(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => f.write_str("null"),
            Literal::Bool(v) => write!(f, "{v}"),
            Literal::Int(v) => write!(f, "{v}"),
            Literal::Float(v) => write!(f, "{v}"),
            Literal::String(v) => f.write_str(v),
        }
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

/// Binary comparison operator.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ComparisonOp {
    /// `=`
    #[serde(rename = "=")]
    Eq,
    /// `<>`
    #[serde(rename = "<>")]
    Ne,
    /// `<`
    #[serde(rename = "<")]
    Lt,
    /// `<=`
    #[serde(rename = "<=")]
    Le,
    /// `>`
    #[serde(rename = ">")]
    Gt,
    /// `>=`
    #[serde(rename = ">=")]
    Ge,
}

/// Predicate to lower; one function call in the parsed query.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "fn", rename_all = "snake_case")]
pub enum Predicate {
    /// Object is a child of `parent`.
    ChildOf {
        /// Literal object reference of the parent.
        parent: String,
        /// Selector the test applies to.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        selector: Option<Selector>,
    },
    /// Property value is (not) one of `values`.
    #[serde(rename = "in")]
    SetMembership {
        /// Tested property.
        property: PropertyArg,
        /// Candidate values.
        values: Vec<Literal>,
        /// Negation flag.
        #[serde(default)]
        negated: bool,
    },
    /// Property value does (not) match a `%`/`_` pattern.
    #[serde(rename = "like")]
    PatternMatch {
        /// Tested property.
        property: PropertyArg,
        /// Pattern text.
        pattern: String,
        /// Negation flag.
        #[serde(default)]
        negated: bool,
    },
    /// Property value compared with a literal.
    #[serde(rename = "compare")]
    Comparison {
        /// Tested property.
        property: PropertyArg,
        /// Operator.
        op: ComparisonOp,
        /// Right-hand literal.
        value: Literal,
    },
    /// Property is (not) set.
    Exists {
        /// Tested property.
        property: PropertyArg,
        /// `true` means "is null".
        #[serde(default)]
        negated: bool,
    },
}

impl Predicate {
    /// `ChildOf` without an explicit selector.
    pub fn child_of(parent: impl Into<String>) -> Self {
        Predicate::ChildOf {
            parent: parent.into(),
            selector: None,
        }
    }

    /// `ChildOf` qualified with a selector.
    pub fn child_of_on(parent: impl Into<String>, selector: impl Into<Selector>) -> Self {
        Predicate::ChildOf {
            parent: parent.into(),
            selector: Some(selector.into()),
        }
    }

    /// Set membership test.
    pub fn set_membership<P, I, L>(property: P, values: I, negated: bool) -> Self
    where
        P: Into<PropertyArg>,
        I: IntoIterator<Item = L>,
        L: Into<Literal>,
    {
        Predicate::SetMembership {
            property: property.into(),
            values: values.into_iter().map(Into::into).collect(),
            negated,
        }
    }

    /// Pattern match test.
    pub fn pattern_match(
        property: impl Into<PropertyArg>,
        pattern: impl Into<String>,
        negated: bool,
    ) -> Self {
        Predicate::PatternMatch {
            property: property.into(),
            pattern: pattern.into(),
            negated,
        }
    }

    /// Binary comparison.
    pub fn comparison(
        property: impl Into<PropertyArg>,
        op: ComparisonOp,
        value: impl Into<Literal>,
    ) -> Self {
        Predicate::Comparison {
            property: property.into(),
            op,
            value: value.into(),
        }
    }

    /// Existence test; `negated` asks for "is null".
    pub fn exists(property: impl Into<PropertyArg>, negated: bool) -> Self {
        Predicate::Exists {
            property: property.into(),
            negated,
        }
    }

    /// Function name used in diagnostics.
    pub fn function_name(&self) -> &'static str {
        match self {
            Predicate::ChildOf { .. } => "child_of",
            Predicate::SetMembership { .. } => "in",
            Predicate::PatternMatch { .. } => "like",
            Predicate::Comparison { .. } => "compare",
            Predicate::Exists { .. } => "exists",
        }
    }

    /// Property argument, absent for `ChildOf`.
    pub fn property(&self) -> Option<&PropertyArg> {
        match self {
            Predicate::ChildOf { .. } => None,
            Predicate::SetMembership { property, .. }
            | Predicate::PatternMatch { property, .. }
            | Predicate::Comparison { property, .. }
            | Predicate::Exists { property, .. } => Some(property),
        }
    }
}
