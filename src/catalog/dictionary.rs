//! Dictionary metadata: property data types, cardinality and the class hierarchy.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::{QName, QuarryError};

/// Declared data type of a dictionary property.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// Plain text.
    Text,
    /// Multilingual text.
    MlText,
    /// Content stream descriptor (mimetype, size, url).
    Content,
    /// 32-bit integer.
    Int,
    /// 64-bit integer.
    Long,
    /// Single-precision float.
    Float,
    /// Double-precision float.
    Double,
    /// Calendar date.
    Date,
    /// Date and time.
    DateTime,
    /// Boolean flag.
    Boolean,
    /// Qualified name.
    QName,
    /// Object reference.
    NodeRef,
    /// Child association reference.
    ChildAssocRef,
    /// Peer association reference.
    AssocRef,
    /// Category reference.
    Category,
    /// Locale tag.
    Locale,
    /// Period expression.
    Period,
    /// Untyped value.
    Any,
}

impl DataType {
    /// Short dictionary name, as written after the `d:` prefix.
    pub fn name(self) -> &'static str {
        match self {
            DataType::Text => "text",
            DataType::MlText => "mltext",
            DataType::Content => "content",
            DataType::Int => "int",
            DataType::Long => "long",
            DataType::Float => "float",
            DataType::Double => "double",
            DataType::Date => "date",
            DataType::DateTime => "datetime",
            DataType::Boolean => "boolean",
            DataType::QName => "qname",
            DataType::NodeRef => "noderef",
            DataType::ChildAssocRef => "childassocref",
            DataType::AssocRef => "assocref",
            DataType::Category => "category",
            DataType::Locale => "locale",
            DataType::Period => "period",
            DataType::Any => "any",
        }
    }

    const ALL: [DataType; 18] = [
        DataType::Text,
        DataType::MlText,
        DataType::Content,
        DataType::Int,
        DataType::Long,
        DataType::Float,
        DataType::Double,
        DataType::Date,
        DataType::DateTime,
        DataType::Boolean,
        DataType::QName,
        DataType::NodeRef,
        DataType::ChildAssocRef,
        DataType::AssocRef,
        DataType::Category,
        DataType::Locale,
        DataType::Period,
        DataType::Any,
    ];
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "d:{}", self.name())
    }
}

impl FromStr for DataType {
    type Err = QuarryError;

    /// Accepts `text` as well as `d:text`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let short = s.strip_prefix("d:").unwrap_or(s);
        DataType::ALL
            .into_iter()
            .find(|ty| ty.name().eq_ignore_ascii_case(short))
            .ok_or_else(|| QuarryError::InvalidOwned(format!("unknown data type '{s}'")))
    }
}

/// Whether a class is a primary type or an aspect.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassKind {
    /// Primary object type.
    Type,
    /// Secondary, attachable aspect.
    Aspect,
}

/// Dictionary definition of a type or aspect.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassDef {
    /// Class name.
    pub name: QName,
    /// Type or aspect.
    pub kind: ClassKind,
    /// Direct parent class, if any.
    pub parent: Option<QName>,
    /// Aspects every instance of this class carries.
    pub mandatory_aspects: Vec<QName>,
}

/// Dictionary definition of a property.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PropertyDef {
    /// Property name.
    pub name: QName,
    /// Declared data type.
    pub data_type: DataType,
    /// Whether the property holds a list of values.
    pub multi_valued: bool,
    /// Class declaring the property.
    pub container: QName,
}
