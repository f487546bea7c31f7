//! Physical columns and literal coercion.
//!
//! Query literals arrive untyped; before a builder support sees them they are
//! coerced into the representation the backing column stores, so every value
//! of one predicate shares a single physical type.

use std::fmt;

use serde::{Serialize, Serializer};
use time::format_description::well_known::Rfc3339;
use time::format_description::FormatItem;
use time::macros::format_description;
use time::{Date, OffsetDateTime, UtcOffset};

use crate::catalog::DataType;
use crate::primitives::numeric;
use crate::query::ast::Literal;
use crate::query::errors::CompileError;

const DATE_ONLY: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");
const CANONICAL_DATETIME: &[FormatItem<'static>] = format_description!(
    "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
);

/// Column that stores a property value.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum PhysicalField {
    /// Text column of the property-value row.
    StringValue,
    /// Integer column of the property-value row.
    LongValue,
    /// Single-precision column of the property-value row.
    FloatValue,
    /// Double-precision column of the property-value row.
    DoubleValue,
    /// Boolean column of the property-value row.
    BooleanValue,
    /// Mimetype string of the content-data row.
    MimetypeStr,
    /// Size column of the content-url row.
    ContentSize,
}

impl PhysicalField {
    /// Column name.
    pub fn column(self) -> &'static str {
        match self {
            PhysicalField::StringValue => "string_value",
            PhysicalField::LongValue => "long_value",
            PhysicalField::FloatValue => "float_value",
            PhysicalField::DoubleValue => "double_value",
            PhysicalField::BooleanValue => "boolean_value",
            PhysicalField::MimetypeStr => "mimetype_str",
            PhysicalField::ContentSize => "content_size",
        }
    }

    /// Whether pattern matching can run against this column.
    pub fn is_textual(self) -> bool {
        matches!(self, PhysicalField::StringValue | PhysicalField::MimetypeStr)
    }

    /// Selects the column backing a generic property of `data_type`.
    ///
    /// `support_boolean_float_double` selects the current storage layout; the
    /// legacy layout keeps booleans, floats and doubles in the text column.
    pub fn for_data_type(
        prop: &str,
        data_type: DataType,
        support_boolean_float_double: bool,
    ) -> Result<Self, CompileError> {
        let field = match data_type {
            DataType::Int | DataType::Long => PhysicalField::LongValue,
            DataType::Boolean if support_boolean_float_double => PhysicalField::BooleanValue,
            DataType::Float if support_boolean_float_double => PhysicalField::FloatValue,
            DataType::Double if support_boolean_float_double => PhysicalField::DoubleValue,
            DataType::Boolean | DataType::Float | DataType::Double => PhysicalField::StringValue,
            DataType::Content => {
                return Err(CompileError::UnsupportedDataType {
                    prop: prop.to_owned(),
                    data_type: data_type.to_string(),
                })
            }
            DataType::Text
            | DataType::MlText
            | DataType::Date
            | DataType::DateTime
            | DataType::QName
            | DataType::NodeRef
            | DataType::ChildAssocRef
            | DataType::AssocRef
            | DataType::Category
            | DataType::Locale
            | DataType::Period
            | DataType::Any => PhysicalField::StringValue,
        };
        Ok(field)
    }
}

impl fmt::Display for PhysicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

impl Serialize for PhysicalField {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.column())
    }
}

/// Literal in the representation of its target column.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PhysicalLiteral {
    /// Text column value.
    String(String),
    /// Integer column value.
    Long(i64),
    /// Floating point column value.
    Double(f64),
    /// Boolean column value.
    Boolean(bool),
}

impl PhysicalLiteral {
    /// Canonical key whose lexical order matches the value order within one type.
    pub fn sort_key(&self) -> String {
        match self {
            PhysicalLiteral::String(v) => format!("s{v}"),
            PhysicalLiteral::Long(v) => format!("l{}", numeric::encode_i64(*v)),
            PhysicalLiteral::Double(v) => format!("d{}", numeric::encode_f64(*v)),
            PhysicalLiteral::Boolean(v) => format!("b{}", u8::from(*v)),
        }
    }
}

impl fmt::Display for PhysicalLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhysicalLiteral::String(v) => write!(f, "'{}'", v.replace('\'', "''")),
            PhysicalLiteral::Long(v) => write!(f, "{v}"),
            PhysicalLiteral::Double(v) => write!(f, "{v}"),
            PhysicalLiteral::Boolean(v) => write!(f, "{v}"),
        }
    }
}

/// Coerces `literal` into the representation stored by `field`.
pub fn translate_value(
    prop: &str,
    data_type: DataType,
    field: PhysicalField,
    literal: &Literal,
) -> Result<PhysicalLiteral, CompileError> {
    let invalid = |expected: &'static str| CompileError::InvalidLiteral {
        prop: prop.to_owned(),
        value: literal.to_string(),
        expected,
    };
    if matches!(literal, Literal::Null) {
        return Err(invalid("non-null value"));
    }
    match field {
        PhysicalField::StringValue | PhysicalField::MimetypeStr => match data_type {
            DataType::Date | DataType::DateTime => {
                let Literal::String(text) = literal else {
                    return Err(invalid("date"));
                };
                normalize_datetime(text, data_type == DataType::Date)
                    .map(PhysicalLiteral::String)
                    .ok_or_else(|| invalid("date"))
            }
            DataType::Boolean => to_bool(literal)
                .map(|b| PhysicalLiteral::String(b.to_string()))
                .ok_or_else(|| invalid("boolean")),
            DataType::Float | DataType::Double => to_double(literal)
                .map(|d| PhysicalLiteral::String(d.to_string()))
                .ok_or_else(|| invalid("number")),
            _ => Ok(PhysicalLiteral::String(literal.to_string())),
        },
        PhysicalField::LongValue | PhysicalField::ContentSize => to_long(literal)
            .map(PhysicalLiteral::Long)
            .ok_or_else(|| invalid("integer")),
        PhysicalField::FloatValue | PhysicalField::DoubleValue => to_double(literal)
            .map(PhysicalLiteral::Double)
            .ok_or_else(|| invalid("number")),
        PhysicalField::BooleanValue => to_bool(literal)
            .map(PhysicalLiteral::Boolean)
            .ok_or_else(|| invalid("boolean")),
    }
}

/// Sorts and deduplicates membership values by their canonical key.
pub fn canonicalize(values: &mut Vec<PhysicalLiteral>) {
    values.sort_by_cached_key(PhysicalLiteral::sort_key);
    values.dedup_by(|a, b| a.sort_key() == b.sort_key());
}

/// Smallest float past the `i64` range; `i64::MAX` itself is not representable.
const LONG_BOUND: f64 = 9_223_372_036_854_775_808.0;

fn to_long(literal: &Literal) -> Option<i64> {
    match literal {
        Literal::Int(v) => Some(*v),
        Literal::Float(v) if v.fract() == 0.0 && (-LONG_BOUND..LONG_BOUND).contains(v) => {
            Some(*v as i64)
        }
        Literal::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn to_double(literal: &Literal) -> Option<f64> {
    let value = match literal {
        Literal::Int(v) => *v as f64,
        Literal::Float(v) => *v,
        Literal::String(text) => text.trim().parse().ok()?,
        _ => return None,
    };
    value.is_finite().then_some(value)
}

fn to_bool(literal: &Literal) -> Option<bool> {
    match literal {
        Literal::Bool(v) => Some(*v),
        Literal::String(text) if text.eq_ignore_ascii_case("true") => Some(true),
        Literal::String(text) if text.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}

fn normalize_datetime(text: &str, date_only: bool) -> Option<String> {
    let parsed = OffsetDateTime::parse(text, &Rfc3339)
        .ok()
        .or_else(|| {
            Date::parse(text, DATE_ONLY)
                .ok()
                .map(|d| d.midnight().assume_utc())
        })?
        .to_offset(UtcOffset::UTC);
    let value = if date_only {
        parsed.date().midnight().assume_utc()
    } else {
        parsed
    };
    value.format(CANONICAL_DATETIME).ok()
}
