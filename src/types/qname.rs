use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use super::QuarryError;

/// Namespace-qualified name, rendered as `{uri}local`.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct QName {
    namespace: String,
    local: String,
}

impl QName {
    /// Builds a qualified name from a namespace uri and a local name.
    pub fn new(namespace: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            local: local.into(),
        }
    }

    /// Namespace uri.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Local part.
    pub fn local_name(&self) -> &str {
        &self.local
    }

    /// Parses either `{uri}local` or `prefix:local`, resolving prefixes with `lookup`.
    ///
    /// Returns `Ok(None)` when the prefix is not registered.
    pub fn parse_with<F>(text: &str, lookup: F) -> Result<Option<Self>, QuarryError>
    where
        F: FnOnce(&str) -> Option<String>,
    {
        if text.starts_with('{') {
            return text.parse().map(Some);
        }
        let Some((prefix, local)) = text.split_once(':') else {
            return Err(QuarryError::InvalidOwned(format!(
                "qualified name '{text}' has no namespace prefix"
            )));
        };
        if local.is_empty() {
            return Err(QuarryError::InvalidOwned(format!(
                "qualified name '{text}' has an empty local name"
            )));
        }
        Ok(lookup(prefix).map(|uri| QName::new(uri, local)))
    }

    /// Renders the name with the given prefix, e.g. `cm:name`.
    pub fn to_prefixed(&self, prefix: &str) -> String {
        format!("{prefix}:{}", self.local)
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}{}", self.namespace, self.local)
    }
}

impl FromStr for QName {
    type Err = QuarryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s.strip_prefix('{').ok_or_else(|| {
            QuarryError::InvalidOwned(format!("'{s}' is not of the form {{uri}}local"))
        })?;
        let (uri, local) = rest.split_once('}').ok_or_else(|| {
            QuarryError::InvalidOwned(format!("'{s}' is missing the closing brace"))
        })?;
        if local.is_empty() {
            return Err(QuarryError::InvalidOwned(format!(
                "qualified name '{s}' has an empty local name"
            )));
        }
        Ok(QName::new(uri, local))
    }
}

impl Serialize for QName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for QName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}
