use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use super::QuarryError;

const TENANT_DELIMITER: char = '@';

/// Store address: a protocol plus a store identifier, e.g. `workspace://SpacesStore`.
///
/// Tenant-qualified stores carry the domain in the identifier: `@acme.com@SpacesStore`.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct StoreRef {
    protocol: String,
    identifier: String,
}

impl StoreRef {
    /// Builds a store reference.
    pub fn new(protocol: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            protocol: protocol.into(),
            identifier: identifier.into(),
        }
    }

    /// Store protocol (`workspace`, `archive`, ...).
    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    /// Raw identifier, including any tenant qualifier.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Tenant domain encoded in the identifier, if any.
    pub fn tenant_domain(&self) -> Option<&str> {
        let rest = self.identifier.strip_prefix(TENANT_DELIMITER)?;
        let (domain, _) = rest.split_once(TENANT_DELIMITER)?;
        Some(domain)
    }

    /// Identifier with the tenant qualifier removed.
    pub fn base_identifier(&self) -> &str {
        match self.identifier.strip_prefix(TENANT_DELIMITER) {
            Some(rest) => rest
                .split_once(TENANT_DELIMITER)
                .map(|(_, base)| base)
                .unwrap_or(&self.identifier),
            None => &self.identifier,
        }
    }

    /// Returns this store qualified with `domain`; already-qualified stores are unchanged.
    pub fn with_tenant(&self, domain: &str) -> Self {
        if self.tenant_domain().is_some() || domain.is_empty() {
            return self.clone();
        }
        StoreRef::new(
            self.protocol.clone(),
            format!("{TENANT_DELIMITER}{domain}{TENANT_DELIMITER}{}", self.identifier),
        )
    }
}

impl fmt::Display for StoreRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.protocol, self.identifier)
    }
}

/// Reference to one object instance: store plus unique id.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ObjectRef {
    store: StoreRef,
    id: String,
}

impl ObjectRef {
    /// Builds an object reference.
    pub fn new(store: StoreRef, id: impl Into<String>) -> Self {
        Self {
            store,
            id: id.into(),
        }
    }

    /// Owning store.
    pub fn store(&self) -> &StoreRef {
        &self.store
    }

    /// Object id within the store.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns this reference qualified with `domain` unless it already carries a tenant.
    pub fn with_tenant(&self, domain: &str) -> Self {
        ObjectRef::new(self.store.with_tenant(domain), self.id.clone())
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.store, self.id)
    }
}

impl FromStr for ObjectRef {
    type Err = QuarryError;

    /// Parses `protocol://identifier/id`, dropping a trailing `;version` label.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (protocol, rest) = s
            .split_once("://")
            .ok_or_else(|| QuarryError::InvalidOwned(format!("'{s}' is not an object reference")))?;
        let (identifier, id) = rest
            .split_once('/')
            .ok_or_else(|| QuarryError::InvalidOwned(format!("'{s}' has no object id")))?;
        let id = id.split(';').next().unwrap_or_default();
        if protocol.is_empty() || identifier.is_empty() || id.is_empty() || id.contains('/') {
            return Err(QuarryError::InvalidOwned(format!(
                "'{s}' is not an object reference"
            )));
        }
        Ok(ObjectRef::new(StoreRef::new(protocol, identifier), id))
    }
}

impl Serialize for ObjectRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ObjectRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}
