//! Compiler configuration.
//!
//! Options are read from a TOML file; every field has a default so partial
//! files are valid. Named presets cover the common deployments.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::query::expansion::{policy_by_name, TypeExpansionPolicy};
use crate::query::resolver::ResolverOptions;

/// Tunables of the predicate compiler.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompilerOptions {
    /// Current storage layout (dedicated boolean/float/double columns).
    /// `false` selects the legacy layout. Queries may override it.
    pub support_boolean_float_double: bool,
    /// Largest accepted membership list.
    pub max_in_list: usize,
    /// Type expansion policy name: `hierarchy` or `exact`.
    pub type_expansion: String,
    /// Tenant domain applied to unqualified object references.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_tenant: Option<String>,
    /// Resolver cache capacities.
    pub cache: CacheOptions,
}

/// Resolver cache capacities; zero disables a cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheOptions {
    /// Expanded class entries.
    pub types: usize,
    /// Property definitions.
    pub properties: usize,
    /// Object reference entries.
    pub references: usize,
}

impl Default for CacheOptions {
    fn default() -> Self {
        let defaults = ResolverOptions::default();
        Self {
            types: defaults.type_cache_capacity,
            properties: defaults.property_cache_capacity,
            references: defaults.reference_cache_capacity,
        }
    }
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            support_boolean_float_double: true,
            max_in_list: 1000,
            type_expansion: "hierarchy".to_owned(),
            default_tenant: None,
            cache: CacheOptions::default(),
        }
    }
}

impl CompilerOptions {
    /// Repositories upgraded from the legacy layout.
    pub fn legacy() -> Self {
        Self {
            support_boolean_float_double: false,
            ..Self::default()
        }
    }

    /// Large caches and lists for batch workloads.
    pub fn benchmark() -> Self {
        Self {
            max_in_list: 10_000,
            cache: CacheOptions {
                types: 4096,
                properties: 16_384,
                references: 65_536,
            },
            ..Self::default()
        }
    }

    /// No caching, exact type matching; for validating expansion against a dictionary.
    pub fn strict() -> Self {
        Self {
            type_expansion: "exact".to_owned(),
            cache: CacheOptions {
                types: 0,
                properties: 0,
                references: 0,
            },
            ..Self::default()
        }
    }

    /// Looks up a preset by name.
    pub fn preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "default" => Ok(Self::default()),
            "legacy" => Ok(Self::legacy()),
            "benchmark" => Ok(Self::benchmark()),
            "strict" => Ok(Self::strict()),
            other => Err(ConfigError::UnknownPreset {
                name: other.to_owned(),
            }),
        }
    }

    /// Reads options from `path`, or from the default location when `None`.
    ///
    /// A missing file yields the defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = explicit.map(Path::to_path_buf).or_else(default_config_path);
        let options = match path {
            Some(path) if path.exists() => {
                let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
                    path: path.clone(),
                    source,
                })?;
                toml::from_str(&contents)
                    .map_err(|source| ConfigError::Parse { path, source })?
            }
            _ => Self::default(),
        };
        options.validate()?;
        Ok(options)
    }

    /// Parses options from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let options: Self = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: PathBuf::from("<inline>"),
            source,
        })?;
        options.validate()?;
        Ok(options)
    }

    /// Writes the options to `path`, creating parent directories.
    pub fn persist(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| ConfigError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let serialized =
            toml::to_string_pretty(self).map_err(|source| ConfigError::Serialize { source })?;
        fs::write(path, serialized).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Rejects values the compiler cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_in_list == 0 {
            return Err(ConfigError::Invalid {
                field: "max_in_list",
                reason: "must be at least 1".to_owned(),
            });
        }
        self.expansion_policy().map(|_| ())
    }

    /// Resolver cache capacities.
    pub fn resolver_options(&self) -> ResolverOptions {
        ResolverOptions {
            type_cache_capacity: self.cache.types,
            property_cache_capacity: self.cache.properties,
            reference_cache_capacity: self.cache.references,
        }
    }

    /// Configured type expansion policy.
    pub fn expansion_policy(&self) -> Result<Arc<dyn TypeExpansionPolicy>, ConfigError> {
        policy_by_name(&self.type_expansion).ok_or_else(|| ConfigError::Invalid {
            field: "type_expansion",
            reason: format!("unknown policy '{}'", self.type_expansion),
        })
    }
}

/// Configuration failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read.
    #[error("failed to read compiler config {path}: {source}")]
    Read {
        /// Config path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// File is not valid TOML for [`CompilerOptions`].
    #[error("failed to parse compiler config {path}: {source}")]
    Parse {
        /// Config path.
        path: PathBuf,
        /// Underlying error.
        source: toml::de::Error,
    },
    /// Options could not be rendered.
    #[error("failed to serialize compiler config: {source}")]
    Serialize {
        /// Underlying error.
        source: toml::ser::Error,
    },
    /// File could not be written.
    #[error("failed to write compiler config {path}: {source}")]
    Write {
        /// Config path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// Parent directory could not be created.
    #[error("failed to create config directory {path}: {source}")]
    CreateDir {
        /// Directory path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// A field holds an unusable value.
    #[error("invalid compiler config field '{field}': {reason}")]
    Invalid {
        /// Field name.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
    /// Preset name is not known.
    #[error("preset '{name}' not found")]
    UnknownPreset {
        /// Requested preset.
        name: String,
    },
}

/// Default config location, `<config dir>/quarry/compiler.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|base| base.join("quarry").join("compiler.toml"))
}
