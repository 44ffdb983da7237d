//! Plugin configuration.
//!
//! The host hands the plugin its section of the registry configuration,
//! usually YAML. [`AuthConfig`] is that section as written; [`Settings`] is
//! the validated form the plugin runs on.

use std::fmt;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use teamgate_cache::DEFAULT_TTL;
use teamgate_perms::{CatalogFilter, ResolverConfig};
use teamgate_remote::{DEFAULT_ENDPOINT, DEFAULT_MANIFEST_PATH, DEFAULT_PAGE_SIZE};

use crate::error::ConfigError;

/// Largest page the upstream serves.
pub const MAX_PAGE_SIZE: u32 = 100;

/// The plugin's configuration section, as written.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthConfig {
    /// Organization whose members may authenticate. Required.
    pub organization: Option<String>,
    /// Credential with read access to the organization. Required.
    pub token: Option<String>,
    pub repository_pattern: Option<String>,
    pub include_repositories: Option<Vec<String>>,
    pub exclude_repositories: Option<Vec<String>>,
    pub cache_ttl_seconds: Option<u64>,
    pub page_size: Option<u32>,
    pub manifest_path: Option<String>,
    pub endpoint: Option<String>,
}

impl AuthConfig {
    /// Parse a YAML configuration section.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Read an already-parsed configuration section.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        serde_json::from_value(value).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Check every setting and apply defaults.
    pub fn validate(&self) -> Result<Settings, ConfigError> {
        let organization = required(&self.organization, "organization")?;
        let token = required(&self.token, "token")?;

        let pattern = self
            .repository_pattern
            .as_deref()
            .map(Regex::new)
            .transpose()?;

        let cache_ttl = match self.cache_ttl_seconds {
            Some(0) => {
                return Err(ConfigError::Invalid {
                    field: "cacheTtlSeconds",
                    message: "must be positive".to_string(),
                })
            }
            Some(seconds) => Duration::from_secs(seconds),
            None => DEFAULT_TTL,
        };

        let page_size = self.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(ConfigError::Invalid {
                field: "pageSize",
                message: format!("must be between 1 and {MAX_PAGE_SIZE}"),
            });
        }

        let manifest_path = self
            .manifest_path
            .clone()
            .unwrap_or_else(|| DEFAULT_MANIFEST_PATH.to_string());
        if manifest_path.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "manifestPath",
                message: "must not be blank".to_string(),
            });
        }

        Ok(Settings {
            organization,
            token,
            filter: CatalogFilter {
                include: self.include_repositories.clone(),
                exclude: self.exclude_repositories.clone(),
                pattern,
            },
            cache_ttl,
            page_size,
            manifest_path,
            endpoint: self
                .endpoint
                .clone()
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
        })
    }
}

fn required(value: &Option<String>, field: &'static str) -> Result<String, ConfigError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(ConfigError::Missing(field)),
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("organization", &self.organization)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("repository_pattern", &self.repository_pattern)
            .field("include_repositories", &self.include_repositories)
            .field("exclude_repositories", &self.exclude_repositories)
            .field("cache_ttl_seconds", &self.cache_ttl_seconds)
            .field("page_size", &self.page_size)
            .field("manifest_path", &self.manifest_path)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// Validated configuration.
#[derive(Clone)]
pub struct Settings {
    pub organization: String,
    pub token: String,
    pub filter: CatalogFilter,
    pub cache_ttl: Duration,
    pub page_size: u32,
    pub manifest_path: String,
    pub endpoint: String,
}

impl Settings {
    /// Settings with defaults for everything but the required fields.
    pub fn new(organization: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            organization: organization.into(),
            token: token.into(),
            filter: CatalogFilter::default(),
            cache_ttl: DEFAULT_TTL,
            page_size: DEFAULT_PAGE_SIZE,
            manifest_path: DEFAULT_MANIFEST_PATH.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }

    pub fn with_filter(mut self, filter: CatalogFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            manifest_path: self.manifest_path.clone(),
            filter: self.filter.clone(),
            cache_ttl: self.cache_ttl,
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("organization", &self.organization)
            .field("token", &"<redacted>")
            .field("filter", &self.filter)
            .field("cache_ttl", &self.cache_ttl)
            .field("page_size", &self.page_size)
            .field("manifest_path", &self.manifest_path)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}
