//! Content configuration

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::entry::DEFAULT_LOCALE;
use crate::error::ConfigError;
use crate::tree::{ARRAY_INDEX_CEILING, DEFAULT_MAX_ARRAY_INDEX};

/// How the write path treats an edit key that carries neither the
/// `<pageId>.` nor the `__shared__.` prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnprefixedKeyPolicy {
    /// Store under the page being edited.
    #[default]
    Page,
    /// Store in the shared namespace (older editor builds prefixed every
    /// page key, so anything unprefixed was shared).
    Shared,
}

impl FromStr for UnprefixedKeyPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "page" => Ok(UnprefixedKeyPolicy::Page),
            "shared" => Ok(UnprefixedKeyPolicy::Shared),
            other => Err(ConfigError::InvalidValue {
                field: "unprefixed_keys".to_string(),
                value: other.to_string(),
                reason: "expected 'page' or 'shared'".to_string(),
            }),
        }
    }
}

/// Settings for tree assembly and edit resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentConfig {
    /// Locale written by edits and served when a request names none.
    pub default_locale: String,
    pub unprefixed_keys: UnprefixedKeyPolicy,
    /// Largest array index a key may address.
    pub max_array_index: usize,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            default_locale: DEFAULT_LOCALE.to_string(),
            unprefixed_keys: UnprefixedKeyPolicy::Page,
            max_array_index: DEFAULT_MAX_ARRAY_INDEX,
        }
    }
}

impl ContentConfig {
    /// Load from environment variables.
    ///
    /// - `VITRINE_DEFAULT_LOCALE` (default: pt-BR)
    /// - `VITRINE_UNPREFIXED_KEYS`: "page" or "shared" (default: page)
    /// - `VITRINE_MAX_ARRAY_INDEX` (default: 1024, at most 65535)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let default_locale = std::env::var("VITRINE_DEFAULT_LOCALE")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.default_locale);

        let unprefixed_keys = match std::env::var("VITRINE_UNPREFIXED_KEYS") {
            Ok(raw) => raw.parse()?,
            Err(_) => defaults.unprefixed_keys,
        };

        let max_array_index = match std::env::var("VITRINE_MAX_ARRAY_INDEX") {
            Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                field: "max_array_index".to_string(),
                value: raw.clone(),
                reason: "expected a non-negative integer".to_string(),
            })?,
            Err(_) => defaults.max_array_index,
        };

        let config = Self {
            default_locale,
            unprefixed_keys,
            max_array_index,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_locale.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "default_locale".to_string(),
                value: self.default_locale.clone(),
                reason: "must not be empty".to_string(),
            });
        }
        if self.max_array_index > ARRAY_INDEX_CEILING {
            return Err(ConfigError::InvalidValue {
                field: "max_array_index".to_string(),
                value: self.max_array_index.to_string(),
                reason: format!("must be at most {}", ARRAY_INDEX_CEILING),
            });
        }
        Ok(())
    }

    pub fn with_unprefixed_keys(mut self, policy: UnprefixedKeyPolicy) -> Self {
        self.unprefixed_keys = policy;
        self
    }

    pub fn with_default_locale(mut self, locale: impl Into<String>) -> Self {
        self.default_locale = locale.into();
        self
    }

    pub fn with_max_array_index(mut self, max: usize) -> Self {
        self.max_array_index = max;
        self
    }
}
