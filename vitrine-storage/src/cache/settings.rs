//! Cache settings from the environment.

use std::path::PathBuf;
use std::sync::Arc;

use vitrine_core::ConfigError;

use super::lmdb_backend::{LmdbCacheError, LmdbPageCache};
use super::traits::PageCache;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    /// Directory holding the LMDB files.
    pub path: PathBuf,
    pub max_size_mb: usize,
    pub enabled: bool,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from(".vitrine/cache"),
            max_size_mb: 64,
            enabled: true,
        }
    }
}

impl CacheSettings {
    /// Load from environment variables.
    ///
    /// - `VITRINE_CACHE_PATH` (default: .vitrine/cache)
    /// - `VITRINE_CACHE_MAX_MB` (default: 64)
    /// - `VITRINE_CACHE_ENABLED` (default: true)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let path = std::env::var("VITRINE_CACHE_PATH")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.path);

        let max_size_mb = match std::env::var("VITRINE_CACHE_MAX_MB") {
            Ok(raw) => match raw.trim().parse::<usize>() {
                Ok(mb) if mb > 0 => mb,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        field: "cache_max_mb".to_string(),
                        value: raw,
                        reason: "expected a positive integer".to_string(),
                    })
                }
            },
            Err(_) => defaults.max_size_mb,
        };

        let enabled = match std::env::var("VITRINE_CACHE_ENABLED") {
            Ok(raw) => parse_bool(&raw).ok_or_else(|| ConfigError::InvalidValue {
                field: "cache_enabled".to_string(),
                value: raw.clone(),
                reason: "expected true or false".to_string(),
            })?,
            Err(_) => defaults.enabled,
        };

        Ok(Self {
            path,
            max_size_mb,
            enabled,
        })
    }

    /// Open the configured cache, or `None` when caching is disabled.
    pub fn open(&self) -> Result<Option<Arc<dyn PageCache>>, LmdbCacheError> {
        if !self.enabled {
            return Ok(None);
        }
        let cache = LmdbPageCache::new(&self.path, self.max_size_mb)?;
        Ok(Some(Arc::new(cache)))
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool(" off "), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn test_disabled_opens_nothing() {
        let settings = CacheSettings {
            enabled: false,
            ..CacheSettings::default()
        };
        assert!(settings.open().expect("open should succeed").is_none());
    }

    #[test]
    fn test_open_creates_directory() {
        let temp_dir = tempfile::TempDir::new().expect("TempDir creation should succeed");
        let settings = CacheSettings {
            path: temp_dir.path().join("nested").join("cache"),
            max_size_mb: 4,
            enabled: true,
        };
        assert!(settings.open().expect("open should succeed").is_some());
        assert!(settings.path.exists());
    }
}
