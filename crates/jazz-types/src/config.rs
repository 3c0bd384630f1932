//! # Configuration file loading
//!
//! SPEC_FULL.md §10.3, grounded on the original's `load_config_file`
//! (`jazz01_utils/jazz_config.cpp`): a flat `key = value` file, `//` line
//! comments, and `@SECTION` headers that are folded into the key namespace
//! as `Section.key`. Unlike the original, a missing required key is a typed
//! `StatusCode::BadConfig`, not a silently-ignored default.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tracing::warn;

use crate::status::StatusCode;

/// A loaded configuration: every key flattened to `Section.name`.
#[derive(Debug, Clone, Default)]
pub struct Config {
    entries: HashMap<String, String>,
}

impl Config {
    /// Load `path`, stripping `//` comments and folding `@SECTION` markers
    /// into the key namespace. Mirrors `jazzCommons::load_config_file`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StatusCode> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            warn!(path = %path.display(), error = %e, "config file not found");
            StatusCode::BadConfig {
                key: path.display().to_string(),
            }
        })?;

        let mut entries = HashMap::new();
        let mut section = String::new();

        for raw_line in text.lines() {
            let line = match raw_line.find("//") {
                Some(p) => &raw_line[..p],
                None => raw_line,
            };

            if let Some(p) = line.find("@SECTION") {
                section = line[p + "@SECTION".len()..].trim().to_string();
                continue;
            }

            if let Some(p) = line.find('=') {
                let key = line[..p].trim();
                let val = line[p + 1..].trim().trim_matches('"').to_string();
                if key.is_empty() {
                    continue;
                }
                let full_key = if section.is_empty() {
                    key.to_string()
                } else {
                    format!("{section}.{key}")
                };
                entries.insert(full_key, val);
            }
        }

        Ok(Config { entries })
    }

    /// Build a `Config` from an in-memory map, for tests and for callers that
    /// assemble configuration programmatically.
    pub fn from_map(entries: HashMap<String, String>) -> Self {
        Config { entries }
    }

    /// Fetch a required string key.
    pub fn get_string(&self, key: &str) -> Result<&str, StatusCode> {
        self.entries
            .get(key)
            .map(|s| s.as_str())
            .ok_or_else(|| StatusCode::BadConfig { key: key.to_string() })
    }

    /// Fetch an optional string key, falling back to `default`.
    pub fn get_string_or(&self, key: &str, default: &str) -> String {
        self.entries
            .get(key)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }

    /// Fetch a required key parsed as `i64`.
    pub fn get_int(&self, key: &str) -> Result<i64, StatusCode> {
        let raw = self.get_string(key)?;
        raw.parse::<i64>()
            .map_err(|_| StatusCode::BadConfig { key: key.to_string() })
    }

    /// Fetch a required key parsed as `bool` (`true`/`false`, case-insensitive).
    pub fn get_bool(&self, key: &str) -> Result<bool, StatusCode> {
        let raw = self.get_string(key)?;
        match raw.to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            _ => Err(StatusCode::BadConfig { key: key.to_string() }),
        }
    }

    /// Debug-only escape hatch to inject/override a key, mirroring the
    /// original's `debug_config_put`.
    pub fn debug_put(&mut self, key: impl Into<String>, val: impl Into<String>) {
        self.entries.insert(key.into(), val.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sections_and_comments() {
        let text = "@SECTION Storage\nlmdb_path = /var/jazz // trailing comment\n\n@SECTION Net\nport = 8090\n";
        let tmp = tempfile::NamedTempFile::new().unwrap();
        fs::write(tmp.path(), text).unwrap();

        let cfg = Config::load(tmp.path()).unwrap();
        assert_eq!(cfg.get_string("Storage.lmdb_path").unwrap(), "/var/jazz");
        assert_eq!(cfg.get_int("Net.port").unwrap(), 8090);
    }

    #[test]
    fn missing_key_is_bad_config() {
        let cfg = Config::default();
        assert!(matches!(
            cfg.get_string("Nope.missing"),
            Err(StatusCode::BadConfig { .. })
        ));
    }

    #[test]
    fn bool_accepts_true_false_and_digits() {
        let mut map = HashMap::new();
        map.insert("A.flag".to_string(), "TRUE".to_string());
        map.insert("A.other".to_string(), "0".to_string());
        let cfg = Config::from_map(map);
        assert!(cfg.get_bool("A.flag").unwrap());
        assert!(!cfg.get_bool("A.other").unwrap());
    }
}
