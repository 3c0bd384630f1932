//! # Locator
//!
//! SPEC §3.3, §6 ("URL / path grammar for the easy interface"). A Locator
//! addresses one block inside a Container: `{base, entity, key,
//! attribute|extra}`.

use jazz_types::{Name, StatusCode};

/// `{base, entity, key, attribute|extra}` per SPEC §3.3.
///
/// `extra` is an opaque container-specific payload (a URL, credentials)
/// used only when Channels synthesises a Locator from a path that is not a
/// plain `Name` triple (SPEC §4.6 "Channels is the only container whose
/// `as_locator` is overridden").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    pub base: Name,
    pub entity: Option<Name>,
    pub key: Option<String>,
    pub attribute: Option<String>,
    pub extra: Option<String>,
}

impl Locator {
    pub fn new(base: Name) -> Self {
        Locator {
            base,
            entity: None,
            key: None,
            attribute: None,
            extra: None,
        }
    }

    /// Parse the easy-interface path grammar `//base/entity[/key[.attribute]]`
    /// (SPEC §6) into a native Locator. Channels overrides this with its own
    /// `as_locator` for paths containing arbitrary characters (URLs,
    /// pipeline names); this is the shared default used by Persisted and
    /// Volatile.
    pub fn parse(path: &str) -> Result<Self, StatusCode> {
        let trimmed = path.trim_start_matches('/');
        let mut parts = trimmed.splitn(3, '/');

        let base_str = parts.next().filter(|s| !s.is_empty()).ok_or_else(|| {
            StatusCode::ParsingNames {
                input: path.to_string(),
            }
        })?;
        let base = Name::new(base_str).map_err(|_| StatusCode::ParsingNames {
            input: path.to_string(),
        })?;

        let entity = match parts.next() {
            Some(s) if !s.is_empty() => Some(Name::new(s).map_err(|_| StatusCode::ParsingNames {
                input: path.to_string(),
            })?),
            _ => None,
        };

        let (key, attribute) = match parts.next() {
            Some(rest) if !rest.is_empty() => match rest.split_once('.') {
                Some((k, a)) => (Some(k.to_string()), Some(a.to_string())),
                None => (Some(rest.to_string()), None),
            },
            _ => (None, None),
        };

        Ok(Locator {
            base,
            entity,
            key,
            attribute,
            extra: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_base_entity_key() {
        let loc = Locator::parse("//lmdb/e/k").unwrap();
        assert_eq!(loc.base.as_str(), "lmdb");
        assert_eq!(loc.entity.as_ref().unwrap().as_str(), "e");
        assert_eq!(loc.key.as_deref(), Some("k"));
        assert!(loc.attribute.is_none());
    }

    #[test]
    fn parses_key_with_attribute() {
        let loc = Locator::parse("//lmdb/e/k.attr").unwrap();
        assert_eq!(loc.key.as_deref(), Some("k"));
        assert_eq!(loc.attribute.as_deref(), Some("attr"));
    }

    #[test]
    fn rejects_empty_path() {
        assert!(Locator::parse("").is_err());
        assert!(Locator::parse("//").is_err());
    }
}
