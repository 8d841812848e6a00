//! Flat key names (`login__username`) to nested key paths and back.

use crate::ConfigError;
use crate::schema::{FieldKind, SchemaDef};
use serde_json::{Map, Value};

/// Delimiter between nesting levels in env and CLI keys.
pub const KEY_DELIMITER: &str = "__";

/// Ordered field names from the root to a leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPath {
    segments: Vec<String>,
}

/// Outcome of matching a key path against a schema.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<'a> {
    /// The path names a declared field; segments use the schema's casing.
    Field { path: KeyPath, kind: &'a FieldKind },
    /// The path is not declared. The matched prefix uses the schema's
    /// casing, the rest is lower-cased.
    Unknown { path: KeyPath },
    /// The path continues below a field that has no nested schema. It can
    /// not be stored without replacing that field's value.
    Shadowed { path: KeyPath },
}

impl KeyPath {
    /// Parse a `__`-joined key such as `login__username`.
    pub fn parse(flat: &str) -> Result<Self, ConfigError> {
        Self::split(flat, KEY_DELIMITER)
    }

    /// Parse a `.`-joined key such as `login.username`.
    pub fn parse_dotted(dotted: &str) -> Result<Self, ConfigError> {
        Self::split(dotted, ".")
    }

    fn split(key: &str, delimiter: &str) -> Result<Self, ConfigError> {
        if key.is_empty() {
            return Err(invalid(key, "empty key"));
        }
        let segments: Vec<String> = key.split(delimiter).map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return Err(invalid(key, "empty segment"));
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn leaf(&self) -> &str {
        // parse guarantees at least one segment
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    pub fn to_flat(&self) -> String {
        self.segments.join(KEY_DELIMITER)
    }

    pub fn to_dotted(&self) -> String {
        self.segments.join(".")
    }

    /// Match every segment case-insensitively, walking nested schemas.
    pub fn resolve<'a>(&self, schema: &'a SchemaDef) -> Resolution<'a> {
        let mut current = schema;
        let mut canonical = Vec::with_capacity(self.segments.len());
        for (idx, segment) in self.segments.iter().enumerate() {
            let Some(field) = current.get_ignore_case(segment) else {
                return Resolution::Unknown {
                    path: self.unmatched(canonical, idx),
                };
            };
            canonical.push(field.name().to_string());
            if idx + 1 == self.segments.len() {
                return Resolution::Field {
                    path: KeyPath {
                        segments: canonical,
                    },
                    kind: field.kind(),
                };
            }
            match field.kind().nested_schema() {
                Some(nested) => current = nested,
                None => {
                    return Resolution::Shadowed {
                        path: self.unmatched(canonical, idx + 1),
                    };
                }
            }
        }
        Resolution::Unknown {
            path: self.unmatched(canonical, self.segments.len()),
        }
    }

    /// Canonical prefix followed by the lower-cased unmatched segments.
    fn unmatched(&self, mut canonical: Vec<String>, from: usize) -> KeyPath {
        canonical.extend(
            self.segments[from..]
                .iter()
                .map(|segment| segment.to_ascii_lowercase()),
        );
        KeyPath {
            segments: canonical,
        }
    }

    /// Build a mapping holding `value` at this path and nothing else.
    pub fn into_nested(self, value: Value) -> Value {
        self.segments
            .into_iter()
            .rev()
            .fold(value, |inner, segment| {
                let mut map = Map::new();
                map.insert(segment, inner);
                Value::Object(map)
            })
    }

    /// Insert `value` at this path, creating or replacing intermediate maps.
    pub fn insert_into(&self, target: &mut Map<String, Value>, value: Value) {
        let (leaf, parents) = match self.segments.split_last() {
            Some(split) => split,
            None => return,
        };
        let mut current = target;
        for segment in parents {
            let slot = current
                .entry(segment.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            let Value::Object(map) = slot else {
                return;
            };
            current = map;
        }
        current.insert(leaf.clone(), value);
    }
}

fn invalid(key: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidKeyPath {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Field;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn schema() -> SchemaDef {
        SchemaDef::new("App")
            .field(Field::string("version"))
            .field(Field::new(
                "login",
                FieldKind::Nested(
                    SchemaDef::new("Login")
                        .field(Field::string("UserName"))
                        .field(Field::list("items", FieldKind::String)),
                ),
            ))
    }

    #[test]
    fn parses_flat_and_dotted_keys() {
        let flat = KeyPath::parse("login__username").expect("flat");
        let dotted = KeyPath::parse_dotted("login.username").expect("dotted");
        assert_eq!(flat, dotted);
        assert_eq!(flat.to_flat(), "login__username");
        assert_eq!(flat.to_dotted(), "login.username");
        assert_eq!(flat.leaf(), "username");
    }

    #[test]
    fn rejects_empty_paths_and_segments() {
        assert!(matches!(
            KeyPath::parse(""),
            Err(ConfigError::InvalidKeyPath { .. })
        ));
        assert!(KeyPath::parse("login____username").is_err());
        assert!(KeyPath::parse("login__").is_err());
        assert!(KeyPath::parse_dotted(".login").is_err());
    }

    #[test]
    fn resolves_case_insensitively_to_schema_casing() {
        let schema = schema();
        let path = KeyPath::parse("LOGIN__USERNAME").expect("path");
        match path.resolve(&schema) {
            Resolution::Field { path, kind } => {
                assert_eq!(path.to_dotted(), "login.UserName");
                assert_eq!(kind, &FieldKind::String);
            }
            other => panic!("unexpected resolution: {other:?}"),
        }
    }

    #[test]
    fn reports_unknown_paths_with_lowercased_tail() {
        let schema = schema();
        let path = KeyPath::parse("Login__Missing__Deep").expect("path");
        assert_eq!(
            path.resolve(&schema),
            Resolution::Unknown {
                path: KeyPath::parse("login__missing__deep").expect("expected")
            }
        );

        let through_scalar = KeyPath::parse("Version__Major").expect("path");
        assert_eq!(
            through_scalar.resolve(&schema),
            Resolution::Shadowed {
                path: KeyPath::parse("version__major").expect("expected")
            }
        );
    }

    #[test]
    fn builds_nested_mapping_for_path() {
        let path = KeyPath::parse("login__username").expect("path");
        assert_eq!(
            path.into_nested(json!("root")),
            json!({"login": {"username": "root"}})
        );
    }

    #[test]
    fn insert_into_keeps_siblings() {
        let mut target = json!({"login": {"password": "p"}, "version": "1"})
            .as_object()
            .cloned()
            .expect("object");
        KeyPath::parse("login__username")
            .expect("path")
            .insert_into(&mut target, json!("root"));
        assert_eq!(
            Value::Object(target),
            json!({"login": {"password": "p", "username": "root"}, "version": "1"})
        );
    }
}
