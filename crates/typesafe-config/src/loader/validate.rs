//! Schema validation and coercion for merged config mappings.
//!
//! Walks the mapping alongside the schema, fills defaults, coerces string
//! values coming from env/CLI into the declared scalar types and checks
//! constraints. Every failing field is collected; nothing stops at the first
//! error. The output is a normalized mapping ready for serde.

use super::merge::value_kind;
use crate::schema::{ConfigSchema, Constraint, Field, FieldKind, SchemaDef, UnknownKeyPolicy};
use crate::{ConfigError, FieldError, FieldErrorKind, ValidationErrors};
use log::{debug, warn};
use serde_json::{Map, Number, Value};

/// Validate a mapping against a schema using the schema's unknown-key policy.
pub fn validate(schema: &SchemaDef, value: &Value) -> Result<Value, ValidationErrors> {
    validate_with_policy(schema, value, schema.unknown_key_policy())
}

/// Validate a mapping against a schema with an explicit unknown-key policy.
pub fn validate_with_policy(
    schema: &SchemaDef,
    value: &Value,
    policy: UnknownKeyPolicy,
) -> Result<Value, ValidationErrors> {
    let mut validator = Validator {
        schema_name: schema.name(),
        policy,
        errors: Vec::new(),
    };
    let normalized = match value {
        Value::Object(map) => Value::Object(validator.object(schema, map, "")),
        other => {
            validator.mismatch("", "object", other);
            Value::Null
        }
    };
    if validator.errors.is_empty() {
        Ok(normalized)
    } else {
        Err(ValidationErrors {
            schema: schema.name().to_string(),
            errors: validator.errors,
        })
    }
}

/// Validate and decode a mapping into the typed config.
pub(crate) fn decode<T: ConfigSchema>(
    schema: &SchemaDef,
    value: &Value,
    policy: UnknownKeyPolicy,
) -> Result<(T, Value), ConfigError> {
    let normalized = validate_with_policy(schema, value, policy)?;
    let typed = serde_json::from_value(normalized.clone())?;
    Ok((typed, normalized))
}

struct Validator<'a> {
    schema_name: &'a str,
    policy: UnknownKeyPolicy,
    errors: Vec<FieldError>,
}

impl Validator<'_> {
    fn object(&mut self, schema: &SchemaDef, map: &Map<String, Value>, path: &str) -> Map<String, Value> {
        let mut out = Map::new();
        for field in schema.fields() {
            let field_path = join_path(path, field.name());
            match map.get(field.name()) {
                Some(Value::Null) if field.is_optional() => {
                    out.insert(field.name().to_string(), Value::Null);
                }
                Some(value) => {
                    if let Some(value) = self.field(field, value, &field_path) {
                        out.insert(field.name().to_string(), value);
                    }
                }
                None => {
                    if let Some(default) = field.default_value() {
                        if let Some(value) = self.field(field, default, &field_path) {
                            out.insert(field.name().to_string(), value);
                        }
                    } else if field.is_optional() {
                        out.insert(field.name().to_string(), Value::Null);
                    } else {
                        self.push(&field_path, FieldErrorKind::Missing);
                    }
                }
            }
        }

        for key in map.keys() {
            if schema.get(key).is_none() {
                self.unknown(&join_path(path, key));
            }
        }
        out
    }

    fn field(&mut self, field: &Field, value: &Value, path: &str) -> Option<Value> {
        let before = self.errors.len();
        let coerced = self.value(field.kind(), value, path)?;
        for constraint in field.constraints() {
            if let Err(message) = check_constraint(constraint, &coerced) {
                self.push(path, FieldErrorKind::Constraint(message));
            }
        }
        (self.errors.len() == before).then_some(coerced)
    }

    fn value(&mut self, kind: &FieldKind, value: &Value, path: &str) -> Option<Value> {
        let coerced = match kind {
            FieldKind::String => value.as_str().map(|s| Value::String(s.to_string())),
            FieldKind::Integer => coerce_integer(value),
            FieldKind::Float => coerce_float(value),
            FieldKind::Bool => coerce_bool(value),
            FieldKind::List(item) => {
                let Value::Array(entries) = value else {
                    self.mismatch(path, &kind.to_string(), value);
                    return None;
                };
                let before = self.errors.len();
                let items: Vec<Value> = entries
                    .iter()
                    .enumerate()
                    .filter_map(|(idx, entry)| self.value(item, entry, &format!("{path}[{idx}]")))
                    .collect();
                return (self.errors.len() == before).then_some(Value::Array(items));
            }
            FieldKind::Map(item) => {
                let Value::Object(entries) = value else {
                    self.mismatch(path, &kind.to_string(), value);
                    return None;
                };
                let before = self.errors.len();
                let mut out = Map::new();
                for (key, entry) in entries {
                    if let Some(entry) = self.value(item, entry, &join_path(path, key)) {
                        out.insert(key.clone(), entry);
                    }
                }
                return (self.errors.len() == before).then_some(Value::Object(out));
            }
            FieldKind::Nested(schema) => {
                let Value::Object(entries) = value else {
                    self.mismatch(path, schema.name(), value);
                    return None;
                };
                let before = self.errors.len();
                let out = self.object(schema, entries, path);
                return (self.errors.len() == before).then_some(Value::Object(out));
            }
        };
        if coerced.is_none() {
            self.mismatch(path, &kind.to_string(), value);
        }
        coerced
    }

    fn unknown(&mut self, path: &str) {
        match self.policy {
            UnknownKeyPolicy::Ignore => {
                debug!("ignoring unknown config key {path} ({})", self.schema_name)
            }
            UnknownKeyPolicy::Warn => {
                warn!("ignoring unknown config key {path} ({})", self.schema_name)
            }
            UnknownKeyPolicy::Reject => self.push(path, FieldErrorKind::UnknownKey),
        }
    }

    fn mismatch(&mut self, path: &str, expected: &str, found: &Value) {
        let found = match found {
            Value::Object(_) | Value::Array(_) | Value::Null => value_kind(found).to_string(),
            scalar => format!("{} {scalar}", value_kind(scalar)),
        };
        self.push(
            path,
            FieldErrorKind::TypeMismatch {
                expected: expected.to_string(),
                found,
            },
        );
    }

    fn push(&mut self, path: &str, kind: FieldErrorKind) {
        let path = if path.is_empty() { "root" } else { path };
        self.errors.push(FieldError {
            path: path.to_string(),
            kind,
        });
    }
}

/// Accept integers, integral floats and numeric strings.
fn coerce_integer(value: &Value) -> Option<Value> {
    match value {
        Value::Number(number) if number.is_i64() || number.is_u64() => Some(value.clone()),
        Value::Number(number) => number
            .as_f64()
            .filter(|float| float.fract() == 0.0 && fits_i64(*float))
            .map(|float| Value::Number(Number::from(float as i64))),
        Value::String(text) => {
            let text = text.trim();
            text.parse::<i64>()
                .map(Number::from)
                .or_else(|_| text.parse::<u64>().map(Number::from))
                .ok()
                .map(Value::Number)
        }
        _ => None,
    }
}

/// `i64::MAX as f64` rounds up to 2^63, so the upper bound is exclusive.
fn fits_i64(float: f64) -> bool {
    float >= i64::MIN as f64 && float < i64::MAX as f64
}

/// Accept any number and numeric strings.
fn coerce_float(value: &Value) -> Option<Value> {
    match value {
        Value::Number(number) => number.as_f64().and_then(Number::from_f64).map(Value::Number),
        Value::String(text) => text
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number),
        _ => None,
    }
}

/// Accept booleans, 0/1 and the usual truthy/falsy words.
fn coerce_bool(value: &Value) -> Option<Value> {
    match value {
        Value::Bool(_) => Some(value.clone()),
        Value::Number(number) => match number.as_u64() {
            Some(0) => Some(Value::Bool(false)),
            Some(1) => Some(Value::Bool(true)),
            _ => None,
        },
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Some(Value::Bool(true)),
            "false" | "0" | "no" | "off" => Some(Value::Bool(false)),
            _ => None,
        },
        _ => None,
    }
}

fn check_constraint(constraint: &Constraint, value: &Value) -> Result<(), String> {
    match constraint {
        Constraint::MinLength(min) => match length(value) {
            Some(len) if len < *min => Err(format!("length must be at least {min}, got {len}")),
            _ => Ok(()),
        },
        Constraint::MaxLength(max) => match length(value) {
            Some(len) if len > *max => Err(format!("length must be at most {max}, got {len}")),
            _ => Ok(()),
        },
        Constraint::Minimum(min) => match value.as_f64() {
            Some(number) if number < *min => Err(format!("must be >= {min}, got {number}")),
            _ => Ok(()),
        },
        Constraint::Maximum(max) => match value.as_f64() {
            Some(number) if number > *max => Err(format!("must be <= {max}, got {number}")),
            _ => Ok(()),
        },
        Constraint::OneOf(allowed) => match value.as_str() {
            Some(text) if !allowed.iter().any(|candidate| candidate == text) => {
                Err(format!("must be one of [{}], got \"{text}\"", allowed.join(", ")))
            }
            _ => Ok(()),
        },
    }
}

fn length(value: &Value) -> Option<usize> {
    match value {
        Value::String(text) => Some(text.chars().count()),
        Value::Array(items) => Some(items.len()),
        _ => None,
    }
}

/// Join nested paths for error messages.
fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn schema() -> SchemaDef {
        SchemaDef::new("App")
            .field(Field::string("name").min_length(3))
            .field(Field::integer("port").default(8080).minimum(1.0).maximum(65535.0))
            .field(Field::float("weight").default(1.5))
            .field(Field::bool("debug").default(false))
            .field(Field::string("note").optional())
            .field(Field::string("level").default("info").one_of(["info", "debug"]))
            .field(Field::list("hosts", FieldKind::String).default(json!([])))
            .field(Field::map("labels", FieldKind::Integer).default(json!({})))
            .field(Field::new(
                "login",
                FieldKind::Nested(
                    SchemaDef::new("Login")
                        .field(Field::string("username").default("anonym"))
                        .field(Field::string("password")),
                ),
            ))
    }

    #[test]
    fn fills_defaults_and_coerces_strings() {
        let value = json!({
            "name": "demo",
            "port": "9000",
            "weight": "72.5",
            "debug": "YES",
            "login": {"password": "secret"}
        });
        let normalized = validate(&schema(), &value).expect("valid");
        assert_eq!(
            normalized,
            json!({
                "name": "demo",
                "port": 9000,
                "weight": 72.5,
                "debug": true,
                "note": null,
                "level": "info",
                "hosts": [],
                "labels": {},
                "login": {"username": "anonym", "password": "secret"}
            })
        );
    }

    #[test]
    fn collects_every_failure() {
        let value = json!({
            "name": "ab",
            "port": "eighty",
            "debug": 7,
            "level": "trace",
            "hosts": ["a", 3],
            "labels": {"x": "1", "y": "z"},
            "login": {}
        });
        let err = validate(&schema(), &value).unwrap_err();
        let paths: Vec<&str> = err.errors.iter().map(|error| error.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "name",
                "port",
                "debug",
                "level",
                "hosts[1]",
                "labels.y",
                "login.password",
            ]
        );
        assert_eq!(err.get("login.password").map(|e| &e.kind), Some(&FieldErrorKind::Missing));
        assert_eq!(
            err.get("port").map(|e| &e.kind),
            Some(&FieldErrorKind::TypeMismatch {
                expected: "integer".to_string(),
                found: "string \"eighty\"".to_string(),
            })
        );
        assert!(matches!(
            err.get("name").map(|e| &e.kind),
            Some(FieldErrorKind::Constraint(_))
        ));
    }

    #[test]
    fn missing_nested_required_section_is_reported_once() {
        let err = validate(&schema(), &json!({"name": "demo"})).unwrap_err();
        assert_eq!(err.len(), 1);
        assert_eq!(err.errors[0].path, "login");
        assert_eq!(err.errors[0].kind, FieldErrorKind::Missing);
    }

    #[test]
    fn null_is_only_accepted_for_optional_fields() {
        let value = json!({"name": "demo", "note": null, "port": null, "login": {"password": "p"}});
        let err = validate(&schema(), &value).unwrap_err();
        assert_eq!(err.len(), 1);
        assert_eq!(err.errors[0].path, "port");
    }

    #[test]
    fn unknown_keys_follow_policy() {
        let value = json!({"name": "demo", "extra": 1, "login": {"password": "p", "other": 2}});
        let normalized =
            validate_with_policy(&schema(), &value, UnknownKeyPolicy::Ignore).expect("ignored");
        assert!(normalized.get("extra").is_none());
        assert!(validate_with_policy(&schema(), &value, UnknownKeyPolicy::Warn).is_ok());

        let err = validate_with_policy(&schema(), &value, UnknownKeyPolicy::Reject).unwrap_err();
        let unknown: Vec<&str> = err
            .errors
            .iter()
            .filter(|error| error.kind == FieldErrorKind::UnknownKey)
            .map(|error| error.path.as_str())
            .collect();
        assert_eq!(unknown, vec!["login.other", "extra"]);
    }

    #[test]
    fn integral_floats_become_integers() {
        let value = json!({"name": "demo", "port": 8000.0, "login": {"password": "p"}});
        let normalized = validate(&schema(), &value).expect("valid");
        assert_eq!(normalized["port"], json!(8000));
    }

    #[test]
    fn out_of_range_floats_are_not_integers() {
        let schema = SchemaDef::new("Big").field(Field::integer("n"));
        for raw in [json!(1e20), json!(-1e19), json!(9.223372036854775807e18)] {
            let err = validate(&schema, &json!({ "n": raw })).unwrap_err();
            assert!(
                matches!(
                    err.get("n").map(|e| &e.kind),
                    Some(FieldErrorKind::TypeMismatch { .. })
                ),
                "{raw}"
            );
        }
        let normalized = validate(&schema, &json!({"n": -9.0e18})).expect("in range");
        assert_eq!(normalized["n"], json!(-9_000_000_000_000_000_000i64));
    }

    #[test]
    fn non_object_root_is_rejected() {
        let err = validate(&schema(), &json!([1, 2])).unwrap_err();
        assert_eq!(err.errors[0].path, "root");
    }
}
