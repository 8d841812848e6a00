//! Command-line layer (`--tsc_login__username=root`).
//!
//! Arguments are parsed by hand rather than with clap: the set of flags is
//! derived from the schema at runtime and unrelated arguments belonging to
//! the host program must pass through untouched.

use super::{Source, drop_shadowed_key, strip_prefix_ignore_case};
use crate::key_path::{KeyPath, Resolution};
use crate::loader::ConfigLayerSource;
use crate::schema::SchemaDef;
use crate::ConfigError;
use log::{debug, warn};
use serde_json::{Map, Value};

/// Reads `--<prefix><key>=<value>` and `--<prefix><key> <value>` arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliSource {
    prefix: String,
    args: Option<Vec<String>>,
}

impl CliSource {
    /// Read from the process arguments (program name excluded).
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            args: None,
        }
    }

    /// Read from the given arguments instead of the process arguments.
    pub fn with_args<S: Into<String>>(mut self, args: impl IntoIterator<Item = S>) -> Self {
        self.args = Some(args.into_iter().map(Into::into).collect());
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn args(&self) -> Vec<String> {
        match &self.args {
            Some(args) => args.clone(),
            None => std::env::args_os()
                .skip(1)
                .filter_map(|arg| arg.into_string().ok())
                .collect(),
        }
    }
}

impl Source for CliSource {
    fn layer(&self) -> ConfigLayerSource {
        ConfigLayerSource::Cli
    }

    fn origin(&self) -> String {
        format!("cli(prefix=--{})", self.prefix)
    }

    fn read(&self, schema: &SchemaDef) -> Result<Option<Value>, ConfigError> {
        let flag_prefix = format!("--{}", self.prefix);
        let args = self.args();
        let mut out = Map::new();
        let mut loaded = Vec::new();
        let mut ignored = Vec::new();

        let mut idx = 0;
        while idx < args.len() {
            let arg = &args[idx];
            idx += 1;
            let Some(body) = strip_prefix_ignore_case(arg, &flag_prefix) else {
                ignored.push(arg.as_str());
                continue;
            };
            let (key, value) = match body.split_once('=') {
                Some((key, value)) => (key, Some(value.to_string())),
                None => match args.get(idx) {
                    Some(next) if !next.starts_with("--") => {
                        idx += 1;
                        (body, Some(next.clone()))
                    }
                    _ => (body, None),
                },
            };
            let flag = &arg[..flag_prefix.len() + key.len()];
            let path = KeyPath::parse(key)?;

            match path.resolve(schema) {
                Resolution::Field { kind, path } if !kind.is_scalar() => {
                    return Err(ConfigError::UnsupportedCliField {
                        flag: flag.to_string(),
                        field: path.to_dotted(),
                    });
                }
                resolved => {
                    let Some(value) = value else {
                        warn!("cli argument {flag} has no value, skipped");
                        continue;
                    };
                    let path = match resolved {
                        Resolution::Field { path, .. } => {
                            loaded.push(flag);
                            path
                        }
                        Resolution::Unknown { path } => {
                            debug!("cli argument {flag} does not match a field ({})", path.to_dotted());
                            path
                        }
                        Resolution::Shadowed { path } => {
                            drop_shadowed_key(schema, flag, &path)?;
                            continue;
                        }
                    };
                    path.insert_into(&mut out, Value::String(value));
                }
            }
        }

        debug!(
            "data loaded from cli arguments (prefix=--{}): [{}], ignored [{}]",
            self.prefix,
            loaded.join(", "),
            ignored.join(", ")
        );
        Ok(Some(Value::Object(out)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Field, FieldKind};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn schema() -> SchemaDef {
        SchemaDef::new("App")
            .field(Field::string("version"))
            .field(Field::bool("debug"))
            .field(Field::map("labels", FieldKind::String))
            .field(Field::new(
                "login",
                FieldKind::Nested(
                    SchemaDef::new("Login")
                        .field(Field::string("username"))
                        .field(Field::list("items", FieldKind::String)),
                ),
            ))
    }

    fn read(args: &[&str]) -> Result<Value, ConfigError> {
        CliSource::new("tsc_")
            .with_args(args.iter().copied())
            .read(&schema())
            .map(|value| value.expect("mapping"))
    }

    #[test]
    fn parses_equals_and_separate_value_forms() {
        let value = read(&["--tsc_version=1.2", "--tsc_login__username", "root"]).expect("read");
        assert_eq!(value, json!({"version": "1.2", "login": {"username": "root"}}));
    }

    #[test]
    fn flags_match_case_insensitively() {
        let value = read(&["--TSC_Login__UserName=root"]).expect("read");
        assert_eq!(value, json!({"login": {"username": "root"}}));
    }

    #[test]
    fn unrelated_arguments_pass_through() {
        let value = read(&["serve", "--verbose", "-x", "--tsc_debug=true"]).expect("read");
        assert_eq!(value, json!({"debug": "true"}));
    }

    #[test]
    fn flag_without_value_is_skipped() {
        let value = read(&["--tsc_debug", "--tsc_version=2"]).expect("read");
        assert_eq!(value, json!({"version": "2"}));
    }

    #[test]
    fn list_field_is_rejected() {
        let err = read(&["--tsc_login__items=a,b"]).unwrap_err();
        match err {
            ConfigError::UnsupportedCliField { flag, field } => {
                assert_eq!(flag, "--tsc_login__items");
                assert_eq!(field, "login.items");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn map_field_is_rejected_even_without_value() {
        let err = read(&["--tsc_labels"]).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedCliField { .. }));
    }

    #[test]
    fn empty_key_is_rejected() {
        let err = read(&["--tsc_=1"]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidKeyPath { .. }));
    }

    #[test]
    fn flags_below_scalar_fields_are_dropped() {
        let value = read(&["--tsc_version=1", "--tsc_version__major=2"]).expect("read");
        assert_eq!(value, json!({"version": "1"}));
    }

    #[test]
    fn unknown_flags_are_carried_for_the_validator() {
        let value = read(&["--tsc_Timeout=5"]).expect("read");
        assert_eq!(value, json!({"timeout": "5"}));
    }
}
