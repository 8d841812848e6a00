//! Environment variable layer (`TSC_LOGIN__USERNAME=root`).

use super::{Source, drop_shadowed_key, strip_prefix_ignore_case};
use crate::key_path::{KeyPath, Resolution};
use crate::loader::ConfigLayerSource;
use crate::schema::SchemaDef;
use crate::ConfigError;
use log::{debug, warn};
use serde_json::{Map, Value};

/// Prefix used for env vars unless configured otherwise.
pub const DEFAULT_ENV_PREFIX: &str = "TSC_";

/// Reads prefixed environment variables. Values stay strings; the validator
/// coerces them to the declared types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvSource {
    prefix: String,
    vars: Option<Vec<(String, String)>>,
}

impl EnvSource {
    /// Read from the process environment.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            vars: None,
        }
    }

    /// Read from the given variables instead of the process environment.
    pub fn with_vars<K, V>(mut self, vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.vars = Some(
            vars.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        );
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn snapshot(&self) -> Vec<(String, String)> {
        let mut vars = match &self.vars {
            Some(vars) => vars.clone(),
            None => std::env::vars_os()
                .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
                .collect(),
        };
        vars.sort();
        vars
    }
}

impl Default for EnvSource {
    fn default() -> Self {
        Self::new(DEFAULT_ENV_PREFIX)
    }
}

impl Source for EnvSource {
    fn layer(&self) -> ConfigLayerSource {
        ConfigLayerSource::Env
    }

    fn origin(&self) -> String {
        format!("env(prefix={})", self.prefix)
    }

    fn read(&self, schema: &SchemaDef) -> Result<Option<Value>, ConfigError> {
        let mut out = Map::new();
        let mut loaded = Vec::new();
        for (name, value) in self.snapshot() {
            let Some(rest) = strip_prefix_ignore_case(&name, &self.prefix) else {
                continue;
            };
            let key = match KeyPath::parse(rest) {
                Ok(key) => key,
                Err(err) => {
                    warn!("skipping env var {name}: {err}");
                    continue;
                }
            };
            match key.resolve(schema) {
                Resolution::Field { path, kind } if kind.is_scalar() => {
                    path.insert_into(&mut out, Value::String(value));
                    loaded.push(name);
                }
                Resolution::Field { path, kind } => {
                    warn!(
                        "skipping env var {name}: field {} is {kind}, which can only be set from files",
                        path.to_dotted()
                    );
                }
                // An empty prefix matches the whole environment; only
                // declared fields are taken then.
                Resolution::Unknown { .. } | Resolution::Shadowed { .. }
                    if self.prefix.is_empty() => {}
                Resolution::Shadowed { path } => drop_shadowed_key(schema, &name, &path)?,
                Resolution::Unknown { path } => {
                    debug!("env var {name} does not match a field ({})", path.to_dotted());
                    path.insert_into(&mut out, Value::String(value));
                }
            }
        }
        debug!(
            "data loaded from env (prefix={}): [{}]",
            self.prefix,
            loaded.join(", ")
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
            .field(Field::list("hosts", FieldKind::String))
            .field(Field::new(
                "login",
                FieldKind::Nested(SchemaDef::new("Login").field(Field::string("UserName"))),
            ))
    }

    fn read(vars: &[(&str, &str)]) -> Value {
        EnvSource::default()
            .with_vars(vars.iter().copied())
            .read(&schema())
            .expect("read")
            .expect("mapping")
    }

    #[test]
    fn nested_fields_resolve_regardless_of_case() {
        assert_eq!(
            read(&[("TSC_LOGIN__USERNAME", "root")]),
            json!({"login": {"UserName": "root"}})
        );
        assert_eq!(
            read(&[("tsc_Login__userName", "root")]),
            json!({"login": {"UserName": "root"}})
        );
    }

    #[test]
    fn unprefixed_vars_are_ignored() {
        assert_eq!(read(&[("PATH", "/bin"), ("VERSION", "2")]), json!({}));
    }

    #[test]
    fn values_stay_strings() {
        assert_eq!(read(&[("TSC_VERSION", "2")]), json!({"version": "2"}));
    }

    #[test]
    fn list_fields_are_skipped() {
        assert_eq!(read(&[("TSC_HOSTS", "a,b")]), json!({}));
    }

    #[test]
    fn unknown_keys_are_carried_for_the_validator() {
        assert_eq!(read(&[("TSC_TIMEOUT", "5")]), json!({"timeout": "5"}));
    }

    #[test]
    fn keys_below_scalar_fields_are_dropped() {
        assert_eq!(
            read(&[("TSC_VERSION__MAJOR", "2"), ("TSC_VERSION", "1")]),
            json!({"version": "1"})
        );
    }

    #[test]
    fn malformed_keys_are_skipped() {
        assert_eq!(read(&[("TSC_", "x"), ("TSC_LOGIN____USERNAME", "y")]), json!({}));
    }

    #[test]
    fn empty_prefix_only_takes_declared_fields() {
        let value = EnvSource::new("")
            .with_vars([("VERSION", "3"), ("HOME", "/root")])
            .read(&schema())
            .expect("read");
        assert_eq!(value, Some(json!({"version": "3"})));
    }
}
