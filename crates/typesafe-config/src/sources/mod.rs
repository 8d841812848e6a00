//! Readers that turn one configuration origin into a raw mapping.

mod cli;
mod env;
mod file;

pub use cli::CliSource;
pub use env::{DEFAULT_ENV_PREFIX, EnvSource};
pub use file::{FileFormat, FileSource};

use crate::key_path::KeyPath;
use crate::loader::ConfigLayerSource;
use crate::schema::{SchemaDef, UnknownKeyPolicy};
use crate::{ConfigError, FieldError, FieldErrorKind, ValidationErrors};
use log::{debug, warn};
use serde_json::Value;

/// One origin of raw configuration values.
pub trait Source {
    /// Which precedence tier the mapping belongs to.
    fn layer(&self) -> ConfigLayerSource;

    /// Where the values come from (a path, a prefix), for diagnostics.
    fn origin(&self) -> String;

    /// Produce the raw mapping; `None` when the origin is absent but optional.
    fn read(&self, schema: &SchemaDef) -> Result<Option<Value>, ConfigError>;
}

/// Values supplied directly from code.
#[derive(Debug, Clone)]
pub struct DataSource {
    value: Value,
}

impl DataSource {
    pub fn new(value: Value) -> Self {
        Self { value }
    }
}

impl Source for DataSource {
    fn layer(&self) -> ConfigLayerSource {
        ConfigLayerSource::Data
    }

    fn origin(&self) -> String {
        "inline data".to_string()
    }

    fn read(&self, _schema: &SchemaDef) -> Result<Option<Value>, ConfigError> {
        match &self.value {
            Value::Object(map) if map.is_empty() => Ok(None),
            Value::Object(_) => Ok(Some(self.value.clone())),
            Value::Null => Ok(None),
            _ => Err(ConfigError::SourceParse {
                source_name: self.origin(),
                message: "expected an object at the root".to_string(),
            }),
        }
    }
}

/// Apply the unknown-key policy to a key that continues below a scalar,
/// list or map field. Such keys never reach the mapping.
pub(crate) fn drop_shadowed_key(
    schema: &SchemaDef,
    key: &str,
    path: &KeyPath,
) -> Result<(), ConfigError> {
    match schema.unknown_key_policy() {
        UnknownKeyPolicy::Ignore => {
            debug!("ignoring {key}: {} is below a non-nested field", path.to_dotted());
            Ok(())
        }
        UnknownKeyPolicy::Warn => {
            warn!("ignoring {key}: {} is below a non-nested field", path.to_dotted());
            Ok(())
        }
        UnknownKeyPolicy::Reject => Err(ValidationErrors {
            schema: schema.name().to_string(),
            errors: vec![FieldError {
                path: path.to_dotted(),
                kind: FieldErrorKind::UnknownKey,
            }],
        }
        .into()),
    }
}

/// Strip `prefix` from the start of `name`, ignoring ASCII case.
pub(crate) fn strip_prefix_ignore_case<'a>(name: &'a str, prefix: &str) -> Option<&'a str> {
    let head = name.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &name[prefix.len()..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn data_source_passes_mapping_through() {
        let schema = SchemaDef::new("App");
        let value = json!({"login": {"username": "a"}});
        let read = DataSource::new(value.clone()).read(&schema).expect("read");
        assert_eq!(read, Some(value));
        assert_eq!(DataSource::new(json!({})).read(&schema).expect("read"), None);
    }

    #[test]
    fn data_source_rejects_non_objects() {
        let schema = SchemaDef::new("App");
        let err = DataSource::new(json!([1])).read(&schema).unwrap_err();
        assert!(matches!(err, ConfigError::SourceParse { .. }));
    }

    #[test]
    fn shadowed_keys_follow_policy() {
        let path = KeyPath::parse("version__major").expect("path");
        let schema = SchemaDef::new("App").unknown_keys(UnknownKeyPolicy::Ignore);
        assert!(drop_shadowed_key(&schema, "TSC_VERSION__MAJOR", &path).is_ok());

        let schema = schema.unknown_keys(UnknownKeyPolicy::Reject);
        let err = drop_shadowed_key(&schema, "TSC_VERSION__MAJOR", &path).unwrap_err();
        let ConfigError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert_eq!(
            errors.get("version.major").map(|error| &error.kind),
            Some(&FieldErrorKind::UnknownKey)
        );
    }

    #[test]
    fn strips_prefix_case_insensitively() {
        assert_eq!(strip_prefix_ignore_case("tsc_LOGIN", "TSC_"), Some("LOGIN"));
        assert_eq!(strip_prefix_ignore_case("TS", "TSC_"), None);
        assert_eq!(strip_prefix_ignore_case("PATH", "TSC_"), None);
        assert_eq!(strip_prefix_ignore_case("ä_x", "TSC_"), None);
    }
}
