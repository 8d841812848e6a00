//! Loaded config instances: read-only by default, or writable with
//! re-validation on every write.

use crate::key_path::{KeyPath, Resolution};
use crate::loader::decode;
use crate::schema::{ConfigSchema, SchemaDef};
use crate::{ConfigError, FieldError, FieldErrorKind, ValidationErrors};
use log::debug;
use serde::Serialize;
use serde_json::Value;
use std::ops::Deref;

/// A loaded configuration. Dereferences to the typed struct.
#[derive(Debug, Clone)]
pub enum Config<T> {
    /// Every write fails with `ReadOnlyViolation`.
    ReadOnly(Frozen<T>),
    /// Writes are validated against the schema before they land.
    Writable(Writable<T>),
}

impl<T: ConfigSchema> Config<T> {
    /// Wrap a validated value according to the schema's read-only flag.
    pub(crate) fn new(value: T, normalized: Value, schema: SchemaDef) -> Self {
        if schema.is_read_only() {
            Config::ReadOnly(Frozen {
                value,
                schema_name: schema.name().to_string(),
            })
        } else {
            Config::Writable(Writable {
                value,
                normalized,
                schema,
            })
        }
    }

    /// Assign a value to the field at a dotted path (`login.username`).
    pub fn set<V: Serialize>(&mut self, path: &str, value: V) -> Result<(), ConfigError> {
        match self {
            Config::ReadOnly(frozen) => frozen.set(path, value),
            Config::Writable(writable) => writable.set(path, value),
        }
    }

    /// Pretty JSON rendering of every field.
    pub fn render(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self.deref())?)
    }
}

impl<T> Config<T> {
    pub fn is_read_only(&self) -> bool {
        matches!(self, Config::ReadOnly(_))
    }

    pub fn schema_name(&self) -> &str {
        match self {
            Config::ReadOnly(frozen) => &frozen.schema_name,
            Config::Writable(writable) => writable.schema.name(),
        }
    }

    pub fn as_writable_mut(&mut self) -> Option<&mut Writable<T>> {
        match self {
            Config::ReadOnly(_) => None,
            Config::Writable(writable) => Some(writable),
        }
    }

    /// Consume the guard and return the plain value. The result is neither
    /// read-only nor re-validated on change.
    pub fn into_inner(self) -> T {
        match self {
            Config::ReadOnly(frozen) => frozen.value,
            Config::Writable(writable) => writable.value,
        }
    }
}

impl<T> Deref for Config<T> {
    type Target = T;

    fn deref(&self) -> &T {
        match self {
            Config::ReadOnly(frozen) => &frozen.value,
            Config::Writable(writable) => &writable.value,
        }
    }
}

/// Read-only config. There is no `DerefMut`.
#[derive(Debug, Clone)]
pub struct Frozen<T> {
    value: T,
    schema_name: String,
}

impl<T> Frozen<T> {
    /// Always fails; the instance itself stays valid.
    pub fn set<V: Serialize>(&self, path: &str, _value: V) -> Result<(), ConfigError> {
        Err(ConfigError::ReadOnlyViolation {
            schema: self.schema_name.clone(),
            field: path.to_string(),
        })
    }
}

impl<T> Deref for Frozen<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

/// Writable config. Not synchronized; wrap it in a lock to share it.
#[derive(Debug, Clone)]
pub struct Writable<T> {
    value: T,
    normalized: Value,
    schema: SchemaDef,
}

impl<T: ConfigSchema> Writable<T> {
    /// Assign one field; on failure the instance is unchanged.
    pub fn set<V: Serialize>(&mut self, path: &str, value: V) -> Result<(), ConfigError> {
        let key = KeyPath::parse_dotted(path)?;
        let canonical = match key.resolve(&self.schema) {
            Resolution::Field { path, .. } => path,
            Resolution::Unknown { path } | Resolution::Shadowed { path } => {
                return Err(ValidationErrors {
                    schema: self.schema.name().to_string(),
                    errors: vec![FieldError {
                        path: path.to_dotted(),
                        kind: FieldErrorKind::UnknownKey,
                    }],
                }
                .into());
            }
        };
        let value = serde_json::to_value(value)?;
        let mut candidate = self.normalized.clone();
        if let Value::Object(map) = &mut candidate {
            canonical.insert_into(map, value);
        }
        self.replace(&candidate)?;
        debug!("{}: assigned {}", self.schema.name(), canonical.to_dotted());
        Ok(())
    }

    /// Mutate the typed value directly, then re-validate it. Rolls back when
    /// the result no longer validates.
    pub fn update<F: FnOnce(&mut T)>(&mut self, mutate: F) -> Result<(), ConfigError> {
        mutate(&mut self.value);
        let candidate = serde_json::to_value(&self.value)?;
        if let Err(err) = self.replace(&candidate) {
            self.value = serde_json::from_value(self.normalized.clone())?;
            return Err(err);
        }
        Ok(())
    }

    fn replace(&mut self, candidate: &Value) -> Result<(), ConfigError> {
        let (value, normalized) =
            decode::<T>(&self.schema, candidate, self.schema.unknown_key_policy())?;
        self.value = value;
        self.normalized = normalized;
        Ok(())
    }
}

impl<T> Deref for Writable<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}
