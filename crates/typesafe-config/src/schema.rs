//! Schema declaration for typed configuration structs.
//!
//! A schema mirrors the shape of a `serde` struct: named fields with a kind,
//! an optional default and optional constraints. The loader uses it to
//! resolve env/CLI keys, fill defaults, coerce string values and report every
//! failing field before handing the mapping to serde.

use crate::key_path::KEY_DELIMITER;
use crate::loader::{self, LoadOptions};
use crate::{Config, ConfigError};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt::{self, Write as _};

/// A typed configuration struct that can be loaded from layered sources.
pub trait ConfigSchema: Serialize + DeserializeOwned {
    /// Describe the fields of this struct.
    fn schema() -> SchemaDef;

    /// Load this config from the sources named in `options`.
    fn load(options: &LoadOptions) -> Result<Config<Self>, ConfigError> {
        loader::load(options)
    }
}

/// How keys that the schema does not declare are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownKeyPolicy {
    /// Drop unknown keys without a trace.
    Ignore,
    /// Drop unknown keys and log a warning for each.
    #[default]
    Warn,
    /// Report unknown keys as validation errors.
    Reject,
}

/// Declared shape of a config struct.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaDef {
    name: String,
    fields: Vec<Field>,
    read_only: bool,
    unknown_keys: UnknownKeyPolicy,
}

impl SchemaDef {
    /// Start a schema; read-only by default.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            read_only: true,
            unknown_keys: UnknownKeyPolicy::default(),
        }
    }

    /// Append a field.
    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Keep loaded instances writable (re-validated on every write).
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Set the policy for undeclared keys.
    pub fn unknown_keys(mut self, policy: UnknownKeyPolicy) -> Self {
        self.unknown_keys = policy;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn unknown_key_policy(&self) -> UnknownKeyPolicy {
        self.unknown_keys
    }

    /// Find a field by exact name.
    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Find a field by name, ignoring ASCII case.
    pub fn get_ignore_case(&self, name: &str) -> Option<&Field> {
        self.get(name).or_else(|| {
            self.fields
                .iter()
                .find(|field| field.name.eq_ignore_ascii_case(name))
        })
    }

    /// Reject declarations the loader cannot address unambiguously.
    pub fn check(&self) -> Result<(), ConfigError> {
        let mut seen: Vec<String> = Vec::new();
        for field in &self.fields {
            if field.name.is_empty() {
                return Err(self.invalid("field with an empty name"));
            }
            if field.name.contains(KEY_DELIMITER) || field.name.contains('.') {
                return Err(self.invalid(&format!(
                    "field '{}' contains a reserved delimiter ('{KEY_DELIMITER}' or '.')",
                    field.name
                )));
            }
            let folded = field.name.to_ascii_lowercase();
            if seen.contains(&folded) {
                return Err(self.invalid(&format!(
                    "fields named '{}' differ only by case",
                    field.name
                )));
            }
            seen.push(folded);
            if let Some(nested) = field.kind.inner_schema() {
                nested.check()?;
            }
        }
        Ok(())
    }

    /// Flat list of every declared field, nested ones included.
    pub fn metadata(&self) -> Vec<FieldMeta> {
        let mut out = Vec::new();
        collect_metadata(self, "", &mut out);
        out
    }

    /// Human readable listing of every field, its type and default.
    pub fn help(&self) -> String {
        let mut out = String::new();
        for meta in self.metadata() {
            let _ = writeln!(out, "{} / {}", meta.name, meta.full_name);
            if !meta.description.is_empty() {
                let _ = writeln!(out, "  {}", meta.description);
            }
            let default = meta
                .default
                .as_ref()
                .map(Value::to_string)
                .unwrap_or_else(|| "<required>".to_string());
            let _ = writeln!(out, "  type={} | default={}", meta.type_name, default);
        }
        out
    }

    fn invalid(&self, message: &str) -> ConfigError {
        ConfigError::InvalidSchema {
            schema: self.name.clone(),
            message: message.to_string(),
        }
    }
}

fn collect_metadata(schema: &SchemaDef, prefix: &str, out: &mut Vec<FieldMeta>) {
    for field in &schema.fields {
        let full_name = if prefix.is_empty() {
            field.name.clone()
        } else {
            format!("{prefix}{KEY_DELIMITER}{}", field.name)
        };
        out.push(FieldMeta {
            model: schema.name.clone(),
            name: field.name.clone(),
            full_name: full_name.clone(),
            type_name: field.kind.to_string(),
            description: field.description.clone(),
            default: field.default.clone(),
        });
        if let Some(nested) = field.kind.inner_schema() {
            collect_metadata(nested, &full_name, out);
        }
    }
}

/// One row of [`SchemaDef::metadata`].
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMeta {
    /// Schema that declares the field.
    pub model: String,
    pub name: String,
    /// Path from the root joined with `__`, as used by env/CLI keys.
    pub full_name: String,
    pub type_name: String,
    pub description: String,
    pub default: Option<Value>,
}

/// Semantic type of a field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    String,
    Integer,
    Float,
    Bool,
    List(Box<FieldKind>),
    Map(Box<FieldKind>),
    Nested(SchemaDef),
}

impl FieldKind {
    /// Strings, numbers and booleans; the only kinds env/CLI can set.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            FieldKind::String | FieldKind::Integer | FieldKind::Float | FieldKind::Bool
        )
    }

    pub fn nested_schema(&self) -> Option<&SchemaDef> {
        match self {
            FieldKind::Nested(schema) => Some(schema),
            _ => None,
        }
    }

    /// Nested schema of this kind or of its list/map items.
    pub fn inner_schema(&self) -> Option<&SchemaDef> {
        match self {
            FieldKind::List(item) | FieldKind::Map(item) => item.nested_schema(),
            kind => kind.nested_schema(),
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::String => f.write_str("string"),
            FieldKind::Integer => f.write_str("integer"),
            FieldKind::Float => f.write_str("float"),
            FieldKind::Bool => f.write_str("bool"),
            FieldKind::List(inner) => write!(f, "list[{inner}]"),
            FieldKind::Map(inner) => write!(f, "map[{inner}]"),
            FieldKind::Nested(schema) => f.write_str(&schema.name),
        }
    }
}

/// Value constraint checked after type coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// Minimum length of a string (chars) or list (entries).
    MinLength(usize),
    /// Maximum length of a string (chars) or list (entries).
    MaxLength(usize),
    /// Inclusive lower bound for numbers.
    Minimum(f64),
    /// Inclusive upper bound for numbers.
    Maximum(f64),
    /// Allowed string values.
    OneOf(Vec<String>),
}

/// A single declared field.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    name: String,
    kind: FieldKind,
    default: Option<Value>,
    optional: bool,
    description: String,
    constraints: Vec<Constraint>,
}

impl Field {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            default: None,
            optional: false,
            description: String::new(),
            constraints: Vec::new(),
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::String)
    }

    /// Integer field, validated as `i64`. When the struct uses a narrower
    /// type (`u16`, `u8`), declare matching `minimum`/`maximum` bounds;
    /// otherwise an out-of-range value fails later as `ConfigError::Decode`
    /// instead of a field error.
    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Integer)
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Float)
    }

    pub fn bool(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Bool)
    }

    pub fn list(name: impl Into<String>, item: FieldKind) -> Self {
        Self::new(name, FieldKind::List(Box::new(item)))
    }

    pub fn map(name: impl Into<String>, value: FieldKind) -> Self {
        Self::new(name, FieldKind::Map(Box::new(value)))
    }

    /// Field whose type is another config struct.
    pub fn nested<T: ConfigSchema>(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Nested(T::schema()))
    }

    /// Value used when no source provides one; makes the field not required.
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Allow the field to be absent or null (decodes to `None`).
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn min_length(self, len: usize) -> Self {
        self.constraint(Constraint::MinLength(len))
    }

    pub fn max_length(self, len: usize) -> Self {
        self.constraint(Constraint::MaxLength(len))
    }

    pub fn minimum(self, bound: f64) -> Self {
        self.constraint(Constraint::Minimum(bound))
    }

    pub fn maximum(self, bound: f64) -> Self {
        self.constraint(Constraint::Maximum(bound))
    }

    pub fn one_of<I, S>(self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.constraint(Constraint::OneOf(
            values.into_iter().map(Into::into).collect(),
        ))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    /// No default and not optional.
    pub fn is_required(&self) -> bool {
        self.default.is_none() && !self.optional
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }
}
