//! Error types for config loading, validation and mutation.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors returned while loading, validating or mutating config.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required config file does not exist.
    #[error("config source not found: {}", .path.display())]
    SourceNotFound { path: PathBuf },
    /// Reading a config file failed.
    #[error("failed to read config source {}: {error}", .path.display())]
    SourceRead {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },
    /// A source had malformed contents.
    #[error("failed to parse config source {source_name}: {message}")]
    SourceParse {
        source_name: String,
        message: String,
    },
    /// A list or mapping field was addressed from the command line.
    #[error("field '{field}' cannot be set from the command line ({flag}); use a config file")]
    UnsupportedCliField { flag: String, field: String },
    /// A flat or dotted key could not be turned into a key path.
    #[error("invalid key path '{key}': {reason}")]
    InvalidKeyPath { key: String, reason: String },
    /// The schema declaration itself is unusable.
    #[error("invalid schema {schema}: {message}")]
    InvalidSchema { schema: String, message: String },
    /// One or more fields failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    /// Converting the validated mapping into the typed config failed.
    #[error("failed to decode config: {0}")]
    Decode(#[from] serde_json::Error),
    /// A write was attempted on a read-only config.
    #[error("config {schema} is read-only; cannot assign '{field}'")]
    ReadOnlyViolation { schema: String, field: String },
}

/// Every field-level failure found while validating a mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors {
    /// Name of the schema that was validated.
    pub schema: String,
    /// Failures in document order.
    pub errors: Vec<FieldError>,
}

impl ValidationErrors {
    /// Number of failing fields.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// True when no field failed.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Find the first failure reported for a dotted path.
    pub fn get(&self, path: &str) -> Option<&FieldError> {
        self.errors.iter().find(|error| error.path == path)
    }
}

impl std::error::Error for ValidationErrors {}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid config {} ({} error(s)): ",
            self.schema,
            self.errors.len()
        )?;
        for (idx, error) in self.errors.iter().enumerate() {
            if idx > 0 {
                f.write_str(" | ")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

/// A single failing field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Dotted path of the field, with `[idx]` for list entries.
    pub path: String,
    /// What went wrong.
    pub kind: FieldErrorKind,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "field '{}': {}", self.path, self.kind)
    }
}

/// Reason a field failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldErrorKind {
    /// A required field had no value in any source.
    Missing,
    /// The value could not be coerced to the declared type.
    TypeMismatch { expected: String, found: String },
    /// The value violated a declared constraint.
    Constraint(String),
    /// The key is not declared by the schema.
    UnknownKey,
}

impl fmt::Display for FieldErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldErrorKind::Missing => f.write_str("missing required field"),
            FieldErrorKind::TypeMismatch { expected, found } => {
                write!(f, "expected {expected}, found {found}")
            }
            FieldErrorKind::Constraint(message) => f.write_str(message),
            FieldErrorKind::UnknownKey => f.write_str("unknown key"),
        }
    }
}
