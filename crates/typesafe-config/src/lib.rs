//! Type-safe layered configuration.
//!
//! Declare a schema for a serde struct, then load it from schema defaults,
//! inline data, TOML files, JSON files, prefixed CLI arguments and prefixed
//! environment variables (in that order of precedence). The merged mapping
//! is validated field by field and the result is read-only unless the schema
//! opts out.
//!
//! ```no_run
//! use serde::{Deserialize, Serialize};
//! use typesafe_config::{ConfigSchema, Field, LoadOptions, SchemaDef};
//!
//! #[derive(Serialize, Deserialize)]
//! struct AppConfig {
//!     username: String,
//!     verbose: bool,
//! }
//!
//! impl ConfigSchema for AppConfig {
//!     fn schema() -> SchemaDef {
//!         SchemaDef::new("AppConfig")
//!             .field(Field::string("username").min_length(1))
//!             .field(Field::bool("verbose").default(true))
//!     }
//! }
//!
//! // TSC_USERNAME=root app --tsc_verbose=false
//! let config = AppConfig::load(&LoadOptions::new().toml_file("conf.toml"))?;
//! if config.verbose {
//!     println!("login user {}", config.username);
//! }
//! # Ok::<(), typesafe_config::ConfigError>(())
//! ```

mod error;
mod guard;
mod key_path;
mod loader;
mod schema;
mod sources;

/// Public error types returned by loading, validation and mutation.
pub use error::{ConfigError, FieldError, FieldErrorKind, ValidationErrors};
/// Loaded config instances.
pub use guard::{Config, Frozen, Writable};
/// Key path resolution for env/CLI keys.
pub use key_path::{KEY_DELIMITER, KeyPath, Resolution};
/// Layered loading entry points and the merge/validation building blocks.
pub use loader::{
    ConfigLayer, ConfigLayerSource, LayeredConfig, LoadOptions, deep_merge_all, load, load_layered,
    merge_values, validate, validate_with_policy,
};
/// Schema declaration.
pub use schema::{
    ConfigSchema, Constraint, Field, FieldKind, FieldMeta, SchemaDef, UnknownKeyPolicy,
};
/// Source readers.
pub use sources::{
    CliSource, DEFAULT_ENV_PREFIX, DataSource, EnvSource, FileFormat, FileSource, Source,
};
