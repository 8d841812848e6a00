//! Layered configuration loader.
//!
//! Reads every source in a fixed precedence order, deep-merges the raw
//! mappings, validates the result against the schema and wraps it in a
//! read-only or writable [`Config`].
//!
//! Precedence (low -> high): schema defaults, inline data, TOML files, JSON
//! files, CLI arguments, environment variables.

mod merge;
mod validate;


pub use merge::{deep_merge_all, merge_values};
pub use validate::{validate, validate_with_policy};

pub(crate) use validate::decode;

use crate::schema::{ConfigSchema, UnknownKeyPolicy};
use crate::sources::{CliSource, DEFAULT_ENV_PREFIX, DataSource, EnvSource, FileSource, Source};
use crate::{Config, ConfigError};
use log::{debug, info, warn};
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;

/// Effective config plus metadata about which layers were read.
#[derive(Debug, Clone)]
pub struct LayeredConfig<T> {
    /// The merged, validated config.
    pub config: Config<T>,
    /// One entry per layer considered, in precedence order.
    pub layers: Vec<ConfigLayer>,
}

/// Precedence tier of a config layer (lowest first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigLayerSource {
    /// Defaults declared in the schema.
    Defaults,
    /// Mapping passed in code.
    Data,
    /// TOML files.
    Toml,
    /// JSON files.
    Json,
    /// Prefixed command-line arguments.
    Cli,
    /// Prefixed environment variables (highest precedence).
    Env,
}

impl fmt::Display for ConfigLayerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConfigLayerSource::Defaults => "defaults",
            ConfigLayerSource::Data => "data",
            ConfigLayerSource::Toml => "toml",
            ConfigLayerSource::Json => "json",
            ConfigLayerSource::Cli => "cli",
            ConfigLayerSource::Env => "env",
        };
        f.write_str(name)
    }
}

/// Metadata about a config layer, including why it was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLayer {
    pub source: ConfigLayerSource,
    /// Path, prefix or schema name the layer came from.
    pub origin: String,
    /// Set when the layer contributed nothing.
    pub skipped_reason: Option<String>,
}

/// Options controlling which sources are read.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// TOML files, merged in order.
    pub toml_files: Vec<FileSource>,
    /// JSON files, merged in order after all TOML files.
    pub json_files: Vec<FileSource>,
    /// Inline mapping just above schema defaults.
    pub data: Value,
    /// Env var prefix (default `TSC_`).
    pub env_prefix: String,
    /// CLI flag prefix after `--`; defaults to the env prefix lower-cased.
    pub cli_prefix: Option<String>,
    pub load_env: bool,
    pub load_cli: bool,
    /// Variables to read instead of the process environment.
    pub env_vars: Option<Vec<(String, String)>>,
    /// Arguments to read instead of the process arguments.
    pub cli_args: Option<Vec<String>>,
    /// Overrides the schema's read-only flag.
    pub read_only: Option<bool>,
    /// Overrides the schema's unknown-key policy.
    pub unknown_keys: Option<UnknownKeyPolicy>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            toml_files: Vec::new(),
            json_files: Vec::new(),
            data: Value::Object(Map::new()),
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
            cli_prefix: None,
            load_env: true,
            load_cli: true,
            env_vars: None,
            cli_args: None,
            read_only: None,
            unknown_keys: None,
        }
    }
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an optional TOML file; a missing file is skipped.
    pub fn toml_file(mut self, path: impl AsRef<Path>) -> Self {
        self.toml_files.push(FileSource::toml(path));
        self
    }

    /// Add a TOML file that must exist.
    pub fn require_toml_file(mut self, path: impl AsRef<Path>) -> Self {
        self.toml_files.push(FileSource::toml(path).required(true));
        self
    }

    /// Add an optional JSON file; a missing file is skipped.
    pub fn json_file(mut self, path: impl AsRef<Path>) -> Self {
        self.json_files.push(FileSource::json(path));
        self
    }

    /// Add a JSON file that must exist.
    pub fn require_json_file(mut self, path: impl AsRef<Path>) -> Self {
        self.json_files.push(FileSource::json(path).required(true));
        self
    }

    pub fn data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    pub fn env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    pub fn cli_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.cli_prefix = Some(prefix.into());
        self
    }

    pub fn load_env(mut self, enabled: bool) -> Self {
        self.load_env = enabled;
        self
    }

    pub fn load_cli(mut self, enabled: bool) -> Self {
        self.load_cli = enabled;
        self
    }

    pub fn env_vars<K, V>(mut self, vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.env_vars = Some(
            vars.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        );
        self
    }

    pub fn cli_args<S: Into<String>>(mut self, args: impl IntoIterator<Item = S>) -> Self {
        self.cli_args = Some(args.into_iter().map(Into::into).collect());
        self
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = Some(read_only);
        self
    }

    pub fn unknown_keys(mut self, policy: UnknownKeyPolicy) -> Self {
        self.unknown_keys = Some(policy);
        self
    }

    /// CLI prefix in effect.
    pub fn effective_cli_prefix(&self) -> String {
        self.cli_prefix
            .clone()
            .unwrap_or_else(|| self.env_prefix.to_lowercase())
    }

    /// Every source in precedence order, lowest first.
    pub fn sources(&self) -> Vec<Box<dyn Source>> {
        let mut sources: Vec<Box<dyn Source>> = vec![Box::new(DataSource::new(self.data.clone()))];
        for file in self.toml_files.iter().chain(&self.json_files) {
            sources.push(Box::new(file.clone()));
        }
        if self.load_cli {
            let mut cli = CliSource::new(self.effective_cli_prefix());
            if let Some(args) = &self.cli_args {
                cli = cli.with_args(args.iter().cloned());
            }
            sources.push(Box::new(cli));
        }
        if self.load_env {
            let mut env = EnvSource::new(self.env_prefix.clone());
            if let Some(vars) = &self.env_vars {
                env = env.with_vars(vars.iter().cloned());
            }
            sources.push(Box::new(env));
        }
        sources
    }

    /// Load with these options.
    pub fn load<T: ConfigSchema>(&self) -> Result<Config<T>, ConfigError> {
        load(self)
    }
}

fn is_empty_object(value: &Value) -> bool {
    value.as_object().is_some_and(Map::is_empty)
}

/// Load a config, discarding layer metadata.
pub fn load<T: ConfigSchema>(options: &LoadOptions) -> Result<Config<T>, ConfigError> {
    load_layered(options).map(|layered| layered.config)
}

/// Load a config and report which layers contributed.
pub fn load_layered<T: ConfigSchema>(options: &LoadOptions) -> Result<LayeredConfig<T>, ConfigError> {
    let mut schema = T::schema();
    schema.check()?;
    if let Some(read_only) = options.read_only {
        schema = schema.read_only(read_only);
    }
    if let Some(policy) = options.unknown_keys {
        schema = schema.unknown_keys(policy);
    }
    info!("loading config {}", schema.name());

    let mut layers = vec![ConfigLayer {
        source: ConfigLayerSource::Defaults,
        origin: schema.name().to_string(),
        skipped_reason: None,
    }];
    let mut values = Vec::new();
    for source in options.sources() {
        let origin = source.origin();
        let skipped_reason = match source.read(&schema)? {
            Some(value) if !is_empty_object(&value) => {
                debug!("loaded {} layer ({origin})", source.layer());
                values.push(value);
                None
            }
            Some(_) => Some("empty"),
            None => match source.layer() {
                ConfigLayerSource::Toml | ConfigLayerSource::Json => Some("not found"),
                _ => Some("empty"),
            },
        };
        if let Some(reason) = skipped_reason {
            debug!("skipped {} layer ({origin}): {reason}", source.layer());
        }
        layers.push(ConfigLayer {
            source: source.layer(),
            origin,
            skipped_reason: skipped_reason.map(str::to_string),
        });
    }

    let merged = deep_merge_all(&values);
    let (value, normalized) = match decode::<T>(&schema, &merged, schema.unknown_key_policy()) {
        Ok(decoded) => decoded,
        Err(err) => {
            warn!("loading config {} failed: {err}", schema.name());
            return Err(err);
        }
    };

    let config = Config::new(value, normalized, schema);
    info!(
        "config {} loaded as {} (layers={})",
        config.schema_name(),
        if config.is_read_only() { "read-only" } else { "writable" },
        layers.len()
    );
    Ok(LayeredConfig { config, layers })
}
