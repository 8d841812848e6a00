//! Demo binary: loads `AppConfig` from layered sources and prints it.
//!
//! ```text
//! TSC_USER__PASSWORD=secret app-config --toml demos/app-config/conf.toml -- --tsc_port=9000
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::PathBuf;
use typesafe_config::{ConfigSchema, Field, FieldKind, LoadOptions, SchemaDef, load_layered};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Prompt {
    name: String,
    value: i64,
}

impl ConfigSchema for Prompt {
    fn schema() -> SchemaDef {
        SchemaDef::new("Prompt")
            .field(Field::string("name").describe("The name or identifier for the prompt."))
            .field(Field::integer("value").describe("A numerical value associated with the prompt."))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct User {
    #[serde(rename = "UserName")]
    user_name: String,
    #[serde(rename = "PassWord")]
    password: String,
}

impl ConfigSchema for User {
    fn schema() -> SchemaDef {
        SchemaDef::new("User")
            .field(
                Field::string("UserName")
                    .default("anonym")
                    .describe("The username."),
            )
            .field(
                Field::string("PassWord")
                    .min_length(1)
                    .describe("The password. Required."),
            )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AppConfig {
    project_name: String,
    version: String,
    user: User,
    database_url: String,
    debug_mode: bool,
    allowed_hosts: Vec<String>,
    port: u16,
    weight: f64,
    prompts: Vec<Prompt>,
}

impl ConfigSchema for AppConfig {
    fn schema() -> SchemaDef {
        SchemaDef::new("AppConfig")
            .field(Field::string("project_name").describe("The name of the project."))
            .field(Field::string("version").describe("The version of the project."))
            .field(
                Field::nested::<User>("user")
                    .default(json!({}))
                    .describe("Current logged in user."),
            )
            .field(
                Field::string("database_url")
                    .default("sqlite://app.db")
                    .describe("The connection string for the database."),
            )
            .field(
                Field::bool("debug_mode")
                    .default(false)
                    .describe("Indicates if debug mode is enabled."),
            )
            .field(
                Field::list("allowed_hosts", FieldKind::String)
                    .default(json!(["localhost"]))
                    .describe("Allowed hostnames for the application."),
            )
            .field(
                Field::integer("port")
                    .default(8080)
                    .minimum(1.0)
                    .maximum(65535.0)
                    .describe("The port number on which the application will run."),
            )
            .field(
                Field::float("weight")
                    .default(0.0)
                    .minimum(0.0)
                    .describe("The weight of the logged in user."),
            )
            .field(
                Field::list("prompts", FieldKind::Nested(Prompt::schema()))
                    .default(json!([]))
                    .describe("Prompt configurations."),
            )
    }
}

/// Command-line options for the demo.
#[derive(Parser)]
#[command(name = "app-config", version)]
struct Cli {
    /// TOML files, merged in order
    #[arg(long = "toml")]
    toml_files: Vec<PathBuf>,
    /// JSON files, merged in order after the TOML files
    #[arg(long = "json")]
    json_files: Vec<PathBuf>,
    /// Print the field reference and exit
    #[arg(long)]
    fields: bool,
    /// Load the config as writable and bump the port to show a validated write
    #[arg(long)]
    writable: bool,
    /// Prefixed config overrides, e.g. `-- --tsc_port=9000`
    #[arg(last = true)]
    overrides: Vec<String>,
}

fn main() -> Result<()> {
    let _ = env_logger::builder()
        .format_timestamp_millis()
        .parse_default_env()
        .try_init();

    let cli = Cli::parse();
    if cli.fields {
        print!("{}", AppConfig::schema().help());
        return Ok(());
    }

    let mut options = LoadOptions::new()
        .data(json!({"version": "0.1 alpha"}))
        .cli_args(cli.overrides.iter().cloned());
    for path in &cli.toml_files {
        options = options.require_toml_file(path);
    }
    for path in &cli.json_files {
        options = options.require_json_file(path);
    }
    if cli.writable {
        options = options.read_only(false);
    }

    info!(
        "loading AppConfig (toml_files={}, json_files={}, overrides={})",
        cli.toml_files.len(),
        cli.json_files.len(),
        cli.overrides.len()
    );
    let layered = load_layered::<AppConfig>(&options).context("failed to load config")?;
    for layer in &layered.layers {
        debug!(
            "layer {} ({}) skipped={:?}",
            layer.source, layer.origin, layer.skipped_reason
        );
    }

    let mut config = layered.config;
    if cli.writable {
        let port = config.port.saturating_add(1);
        config.set("port", port).context("failed to update port")?;
    }
    println!("{}", config.render()?);
    Ok(())
}
