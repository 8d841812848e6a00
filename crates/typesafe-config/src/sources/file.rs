//! TOML and JSON file layers.

use super::Source;
use crate::loader::ConfigLayerSource;
use crate::schema::SchemaDef;
use crate::ConfigError;
use log::debug;
use serde_json::{Map, Number, Value};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Syntax of a config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Toml,
    Json,
}

/// A config file; missing optional files are skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSource {
    path: PathBuf,
    format: FileFormat,
    required: bool,
}

impl FileSource {
    /// Optional TOML file.
    pub fn toml(path: impl AsRef<Path>) -> Self {
        Self::new(path, FileFormat::Toml)
    }

    /// Optional JSON file.
    pub fn json(path: impl AsRef<Path>) -> Self {
        Self::new(path, FileFormat::Json)
    }

    pub fn new(path: impl AsRef<Path>, format: FileFormat) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            format,
            required: false,
        }
    }

    /// Fail the load with `SourceNotFound` when the file is missing.
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> FileFormat {
        self.format
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    fn parse(&self, contents: &str) -> Result<Value, ConfigError> {
        let value = match self.format {
            FileFormat::Toml => contents
                .parse::<toml::Table>()
                .map(|table| toml_table_to_json(&table))
                .map_err(|err| self.parse_error(err.to_string()))?,
            FileFormat::Json => {
                serde_json::from_str(contents).map_err(|err| self.parse_error(err.to_string()))?
            }
        };
        if !value.is_object() {
            return Err(self.parse_error("expected an object at the root".to_string()));
        }
        Ok(value)
    }

    fn parse_error(&self, message: String) -> ConfigError {
        ConfigError::SourceParse {
            source_name: self.path.display().to_string(),
            message,
        }
    }
}

impl Source for FileSource {
    fn layer(&self) -> ConfigLayerSource {
        match self.format {
            FileFormat::Toml => ConfigLayerSource::Toml,
            FileFormat::Json => ConfigLayerSource::Json,
        }
    }

    fn origin(&self) -> String {
        self.path.display().to_string()
    }

    fn read(&self, _schema: &SchemaDef) -> Result<Option<Value>, ConfigError> {
        debug!(
            "loading config layer (source={:?}, path={})",
            self.layer(),
            self.path.display()
        );
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                if self.required {
                    return Err(ConfigError::SourceNotFound {
                        path: self.path.clone(),
                    });
                }
                debug!(
                    "optional layer missing (source={:?}, path={})",
                    self.layer(),
                    self.path.display()
                );
                return Ok(None);
            }
            Err(error) => {
                return Err(ConfigError::SourceRead {
                    path: self.path.clone(),
                    error,
                });
            }
        };
        self.parse(&contents).map(Some)
    }
}

fn toml_table_to_json(table: &toml::Table) -> Value {
    Value::Object(
        table
            .iter()
            .map(|(key, value)| (key.clone(), toml_to_json(value)))
            .collect::<Map<String, Value>>(),
    )
}

fn toml_to_json(value: &toml::Value) -> Value {
    match value {
        toml::Value::String(text) => Value::String(text.clone()),
        toml::Value::Integer(number) => Value::Number(Number::from(*number)),
        toml::Value::Float(number) => Number::from_f64(*number)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(number.to_string())),
        toml::Value::Boolean(flag) => Value::Bool(*flag),
        toml::Value::Datetime(datetime) => Value::String(datetime.to_string()),
        toml::Value::Array(items) => Value::Array(items.iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => toml_table_to_json(table),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::TempDir;

    fn schema() -> SchemaDef {
        SchemaDef::new("App")
    }

    #[test]
    fn reads_toml_tables_as_nested_mappings() {
        let temp = TempDir::new().expect("tmp");
        let path = temp.path().join("conf.toml");
        fs::write(
            &path,
            "version = \"1.0\"\nhosts = [\"a\", \"b\"]\n\n[login]\nusername = \"root\"\nport = 22\nsince = 1979-05-27\n",
        )
        .expect("write");

        let value = FileSource::toml(&path).read(&schema()).expect("read");
        assert_eq!(
            value,
            Some(json!({
                "version": "1.0",
                "hosts": ["a", "b"],
                "login": {"username": "root", "port": 22, "since": "1979-05-27"}
            }))
        );
    }

    #[test]
    fn reads_json_objects() {
        let temp = TempDir::new().expect("tmp");
        let path = temp.path().join("conf.json");
        fs::write(&path, r#"{"login": {"password": "p"}, "weight": 1.5}"#).expect("write");

        let value = FileSource::json(&path).read(&schema()).expect("read");
        assert_eq!(value, Some(json!({"login": {"password": "p"}, "weight": 1.5})));
    }

    #[test]
    fn missing_optional_file_is_skipped() {
        let temp = TempDir::new().expect("tmp");
        let source = FileSource::toml(temp.path().join("absent.toml"));
        assert_eq!(source.read(&schema()).expect("read"), None);
    }

    #[test]
    fn missing_required_file_fails() {
        let temp = TempDir::new().expect("tmp");
        let source = FileSource::json(temp.path().join("absent.json")).required(true);
        let err = source.read(&schema()).unwrap_err();
        assert!(matches!(err, ConfigError::SourceNotFound { .. }));
    }

    #[test]
    fn malformed_file_reports_path_and_parser_message() {
        let temp = TempDir::new().expect("tmp");
        let path = temp.path().join("broken.toml");
        fs::write(&path, "version = \n").expect("write");

        let err = FileSource::toml(&path).read(&schema()).unwrap_err();
        match err {
            ConfigError::SourceParse {
                source_name,
                message,
            } => {
                assert!(source_name.ends_with("broken.toml"));
                assert!(!message.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn json_root_must_be_an_object() {
        let temp = TempDir::new().expect("tmp");
        let path = temp.path().join("list.json");
        fs::write(&path, "[1, 2]").expect("write");

        let err = FileSource::json(&path).read(&schema()).unwrap_err();
        assert!(err.to_string().contains("expected an object at the root"));
    }
}
