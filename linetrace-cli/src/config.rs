//! linetrace configuration loading from `.linetrace.toml`.
//!
//! Configuration is optional. Without a file the CLI talks to
//! `127.0.0.1:27017`, database `mongo`, collections `plan` and `production`.
//! Command-line flags (and their `LINETRACE_*` environment variables) override
//! whatever the file says.
//!
//! # Example Configuration
//!
//! ```toml
//! [mongo]
//! hosts = ["db1:27017", "db2:27017"]
//! database = "factory"
//! enable_auth = true
//! username = "reader"
//! password = "secret"
//! enable_replica_set = true
//! replica_set = "rs0"
//! timeout_secs = 10
//!
//! [collections]
//! plan = "plan"
//! production = "production"
//!
//! [output]
//! format = "table"
//! color = true
//! ```

use linetrace_core::{CollectionNames, MongoConfig};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the config file looked up in the working directory.
pub const CONFIG_FILE: &str = ".linetrace.toml";

/// Errors from an explicitly requested config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Root configuration structure loaded from `.linetrace.toml`.
#[derive(Debug, Deserialize, Default)]
pub struct LinetraceConfig {
    /// MongoDB connection settings.
    #[serde(default)]
    pub mongo: MongoConfig,

    /// Collection names for the two lookups.
    #[serde(default)]
    pub collections: CollectionNames,

    /// Output formatting preferences.
    #[serde(default)]
    pub output: OutputSettings,
}

/// Output formatting preferences.
///
/// `--format` on the command line overrides these settings.
#[derive(Debug, Deserialize, Default)]
pub struct OutputSettings {
    /// Default output format: `table`, `json` or `tree`.
    #[serde(default)]
    pub format: Option<String>,

    /// Whether to use colored output. Unset means auto-detect from the TTY.
    #[serde(default)]
    pub color: Option<bool>,
}

/// Connection values supplied on the command line.
#[derive(Debug, Default, Clone)]
pub struct ConnectionOverrides {
    pub uri: Option<String>,
    pub hosts: Vec<String>,
    pub database: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// Fully resolved settings handed to the commands.
#[derive(Debug, Clone)]
pub struct Settings {
    pub mongo: MongoConfig,
    pub collections: CollectionNames,
}

impl LinetraceConfig {
    /// Load configuration from `.linetrace.toml` in the given directory.
    ///
    /// If the config file doesn't exist or can't be parsed, returns defaults.
    /// Parse errors are logged as warnings but don't cause failures.
    pub fn load(root: &Path) -> Self {
        let config_path = root.join(CONFIG_FILE);
        if config_path.exists() {
            match Self::load_file(&config_path) {
                Ok(config) => return config,
                Err(e) => tracing::warn!("{}", e),
            }
        }
        Self::default()
    }

    /// Load an explicitly named config file. Any failure is an error.
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Get the default output format, if configured.
    pub fn default_format(&self) -> Option<&str> {
        self.output.format.as_deref()
    }

    /// Configured color preference, `None` for auto-detection.
    pub fn use_color(&self) -> Option<bool> {
        self.output.color
    }

    /// Apply command-line overrides on top of the file settings.
    ///
    /// - `--uri` replaces the host list; `--host` clears a file-level URI
    /// - `--username` turns authentication on
    pub fn resolve(self, overrides: ConnectionOverrides) -> Settings {
        let mut mongo = self.mongo;

        if !overrides.hosts.is_empty() {
            mongo.hosts = overrides.hosts;
            mongo.uri = None;
        }
        if let Some(uri) = overrides.uri {
            mongo.uri = Some(uri);
        }
        if let Some(database) = overrides.database {
            mongo.database = database;
        }
        if let Some(username) = overrides.username {
            mongo.username = Some(username);
            mongo.enable_auth = true;
        }
        if let Some(password) = overrides.password {
            mongo.password = Some(password);
        }
        if let Some(timeout) = overrides.timeout_secs {
            mongo.timeout_secs = timeout;
        }

        Settings {
            mongo,
            collections: self.collections,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LinetraceConfig::default();
        assert_eq!(config.mongo.hosts, vec!["127.0.0.1:27017"]);
        assert_eq!(config.mongo.database, "mongo");
        assert_eq!(config.collections.plan, "plan");
        assert!(config.output.format.is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let toml_content = r#"
[mongo]
hosts = ["db1:27017", "db2:27017"]
database = "factory"
enable_auth = true
username = "reader"
password = "secret"
enable_replica_set = true
replica_set = "rs0"
timeout_secs = 10

[collections]
plan = "plans"
production = "productions"

[output]
format = "json"
color = false
"#;
        let config: LinetraceConfig = toml::from_str(toml_content).unwrap();

        assert_eq!(config.mongo.hosts, vec!["db1:27017", "db2:27017"]);
        assert_eq!(config.mongo.database, "factory");
        assert!(config.mongo.enable_auth);
        assert_eq!(config.mongo.password.as_deref(), Some("secret"));
        assert_eq!(config.mongo.replica_set, "rs0");
        assert_eq!(config.mongo.timeout_secs, 10);

        assert_eq!(config.collections.plan, "plans");
        assert_eq!(config.collections.production, "productions");

        assert_eq!(config.default_format(), Some("json"));
        assert_eq!(config.use_color(), Some(false));
    }

    #[test]
    fn test_partial_sections_keep_defaults() {
        let toml_content = r#"
[mongo]
database = "factory"

[collections]
plan = "plans"
"#;
        let config: LinetraceConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.mongo.hosts, vec!["127.0.0.1:27017"]);
        assert_eq!(config.mongo.timeout_secs, 30);
        assert_eq!(config.collections.production, "production");
    }

    #[test]
    fn test_overrides_win() {
        let toml_content = r#"
[mongo]
uri = "mongodb://file-host/factory"
database = "factory"
"#;
        let config: LinetraceConfig = toml::from_str(toml_content).unwrap();
        let settings = config.resolve(ConnectionOverrides {
            hosts: vec!["cli-host:27017".into()],
            username: Some("reader".into()),
            timeout_secs: Some(3),
            ..ConnectionOverrides::default()
        });

        assert_eq!(settings.mongo.uri, None, "--host clears the file URI");
        assert_eq!(settings.mongo.hosts, vec!["cli-host:27017"]);
        assert_eq!(settings.mongo.database, "factory");
        assert!(settings.mongo.enable_auth);
        assert_eq!(settings.mongo.timeout_secs, 3);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = LinetraceConfig::load(dir.path());
        assert_eq!(config.mongo.database, "mongo");
    }

    #[test]
    fn test_load_invalid_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "[mongo\nbroken").unwrap();
        let config = LinetraceConfig::load(dir.path());
        assert_eq!(config.mongo.database, "mongo");

        let err = LinetraceConfig::load_file(&dir.path().join(CONFIG_FILE)).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_load_file_missing_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = LinetraceConfig::load_file(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
