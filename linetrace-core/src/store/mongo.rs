//! MongoDB-backed store.

use std::fmt;
use std::time::Duration;

use bson::{doc, Document};
use futures::TryStreamExt;
use mongodb::error::{Error as MongoError, ErrorKind};
use mongodb::options::{ClientOptions, Credential, ServerAddress};
use mongodb::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::DocumentStore;
use crate::error::{LookupError, Result};
use crate::pipeline::Pipeline;

/// Address used when no host is configured.
pub const DEFAULT_HOST: &str = "127.0.0.1:27017";

/// Connection settings for a MongoDB deployment.
///
/// Either `uri` is set, in which case it is parsed as a connection string and
/// wins over `hosts`, or the client is assembled from the individual fields.
/// Credentials are only sent when `enable_auth` is true and the replica set
/// name only when `enable_replica_set` is true.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MongoConfig {
    /// Full connection string, e.g. `mongodb://db1,db2/?replicaSet=rs`.
    pub uri: Option<String>,
    /// `host:port` addresses of the deployment.
    pub hosts: Vec<String>,
    /// Database holding the plan and production collections.
    pub database: String,
    pub enable_auth: bool,
    pub username: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    /// Database to authenticate against (defaults to `database`).
    pub auth_source: Option<String>,
    pub enable_replica_set: bool,
    pub replica_set: String,
    /// Connect and server-selection timeout, in seconds.
    pub timeout_secs: u64,
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            uri: None,
            hosts: vec![DEFAULT_HOST.to_string()],
            database: "mongo".to_string(),
            enable_auth: false,
            username: None,
            password: None,
            auth_source: None,
            enable_replica_set: false,
            replica_set: "rs".to_string(),
            timeout_secs: 30,
        }
    }
}

impl fmt::Debug for MongoConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MongoConfig")
            .field("uri", &self.uri.as_ref().map(|_| "<redacted>"))
            .field("hosts", &self.hosts)
            .field("database", &self.database)
            .field("enable_auth", &self.enable_auth)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("auth_source", &self.auth_source)
            .field("enable_replica_set", &self.enable_replica_set)
            .field("replica_set", &self.replica_set)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl MongoConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Human-readable target, without credentials.
    pub fn describe(&self) -> String {
        match &self.uri {
            Some(_) => format!("<uri>/{}", self.database),
            None => format!("{}/{}", self.hosts.join(","), self.database),
        }
    }

    /// Translate the settings into driver options.
    pub async fn client_options(&self) -> Result<ClientOptions> {
        if self.timeout_secs == 0 {
            return Err(LookupError::InvalidConfig(
                "timeout must be at least one second".into(),
            ));
        }

        let mut options = match &self.uri {
            Some(uri) => ClientOptions::parse(uri)
                .await
                .map_err(|e| LookupError::InvalidConfig(e.to_string()))?,
            None => {
                let mut options = ClientOptions::default();
                options.hosts = self.server_addresses()?;
                options
            }
        };

        options.app_name.get_or_insert_with(|| "linetrace".to_string());
        options.connect_timeout.get_or_insert(self.timeout());
        options.server_selection_timeout.get_or_insert(self.timeout());

        if self.enable_auth {
            let username = self.username.clone().ok_or_else(|| {
                LookupError::InvalidConfig("authentication enabled but no username set".into())
            })?;
            let mut credential = Credential::default();
            credential.username = Some(username);
            credential.password = self.password.clone();
            credential.source = Some(
                self.auth_source
                    .clone()
                    .unwrap_or_else(|| self.database.clone()),
            );
            options.credential = Some(credential);
        } else if self.password.is_some() {
            warn!("A password is set but authentication is disabled; no credentials will be sent");
        }

        if self.enable_replica_set {
            options.repl_set_name = Some(self.replica_set.clone());
        }

        Ok(options)
    }

    fn server_addresses(&self) -> Result<Vec<ServerAddress>> {
        let hosts: Vec<&str> = if self.hosts.is_empty() {
            vec![DEFAULT_HOST]
        } else {
            self.hosts.iter().map(String::as_str).collect()
        };
        hosts
            .into_iter()
            .map(|host| {
                ServerAddress::parse(host).map_err(|e| {
                    LookupError::InvalidConfig(format!("bad host '{}': {}", host, e))
                })
            })
            .collect()
    }
}

/// Store backed by a MongoDB client.
///
/// The driver connects lazily, so an unreachable server surfaces on the first
/// [`aggregate`](DocumentStore::aggregate) or [`ping`](DocumentStore::ping).
#[derive(Clone)]
pub struct MongoStore {
    client: Client,
    database: String,
}

impl MongoStore {
    pub async fn connect(config: &MongoConfig) -> Result<Self> {
        let options = config.client_options().await?;
        let database = match (&config.uri, &options.default_database) {
            (Some(_), Some(db)) => db.clone(),
            _ => config.database.clone(),
        };
        let client =
            Client::with_options(options).map_err(|e| LookupError::Connection(e.to_string()))?;

        info!(server = %config.describe(), database = %database, "MongoDB client ready");
        Ok(Self { client, database })
    }

    pub fn database(&self) -> &str {
        &self.database
    }
}

impl DocumentStore for MongoStore {
    async fn aggregate(&self, collection: &str, pipeline: &Pipeline) -> Result<Vec<Document>> {
        let stages = pipeline.to_documents();
        debug!(database = %self.database, collection, stages = stages.len(), "aggregate");

        let cursor = self
            .client
            .database(&self.database)
            .collection::<Document>(collection)
            .aggregate(stages, None)
            .await
            .map_err(|e| classify(collection, e))?;

        cursor
            .try_collect::<Vec<Document>>()
            .await
            .map_err(|e| classify(collection, e))
    }

    async fn ping(&self) -> Result<()> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map(|_| ())
            .map_err(|e| classify("admin", e))
    }
}

/// Split driver errors into "could not reach the server" and "query failed".
fn classify(collection: &str, err: MongoError) -> LookupError {
    match err.kind.as_ref() {
        ErrorKind::ServerSelection { .. }
        | ErrorKind::Io(_)
        | ErrorKind::DnsResolve { .. }
        | ErrorKind::Authentication { .. } => LookupError::Connection(err.to_string()),
        _ => LookupError::Query {
            collection: collection.to_string(),
            message: err.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MongoConfig::default();
        assert_eq!(config.hosts, vec![DEFAULT_HOST]);
        assert_eq!(config.database, "mongo");
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert!(!config.enable_auth);
        assert!(!config.enable_replica_set);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = MongoConfig {
            password: Some("hunter2".into()),
            uri: Some("mongodb://u:hunter2@db".into()),
            ..MongoConfig::default()
        };
        let debug = format!("{:?}", config);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }

    #[tokio::test]
    async fn test_client_options_from_fields() {
        let config = MongoConfig {
            hosts: vec!["db1:27018".into(), "db2:27019".into()],
            database: "factory".into(),
            enable_auth: true,
            username: Some("reader".into()),
            password: Some("secret".into()),
            enable_replica_set: true,
            replica_set: "rs0".into(),
            timeout_secs: 5,
            ..MongoConfig::default()
        };
        let options = config.client_options().await.unwrap();

        assert_eq!(
            options.hosts,
            vec![
                ServerAddress::parse("db1:27018").unwrap(),
                ServerAddress::parse("db2:27019").unwrap(),
            ]
        );
        assert_eq!(options.repl_set_name.as_deref(), Some("rs0"));
        assert_eq!(options.connect_timeout, Some(Duration::from_secs(5)));

        let credential = options.credential.expect("credential");
        assert_eq!(credential.username.as_deref(), Some("reader"));
        assert_eq!(credential.source.as_deref(), Some("factory"));
    }

    #[tokio::test]
    async fn test_auth_and_replica_set_are_opt_in() {
        let config = MongoConfig {
            username: Some("reader".into()),
            ..MongoConfig::default()
        };
        let options = config.client_options().await.unwrap();
        assert!(options.credential.is_none());
        assert!(options.repl_set_name.is_none());
    }

    #[tokio::test]
    async fn test_auth_without_username_is_rejected() {
        let config = MongoConfig {
            enable_auth: true,
            ..MongoConfig::default()
        };
        assert!(matches!(
            config.client_options().await,
            Err(LookupError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_zero_timeout_is_rejected() {
        let config = MongoConfig {
            timeout_secs: 0,
            ..MongoConfig::default()
        };
        assert!(matches!(
            config.client_options().await,
            Err(LookupError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_password_without_auth_is_not_sent() {
        let config = MongoConfig {
            password: Some("secret".into()),
            ..MongoConfig::default()
        };
        let options = config.client_options().await.unwrap();
        assert!(options.credential.is_none());
    }

    #[tokio::test]
    async fn test_bad_uri_is_rejected() {
        let config = MongoConfig {
            uri: Some("postgres://nope".into()),
            ..MongoConfig::default()
        };
        assert!(matches!(
            config.client_options().await,
            Err(LookupError::InvalidConfig(_))
        ));
    }
}
