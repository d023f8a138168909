use async_trait::async_trait;
use mongodb::{bson::doc, Client, Database};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::config::MongoConfig;
use crate::error::{ConfigError, StoreError};

/// Database used when neither an override nor the connection string names one.
const DEFAULT_DB_NAME: &str = "test";

/// Opens a connection handle for a connection string.
#[async_trait]
pub trait Connector: Send + Sync {
    type Handle: Clone + Send + Sync + 'static;

    async fn connect(&self, uri: &str) -> Result<Self::Handle, StoreError>;
}

/// Lazily opens one connection on first use and hands out the same handle
/// afterwards, including to callers racing on the first call.
pub struct ConnectionProvider<C: Connector> {
    uri: Option<String>,
    connector: C,
    handle: OnceCell<C::Handle>,
}

impl<C: Connector> ConnectionProvider<C> {
    pub fn new(uri: Option<String>, connector: C) -> Self {
        Self {
            uri,
            connector,
            handle: OnceCell::new(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.uri.is_some()
    }

    /// Returns the shared handle, connecting on the first call. A missing
    /// connection string is reported here rather than at startup. Failed
    /// attempts are not cached.
    pub async fn get(&self) -> Result<C::Handle, StoreError> {
        let uri = self
            .uri
            .as_deref()
            .ok_or(ConfigError::MissingConnectionString)?;
        let handle = self
            .handle
            .get_or_try_init(|| async {
                debug!("opening database connection");
                self.connector.connect(uri).await
            })
            .await?;
        Ok(handle.clone())
    }
}

pub struct MongoConnector;

#[async_trait]
impl Connector for MongoConnector {
    type Handle = Client;

    async fn connect(&self, uri: &str) -> Result<Client, StoreError> {
        let client = Client::with_uri_str(uri).await?;
        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| StoreError::Connect(e.to_string()))?;
        info!("connected to MongoDB");
        Ok(client)
    }
}

/// MongoDB access shared by every store in the process.
pub struct Mongo {
    provider: ConnectionProvider<MongoConnector>,
    db_name: Option<String>,
}

impl Mongo {
    pub fn new(config: &MongoConfig) -> Self {
        Self {
            provider: ConnectionProvider::new(config.uri.clone(), MongoConnector),
            db_name: config.db_name.clone(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.provider.is_configured()
    }

    pub async fn database(&self) -> Result<Database, StoreError> {
        let client = self.provider.get().await?;
        Ok(match &self.db_name {
            Some(name) => client.database(name),
            None => client
                .default_database()
                .unwrap_or_else(|| client.database(DEFAULT_DB_NAME)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Default)]
    struct CountingConnector {
        opened: AtomicUsize,
        fail_first: bool,
    }

    #[async_trait]
    impl Connector for CountingConnector {
        type Handle = Arc<usize>;

        async fn connect(&self, _uri: &str) -> Result<Arc<usize>, StoreError> {
            let n = self.opened.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::time::sleep(Duration::from_millis(20)).await;
            if self.fail_first && n == 1 {
                return Err(StoreError::Connect("connection refused".into()));
            }
            Ok(Arc::new(n))
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_first_calls_share_one_connection() {
        let provider = Arc::new(ConnectionProvider::new(
            Some("mongodb://localhost".into()),
            CountingConnector::default(),
        ));

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let provider = provider.clone();
                tokio::spawn(async move { provider.get().await.expect("connect") })
            })
            .collect();

        let mut handles = Vec::new();
        for task in tasks {
            handles.push(task.await.unwrap());
        }

        assert_eq!(provider.connector.opened.load(Ordering::SeqCst), 1);
        let first = &handles[0];
        assert!(handles.iter().all(|h| Arc::ptr_eq(h, first)));
    }

    #[tokio::test]
    async fn missing_uri_is_a_configuration_error() {
        let provider = ConnectionProvider::new(None, CountingConnector::default());
        assert!(!provider.is_configured());
        let err = provider.get().await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Config(ConfigError::MissingConnectionString)
        ));
        assert_eq!(provider.connector.opened.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_connect_is_retried() {
        let provider = ConnectionProvider::new(
            Some("mongodb://localhost".into()),
            CountingConnector {
                fail_first: true,
                ..Default::default()
            },
        );
        assert!(matches!(
            provider.get().await.unwrap_err(),
            StoreError::Connect(_)
        ));
        let handle = provider.get().await.expect("second attempt connects");
        assert_eq!(*handle, 2);
        let again = provider.get().await.unwrap();
        assert!(Arc::ptr_eq(&handle, &again));
    }

    #[tokio::test]
    async fn unconfigured_mongo_fails_at_first_use() {
        let mongo = Mongo::new(&MongoConfig::default());
        assert!(!mongo.is_configured());
        let err = mongo.database().await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Config(ConfigError::MissingConnectionString)
        ));
    }
}
