use crate::{Result, TestInfraError};
use sqlx::mysql::MySqlPoolOptions;
use sqlx::MySqlPool;
use std::time::Duration;
use testcontainers::core::{IntoContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::ImageExt;
use testcontainers::{ContainerAsync, GenericImage};
use typed_builder::TypedBuilder;

const MYSQL_PORT: u16 = 3306;

/// Settings for a disposable MySQL server and the pools opened against it.
#[derive(Debug, Clone, TypedBuilder)]
pub struct MysqlConfig {
    #[builder(default = "snip".to_string(), setter(into))]
    database: String,
    #[builder(default = "snip".to_string(), setter(into))]
    username: String,
    #[builder(default = "snip".to_string(), setter(into))]
    password: String,
    #[builder(default = 5)]
    max_connections: u32,
    /// The server logs "ready" once during init and restarts before it
    /// really accepts clients, so connecting is retried.
    #[builder(default = 20)]
    connect_attempts: u32,
    #[builder(default = Duration::from_millis(500))]
    retry_delay: Duration,
}

/// Test fixture for a disposable MySQL server holding the `short_urls` data.
pub struct MySqlServer {
    container: ContainerAsync<GenericImage>,
    config: MysqlConfig,
}

impl MySqlServer {
    pub async fn new(config: MysqlConfig) -> Result<Self> {
        let container = GenericImage::new("mysql", "8.4")
            .with_exposed_port(MYSQL_PORT.tcp())
            .with_wait_for(WaitFor::message_on_stderr("ready for connections"))
            .with_env_var("MYSQL_DATABASE", config.database.as_str())
            .with_env_var("MYSQL_USER", config.username.as_str())
            .with_env_var("MYSQL_PASSWORD", config.password.as_str())
            .with_env_var("MYSQL_ROOT_PASSWORD", "root")
            .start()
            .await?;

        Ok(Self { container, config })
    }

    /// Starts a server with the default `snip` database and credentials.
    pub async fn start() -> Result<Self> {
        Self::new(MysqlConfig::builder().build()).await
    }

    pub async fn database_url(&self) -> Result<String> {
        let host = match self.container.get_host().await?.to_string() {
            host if host == "localhost" => String::from("127.0.0.1"),
            host => host,
        };
        let port = self.container.get_host_port_ipv4(MYSQL_PORT).await?;

        Ok(format!(
            "mysql://{}:{}@{}:{}/{}",
            self.config.username, self.config.password, host, port, self.config.database
        ))
    }

    /// Opens a connection pool, retrying until the server accepts clients.
    pub async fn pool(&self) -> Result<MySqlPool> {
        let url = self.database_url().await?;
        let attempts = self.config.connect_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match MySqlPoolOptions::new()
                .max_connections(self.config.max_connections)
                .connect(&url)
                .await
            {
                Ok(pool) => return Ok(pool),
                Err(source) if attempt >= attempts => {
                    return Err(TestInfraError::MySqlUnreachable { attempts, source });
                }
                Err(_) => tokio::time::sleep(self.config.retry_delay).await,
            }
        }
    }
}
