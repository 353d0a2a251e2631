use thiserror::Error;

#[derive(Debug, Error)]
pub enum TestInfraError {
    /// The container could not be started or inspected.
    #[error("container error: {0}")]
    Container(#[from] testcontainers::TestcontainersError),

    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// MySQL kept refusing connections after the container reported ready.
    #[error("mysql not reachable after {attempts} attempts: {source}")]
    MySqlUnreachable {
        attempts: u32,
        #[source]
        source: sqlx::Error,
    },
}

pub type Result<T> = std::result::Result<T, TestInfraError>;
