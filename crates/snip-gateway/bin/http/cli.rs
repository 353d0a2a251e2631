use clap::{Parser, ValueEnum};
use snip_telemetry::LogFormat;
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;

pub const LISTEN_ADDR_ENV: &str = "SNIP_LISTEN_ADDR";
pub const BASE_URL_ENV: &str = "SNIP_BASE_URL";
pub const STORAGE_BACKEND_ENV: &str = "SNIP_STORAGE_BACKEND";
pub const MYSQL_DSN_ENV: &str = "SNIP_MYSQL_DSN";
pub const CACHE_BACKEND_ENV: &str = "SNIP_CACHE_BACKEND";
pub const REDIS_URL_ENV: &str = "SNIP_REDIS_URL";
pub const CACHE_KEY_PREFIX_ENV: &str = "SNIP_CACHE_KEY_PREFIX";
pub const MOKA_CAPACITY_ENV: &str = "SNIP_MOKA_CAPACITY";
pub const RATE_LIMIT_ENV: &str = "SNIP_RATE_LIMIT";
pub const RATE_LIMIT_WINDOW_ENV: &str = "SNIP_RATE_LIMIT_WINDOW_SECS";
pub const MAX_ATTEMPTS_ENV: &str = "SNIP_MAX_ATTEMPTS";
pub const REAPER_INTERVAL_ENV: &str = "SNIP_REAPER_INTERVAL_SECS";
pub const LOG_FORMAT_ENV: &str = "SNIP_LOG_FORMAT";
pub const OTLP_ENDPOINT_ENV: &str = "SNIP_OTLP_ENDPOINT";

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackendArg {
    #[value(name = "in-memory")]
    InMemory,
    #[value(name = "mysql")]
    Mysql,
}

impl Display for StorageBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackendArg::InMemory => write!(f, "in-memory"),
            StorageBackendArg::Mysql => write!(f, "mysql"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CacheBackendArg {
    #[value(name = "moka")]
    Moka,
    #[value(name = "redis")]
    Redis,
}

impl Display for CacheBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheBackendArg::Moka => write!(f, "moka"),
            CacheBackendArg::Redis => write!(f, "redis"),
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "snip-gateway")]
pub struct CLI {
    #[arg(long, env = LISTEN_ADDR_ENV, default_value = DEFAULT_LISTEN_ADDR)]
    pub listen_addr: SocketAddr,

    /// Public origin that short links are published under.
    #[arg(long, env = BASE_URL_ENV, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    #[arg(
        long,
        env = STORAGE_BACKEND_ENV,
        value_enum,
        default_value_t = StorageBackendArg::InMemory
    )]
    pub storage: StorageBackendArg,

    #[arg(long, env = MYSQL_DSN_ENV, required_if_eq("storage", "mysql"))]
    pub mysql_dsn: Option<String>,

    #[arg(
        long,
        env = CACHE_BACKEND_ENV,
        value_enum,
        default_value_t = CacheBackendArg::Moka
    )]
    pub cache: CacheBackendArg,

    #[arg(long, env = REDIS_URL_ENV, required_if_eq("cache", "redis"))]
    pub redis_url: Option<String>,

    #[arg(long, env = CACHE_KEY_PREFIX_ENV, default_value = snip_cache::redis::DEFAULT_KEY_PREFIX)]
    pub cache_key_prefix: String,

    #[arg(long, env = MOKA_CAPACITY_ENV, default_value_t = 10_000)]
    pub moka_capacity: u64,

    /// Shortening requests accepted per client and window.
    #[arg(long, env = RATE_LIMIT_ENV, default_value_t = 10)]
    pub rate_limit: u64,

    #[arg(long, env = RATE_LIMIT_WINDOW_ENV, default_value_t = 60)]
    pub rate_limit_window_secs: u64,

    /// Generated codes tried before a request fails.
    #[arg(long, env = MAX_ATTEMPTS_ENV, default_value_t = 16)]
    pub max_attempts: u32,

    /// Seconds between expired-record sweeps; 0 disables the reaper.
    #[arg(long, env = REAPER_INTERVAL_ENV, default_value_t = 300)]
    pub reaper_interval_secs: u64,

    #[arg(long, env = LOG_FORMAT_ENV, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    #[arg(long, env = OTLP_ENDPOINT_ENV)]
    pub otlp_endpoint: Option<String>,
}
