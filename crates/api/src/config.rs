use std::str::FromStr;

use shotserver_core::dispatch::lease::{LeaseManager, LEASE_TTL_SECS};
use shotserver_core::dispatch::selector::DEFAULT_PAGE_SIZE;
use shotserver_core::dispatch::NoBrowserPolicy;
use shotserver_core::error::CoreError;

/// Which [`DispatchStore`](shotserver_core::dispatch::DispatchStore)
/// implementation backs the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// PostgreSQL via `shotserver-db` (requires `DATABASE_URL`).
    Postgres,
    /// In-process store; state is lost on restart.
    Memory,
}

impl FromStr for StoreBackend {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(CoreError::Validation(format!(
                "Unknown store backend '{other}'. Must be one of: postgres, memory"
            ))),
        }
    }
}

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    /// Empty means cross-origin requests are refused.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long in-flight requests may drain after a shutdown signal.
    pub shutdown_timeout_secs: u64,
    /// Store implementation (default: `postgres`).
    pub store_backend: StoreBackend,
    /// Connection string, required for the postgres backend.
    pub database_url: Option<String>,
    /// Lease lifetime in seconds (default: `300`).
    pub lease_ttl_secs: u64,
    /// Page size of the eligible-request scan (default: `50`).
    pub select_page_size: i64,
    /// What to do with a lease when no browser resolves (default: `keep`).
    pub no_browser_policy: NoBrowserPolicy,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | (none)                     |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`| `30`                       |
    /// | `STORE_BACKEND`        | `postgres`                 |
    /// | `DATABASE_URL`         | (none)                     |
    /// | `LEASE_TTL_SECS`       | `300`                      |
    /// | `SELECT_PAGE_SIZE`     | `50`                       |
    /// | `NO_BROWSER_POLICY`    | `keep`                     |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let store_backend: StoreBackend = std::env::var("STORE_BACKEND")
            .unwrap_or_else(|_| "postgres".into())
            .parse()
            .unwrap_or_else(|e| panic!("STORE_BACKEND: {e}"));

        let database_url = std::env::var("DATABASE_URL").ok();

        let lease_ttl_secs: u64 = std::env::var("LEASE_TTL_SECS")
            .unwrap_or_else(|_| LEASE_TTL_SECS.to_string())
            .parse()
            .expect("LEASE_TTL_SECS must be a valid u64");
        if let Err(e) = LeaseManager::from_secs(lease_ttl_secs) {
            panic!("LEASE_TTL_SECS: {e}");
        }

        let select_page_size: i64 = std::env::var("SELECT_PAGE_SIZE")
            .unwrap_or_else(|_| DEFAULT_PAGE_SIZE.to_string())
            .parse()
            .expect("SELECT_PAGE_SIZE must be a valid i64");
        assert!(select_page_size > 0, "SELECT_PAGE_SIZE must be positive");

        let no_browser_policy: NoBrowserPolicy = std::env::var("NO_BROWSER_POLICY")
            .unwrap_or_else(|_| "keep".into())
            .parse()
            .unwrap_or_else(|e| panic!("NO_BROWSER_POLICY: {e}"));

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            store_backend,
            database_url,
            lease_ttl_secs,
            select_page_size,
            no_browser_policy,
        }
    }
}
