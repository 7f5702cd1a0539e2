use std::sync::Arc;

use shotserver_core::dispatch::{DispatchStore, JobSelector, LeaseManager, PollHandler};

use crate::auth::Argon2Authenticator;
use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: everything sits behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Persistence for factories, browsers and requests.
    pub store: Arc<dyn DispatchStore>,
    /// The poll state machine, sharing `store`.
    pub poll: Arc<PollHandler>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Wire the poll handler to `store` using the lease and selection
    /// settings from `config`.
    ///
    /// Panics if `config.lease_ttl_secs` is out of range; `from_env`
    /// rejects such values first.
    pub fn new(store: Arc<dyn DispatchStore>, config: ServerConfig) -> Self {
        let leases = LeaseManager::from_secs(config.lease_ttl_secs)
            .unwrap_or_else(|e| panic!("LEASE_TTL_SECS: {e}"));
        let selector = JobSelector::new(leases, config.select_page_size);
        let poll = PollHandler::new(Arc::clone(&store), Arc::new(Argon2Authenticator))
            .with_selector(selector)
            .with_no_browser_policy(config.no_browser_policy);

        Self {
            store,
            poll: Arc::new(poll),
            config: Arc::new(config),
        }
    }
}
