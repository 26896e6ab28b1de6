//! Shared application state wiring the gateway, the access gate, and the
//! optional remote mirror together.

use std::sync::Arc;

use tracing::warn;

use crate::{
    auth::{AccessGate, AllowListGate},
    config::AppConfig,
    dao::{
        gateway::PersistenceGateway,
        remote::{DirectoryRemote, RemoteLog},
        storage::StorageResult,
    },
    error::ServiceError,
};

/// Cheaply clonable handle on the application state.
pub type SharedState = Arc<AppState>;

/// Central application state holding the persistence gateway and the gate.
pub struct AppState {
    config: AppConfig,
    gateway: PersistenceGateway,
    access: Arc<dyn AccessGate>,
    remote: Option<DirectoryRemote>,
}

impl AppState {
    /// Open the state from configuration, using the allow-list gate.
    ///
    /// Recovery of any interrupted commit happens here, before the first
    /// request can observe the stores.
    pub fn new(config: AppConfig) -> StorageResult<SharedState> {
        let access = AllowListGate::new(config.allowed_operators.clone());
        if config.allowed_operators.is_empty() {
            warn!("no operators configured; every mutating request will be denied");
        }
        Self::with_gate(config, access)
    }

    /// Open the state with a caller-supplied access gate implementation.
    pub fn with_gate(config: AppConfig, access: Arc<dyn AccessGate>) -> StorageResult<SharedState> {
        let gateway = PersistenceGateway::open(&config.data_dir)?;
        let remote = match &config.remote_dir {
            Some(dir) => Some(DirectoryRemote::open(dir)?),
            None => None,
        };

        Ok(Arc::new(Self {
            config,
            gateway,
            access,
            remote,
        }))
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// The persistence gateway owning both stores.
    pub fn gateway(&self) -> &PersistenceGateway {
        &self.gateway
    }

    /// The configured remote mirror, if any.
    pub fn remote(&self) -> Option<&dyn RemoteLog> {
        self.remote.as_ref().map(|remote| remote as &dyn RemoteLog)
    }

    /// Consult the access gate, failing with [`ServiceError::Unauthorized`]
    /// before any store is touched.
    pub fn ensure_authorized(&self, identity: &str) -> Result<(), ServiceError> {
        if self.access.is_authorized(identity) {
            Ok(())
        } else {
            Err(ServiceError::Unauthorized(format!(
                "operator `{identity}` is not allowed to edit the schedule"
            )))
        }
    }
}
