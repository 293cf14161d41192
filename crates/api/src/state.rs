use std::sync::Arc;

use fleet_store::DeviceStore;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via
/// `State<AppState>`.
///
/// Cheaply cloneable: inner data is behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The device aggregation store, bootstrapped from the registry CSV.
    pub store: Arc<DeviceStore>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
}
