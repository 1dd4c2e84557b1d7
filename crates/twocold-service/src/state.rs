//! Application state shared across handlers.

use std::sync::Arc;

use time::OffsetDateTime;

use twocold_core::LegacySessionNavigator;
use twocold_store::DeviceRegistry;

use crate::config::Config;
use crate::controller::Controller;

/// Shared application state.
pub struct AppState {
    /// Device control; serializes access to the portal session internally.
    pub controller: Controller,
    /// Configuration the service was started with.
    pub config: Config,
    /// When the state was created.
    pub started_at: OffsetDateTime,
}

impl AppState {
    /// Create new application state around an existing controller.
    pub fn new(controller: Controller, config: Config) -> Arc<Self> {
        Arc::new(Self {
            controller,
            config,
            started_at: OffsetDateTime::now_utc(),
        })
    }

    /// Wire the HTTP portal session and the registry described by `config`.
    pub fn from_config(config: Config) -> Result<Arc<Self>, twocold_core::Error> {
        let navigator = LegacySessionNavigator::connect(config.portal.clone())?;
        let registry = DeviceRegistry::open(&config.storage.path);
        let controller = Controller::new(navigator, registry, config.control.set_state_policy);
        Ok(Self::new(controller, config))
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("controller", &self.controller)
            .field("started_at", &self.started_at)
            .finish_non_exhaustive()
    }
}
