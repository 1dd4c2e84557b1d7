//! HTTP control API for air conditioners managed through a ScreenMate portal.
//!
//! This crate provides a service that:
//! - Keeps one authenticated session with the portal and drives it page by page
//! - Reports and switches the state of every known device
//! - Keeps device names and places in a local registry file
//! - Optional API key authentication
//!
//! # REST API Endpoints
//!
//! - `GET /api/health` - Service health check (no auth required)
//! - `GET /api/ac/list/{floor}` - Devices on floor 5 or 8 with their state
//! - `POST /api/ac/enable/{floor}/{id}` - Switch a device on
//! - `POST /api/ac/disable/{floor}/{id}` - Switch a device off
//! - `POST /api/ac/toggle/{floor}/{id}` - Flip a device
//! - `PATCH /api/ac/edit/{floor}/{id}` - Rename or move a device
//!
//! # Configuration
//!
//! The service reads configuration from `~/.config/twocold/server.toml`:
//!
//! ```toml
//! [server]
//! bind = "127.0.0.1:8080"
//!
//! [storage]
//! path = "~/.local/share/twocold/devices.json"
//!
//! [portal]
//! base_url = "http://portal.example/screenmate"
//! username = "8floor"
//! password = "secret"
//! timeout_secs = 15
//!
//! [portal.rooms]
//! floor5 = "room-5"
//! floor8 = "room-8"
//!
//! [control]
//! # or "always_post"
//! set_state_policy = "skip_if_satisfied"
//! ```
//!
//! # Security
//!
//! ```toml
//! [security]
//! # Require X-API-Key header for all requests (except /api/health)
//! api_key_enabled = true
//! api_key = "your-secure-random-key-at-least-16-chars"
//! ```

use std::sync::Arc;

use axum::{Router, middleware::from_fn_with_state};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod api;
pub mod config;
pub mod controller;
pub mod middleware;
pub mod state;

pub use config::{
    Config, ConfigError, ControlConfig, SecurityConfig, ServerConfig, StorageConfig,
    ValidationError,
};
pub use controller::{ControlError, Controller, SetStatePolicy};
pub use state::AppState;

/// Build the full application: routes, authentication, tracing and CORS.
pub fn app(state: Arc<AppState>) -> Router {
    let security = Arc::new(state.config.security.clone());

    Router::new()
        .merge(api::router())
        .layer(from_fn_with_state(security, middleware::api_key_auth))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
