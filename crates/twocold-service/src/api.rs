//! REST API endpoints for the twocold-service.
//!
//! # Endpoints
//!
//! - `GET /api/health` - Service health check (no auth required)
//! - `GET /api/ac/list/{floor}` - Devices on a floor with their current state
//! - `POST /api/ac/enable/{floor}/{id}` - Switch a device on
//! - `POST /api/ac/disable/{floor}/{id}` - Switch a device off
//! - `POST /api/ac/toggle/{floor}/{id}` - Flip a device
//! - `PATCH /api/ac/edit/{floor}/{id}` - Change a device's name and place
//!
//! The switching endpoints answer with the whole floor as read after the
//! command. Floors other than 5 and 8 and non-numeric ids are rejected before
//! the portal is contacted.
//!
//! ## Error Handling
//!
//! All endpoints return structured JSON errors via [`AppError`]:
//!
//! | Status | Cause |
//! |--------|-------|
//! | 400 | Bad floor, id or edit payload |
//! | 404 | No such device |
//! | 502 | The portal answered with an unexpected page or failed |
//! | 504 | The portal did not answer in time |
//! | 500 | The device registry could not be read or written |

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
};
use serde::Serialize;
use time::OffsetDateTime;
use tracing::error;

use twocold_types::{DeviceEdit, DeviceView, Floor, ParseError, parse_device_id};

use crate::controller::ControlError;
use crate::state::AppState;

/// Create the API router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/ac/list/{floor}", get(list))
        .route("/api/ac/enable/{floor}/{id}", post(enable))
        .route("/api/ac/disable/{floor}/{id}", post(disable))
        .route("/api/ac/toggle/{floor}/{id}", post(toggle))
        .route("/api/ac/edit/{floor}/{id}", patch(edit))
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub uptime_seconds: i64,
}

/// Health check endpoint.
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let now = OffsetDateTime::now_utc();
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: now,
        uptime_seconds: (now - state.started_at).whole_seconds().max(0),
    })
}

async fn list(
    State(state): State<Arc<AppState>>,
    Path(floor): Path<String>,
) -> Result<Json<Vec<DeviceView>>, AppError> {
    let floor: Floor = floor.parse()?;
    Ok(Json(state.controller.list(floor).await?))
}

async fn enable(
    State(state): State<Arc<AppState>>,
    Path((floor, id)): Path<(String, String)>,
) -> Result<Json<Vec<DeviceView>>, AppError> {
    let (floor, id) = device_path(&floor, &id)?;
    Ok(Json(state.controller.enable(floor, id).await?))
}

async fn disable(
    State(state): State<Arc<AppState>>,
    Path((floor, id)): Path<(String, String)>,
) -> Result<Json<Vec<DeviceView>>, AppError> {
    let (floor, id) = device_path(&floor, &id)?;
    Ok(Json(state.controller.disable(floor, id).await?))
}

async fn toggle(
    State(state): State<Arc<AppState>>,
    Path((floor, id)): Path<(String, String)>,
) -> Result<Json<Vec<DeviceView>>, AppError> {
    let (floor, id) = device_path(&floor, &id)?;
    Ok(Json(state.controller.toggle(floor, id).await?))
}

/// Rename or move a device.
///
/// Returns 204 on success.
async fn edit(
    State(state): State<Arc<AppState>>,
    Path((floor, id)): Path<(String, String)>,
    payload: Result<Json<DeviceEdit>, JsonRejection>,
) -> Result<StatusCode, AppError> {
    let (floor, id) = device_path(&floor, &id)?;
    let Json(edit) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    state.controller.edit(floor, id, &edit).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn device_path(floor: &str, id: &str) -> Result<(Floor, u32), AppError> {
    Ok((floor.parse()?, parse_device_id(id)?))
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    BadRequest(String),
    BadGateway(String),
    GatewayTimeout(String),
    Internal(String),
}

impl From<ParseError> for AppError {
    fn from(e: ParseError) -> Self {
        AppError::BadRequest(e.to_string())
    }
}

impl From<ControlError> for AppError {
    fn from(e: ControlError) -> Self {
        let message = e.to_string();
        match e {
            ControlError::DeviceNotFound { .. } => AppError::NotFound(message),
            ControlError::InvalidEdit(_) => AppError::BadRequest(message),
            ControlError::Remote(twocold_core::Error::Timeout { .. }) => {
                AppError::GatewayTimeout(message)
            }
            ControlError::Remote(twocold_core::Error::InvalidConfig(_)) => {
                AppError::Internal(message)
            }
            ControlError::Remote(_) => AppError::BadGateway(message),
            ControlError::Registry(twocold_store::Error::DeviceNotFound { .. }) => {
                AppError::NotFound(message)
            }
            ControlError::Registry(twocold_store::Error::InvalidEdit(_)) => {
                AppError::BadRequest(message)
            }
            ControlError::Registry(_) => AppError::Internal(message),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::GatewayTimeout(msg) => (StatusCode::GATEWAY_TIMEOUT, msg),
            AppError::Internal(msg) => {
                error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({
            "error": message,
        });

        (status, Json(body)).into_response()
    }
}
