//! HTTP surface of the plugin: the report and control routes.
//!
//! Both handlers delegate to the plugin core through its handle and only
//! translate outcomes to the wire: sampler/report failures become 500 with
//! the error text, malformed or mismatched control requests become 400 with
//! an empty body.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use tracing::{info, warn};

use crate::plugin::PluginHandle;
use crate::report::{ControlRequest, ControlResponse};

#[derive(Clone)]
pub struct AppState {
    pub plugin: PluginHandle,
}

pub fn build_router(plugin: PluginHandle) -> Router {
    Router::new()
        .route("/report", get(report))
        .route("/control", post(control))
        .with_state(AppState { plugin })
}

async fn report(State(app): State<AppState>, uri: Uri) -> Response {
    info!(%uri, "report requested");

    match app.plugin.report().await {
        Ok(report) => json_response(&report),
        Err(e) => {
            warn!(error = %e, "failed to build report");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

async fn control(State(app): State<AppState>, uri: Uri, body: Bytes) -> Response {
    info!(%uri, "control requested");

    let request: ControlRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "bad control request");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    match app.plugin.control(request).await {
        Ok(report) => json_response(&ControlResponse {
            shortcut_report: report,
        }),
        Err(e) if e.is_validation() => {
            warn!(error = %e, "rejected control request");
            StatusCode::BAD_REQUEST.into_response()
        }
        Err(e) => {
            warn!(error = %e, "control failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// Encodes the body up front; an encoding failure maps to a 500 carrying the
/// error text.
fn json_response<T: serde::Serialize>(value: &T) -> Response {
    match serde_json::to_vec(value) {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            body,
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "failed to encode response");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}
