//! HTTP surface of the Keyforge server.
//!
//! One route does the real work: `GET /v1/teams/{team_id}/download` runs the
//! entitlement pipeline and either streams the session-encrypted release
//! binary or answers with the JSON rejection envelope.

pub mod fixture;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{ConnectInfo, Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use chrono::{DateTime, Utc};
use keyforge_engine::{Delivery, Verifier, VerifyRequest};
use keyforge_types::RejectReason;
use serde::{Deserialize, Serialize};

/// Shared server state: the verifier and everything it owns.
#[derive(Clone)]
pub struct AppState {
    pub verifier: Arc<Verifier>,
}

/// Query parameters of the download route. Required fields default to the
/// empty string so the engine answers `BadRequest` instead of axum's
/// extractor rejection.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadQuery {
    #[serde(default)]
    pub license_key: String,
    pub customer_id: Option<String>,
    #[serde(default)]
    pub product_id: String,
    pub version: Option<String>,
    #[serde(default)]
    pub session_key: String,
    #[serde(default)]
    pub device_identifier: String,
    #[serde(default)]
    pub classloader: bool,
}

/// Body of every non-200 answer.
#[derive(Debug, Serialize, Deserialize)]
pub struct RejectionEnvelope {
    pub result: RejectionResult,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RejectionResult {
    pub timestamp: DateTime<Utc>,
    pub valid: bool,
    pub details: String,
}

/// Builds the router over the given state.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/teams/{team_id}/download", get(download_handler))
        .route("/v1/health", get(health_handler))
        .with_state(state)
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn download_handler(
    State(state): State<AppState>,
    Path(team_id): Path<String>,
    Query(query): Query<DownloadQuery>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Response {
    let req = VerifyRequest {
        team_id,
        license_key: query.license_key,
        customer_id: query.customer_id,
        product_id: query.product_id,
        version: query.version,
        session_key: query.session_key,
        device_identifier: query.device_identifier,
        classloader: query.classloader,
        ip: Some(client_ip(&headers, addr)),
    };

    match state.verifier.verify(&req).await {
        Ok(delivery) => grant(delivery),
        Err(reason) => reject(reason),
    }
}

/// First hop of `X-Forwarded-For` when present, the socket peer otherwise.
fn client_ip(headers: &HeaderMap, addr: SocketAddr) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|hop| hop.trim().to_string())
        .filter(|hop| !hop.is_empty())
        .unwrap_or_else(|| addr.ip().to_string())
}

fn reject(reason: RejectReason) -> Response {
    let status = StatusCode::from_u16(reason.http_status())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = RejectionEnvelope {
        result: RejectionResult {
            timestamp: Utc::now(),
            valid: false,
            details: reason.as_str().to_string(),
        },
    };
    (status, Json(body)).into_response()
}

fn grant(delivery: Delivery) -> Response {
    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(header::CONTENT_SECURITY_POLICY, "default-src 'none'")
        .header(header::X_CONTENT_TYPE_OPTIONS, "nosniff")
        .header(header::CACHE_CONTROL, "no-store")
        .header("X-File-Size", delivery.file_size.to_string())
        .header("X-Product-Name", delivery.product_name.as_str())
        .header("X-Release-Status", delivery.release_status.as_str())
        .header("X-Version", delivery.version.as_str());
    if let Some(latest) = &delivery.latest_version {
        builder = builder.header("X-Latest-Version", latest.as_str());
    }
    if let Some(main_class) = &delivery.main_class {
        builder = builder.header("X-Main-Class", main_class.as_str());
    }

    match builder.body(Body::from_stream(delivery.stream)) {
        Ok(response) => response,
        Err(err) => {
            // A metadata value that is not a legal header value.
            tracing::error!(error = %err, "failed to assemble download response");
            reject(RejectReason::InternalError)
        }
    }
}
