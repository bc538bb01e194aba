//! HTTP handlers for media streaming.
//!
//! `/stream` and `/dl` share one code path; they differ only in the
//! [`StreamPolicy`] taken from `GatewayService`. Every failure before the
//! first body byte becomes a JSON error; after that the assembler owns it.

use crate::{
    errors::AppError,
    handlers::response::{media_response, preflight_response},
    services::{
        gateway::GatewayService,
        planner::{Plan, StreamPolicy},
    },
};
use axum::{
    Json,
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::info;

/// `GET /stream/{container}/{object}`
pub async fn get_stream(
    State(service): State<GatewayService>,
    Path((container, object)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let policy = service.stream_policy().clone();
    serve(&service, &policy, &container, &object, &headers, true).await
}

/// `HEAD /stream/{container}/{object}`: GET's headers, no body.
///
/// Headers come from metadata alone; the backend stream is never opened.
/// A payload that is indexed but unreadable therefore answers 200 here while
/// GET fails with 404 or 500.
pub async fn head_stream(
    State(service): State<GatewayService>,
    Path((container, object)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let policy = service.stream_policy().clone();
    serve(&service, &policy, &container, &object, &headers, false).await
}

/// `OPTIONS /stream/{container}/{object}`
pub async fn options_stream() -> Response {
    preflight_response()
}

/// `GET /dl/{container}/{object}`: forced attachment download.
pub async fn get_download(
    State(service): State<GatewayService>,
    Path((container, object)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let policy = service.download_policy().clone();
    serve(&service, &policy, &container, &object, &headers, true).await
}

async fn serve(
    service: &GatewayService,
    policy: &StreamPolicy,
    container: &str,
    object: &str,
    headers: &HeaderMap,
    with_body: bool,
) -> Result<Response, AppError> {
    // a Range that is not visible ASCII is malformed, not absent
    let range = headers
        .get(header::RANGE)
        .map(|v| v.to_str().unwrap_or_default());

    let prepared = service.prepare(container, object, range, policy).await?;

    if !with_body || prepared.plan == Plan::Unsatisfiable {
        return Ok(media_response(&prepared, policy, Body::empty()));
    }

    info!(
        object = %prepared.object,
        name = %prepared.metadata.display_name,
        size = prepared.metadata.total_size,
        plan = ?prepared.plan,
        "streaming"
    );
    let body = service.open_body(&prepared).await?;
    Ok(media_response(&prepared, policy, Body::from_stream(body)))
}

#[derive(Serialize)]
struct InfoResponse {
    file_name: String,
    file_size: u64,
    mime_type: String,
    stream_url: String,
    download_url: String,
    supports_range: bool,
}

/// `GET /info/{container}/{object}`: metadata without streaming.
pub async fn get_info(
    State(service): State<GatewayService>,
    Path((container, object)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let prepared = service
        .prepare(&container, &object, None, service.stream_policy())
        .await?;
    let meta = prepared.metadata;

    Ok(Json(InfoResponse {
        supports_range: service.stream_policy().honors_ranges() && meta.size_known(),
        file_name: meta.display_name,
        file_size: meta.total_size,
        mime_type: meta.mime_type,
        stream_url: format!("/stream/{}/{}", container, object),
        download_url: format!("/dl/{}/{}", container, object),
    }))
}
