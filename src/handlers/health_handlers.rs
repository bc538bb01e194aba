//! Health & readiness handlers.
//!
//! - GET /         -> service banner
//! - GET /healthz  -> simple liveness ("ok")
//! - GET /readyz   -> readiness, delegated to the media source's probes

use crate::services::{gateway::GatewayService, media_source::SourceCheck, planner::RangeMode};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use clap::ValueEnum;
use serde::Serialize;
use std::collections::HashMap;

/// `GET /`
pub async fn root(State(service): State<GatewayService>) -> impl IntoResponse {
    let mut features = vec!["cors_enabled", "chunked_streaming"];
    if service.stream_policy().honors_ranges() {
        features.push("range_requests");
    }
    Json(StatusResponse {
        service: env!("CARGO_PKG_NAME"),
        status: "running",
        version: env!("CARGO_PKG_VERSION"),
        features,
        stream_range_mode: mode_name(service.stream_policy().range_mode),
        download_range_mode: mode_name(service.download_policy().range_mode),
    })
}

fn mode_name(mode: RangeMode) -> String {
    mode.to_possible_value()
        .map(|v| v.get_name().to_owned())
        .unwrap_or_default()
}

/// `GET /healthz`
///
/// Very small liveness probe: always returns 200 OK with a plain JSON body.
/// This endpoint should be cheap and never perform I/O.
pub async fn healthz() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".into(),
        }),
    )
}

/// `GET /readyz`
///
/// HTTP 200 when every probe of the media source passes, 503 otherwise.
pub async fn readyz(State(service): State<GatewayService>) -> impl IntoResponse {
    let results = service.source.checks().await;
    let overall_ok = results.iter().all(|check| check.ok);

    let checks = results
        .into_iter()
        .map(|SourceCheck { name, ok, error }| (name, CheckStatus { ok, error }))
        .collect::<HashMap<_, _>>();

    let body = ReadyResponse {
        status: if overall_ok {
            "ok".into()
        } else {
            "error".into()
        },
        checks,
    };

    let status = if overall_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

#[derive(Serialize)]
struct StatusResponse {
    service: &'static str,
    status: &'static str,
    version: &'static str,
    features: Vec<&'static str>,
    stream_range_mode: String,
    download_range_mode: String,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

#[derive(Serialize)]
struct ReadyResponse {
    status: String,
    checks: HashMap<&'static str, CheckStatus>,
}

#[derive(Serialize)]
struct CheckStatus {
    ok: bool,
    error: Option<String>,
}
