//! Defines routes for the media relay.
//!
//! ## Structure
//! - **Media endpoints**
//!   - `GET     /stream/{container}/{object}`: stream, honors `Range` per config
//!   - `HEAD    /stream/{container}/{object}`: headers only
//!   - `OPTIONS /stream/{container}/{object}`: CORS preflight
//!   - `GET     /dl/{container}/{object}`: attachment download, no ranges
//!   - `GET     /info/{container}/{object}`: metadata as JSON
//!
//! - **Service endpoints**
//!   - `GET /`, `GET /healthz`, `GET /readyz`
//!
//! `{container}` is a numeric peer id or an `@alias`.

use crate::{
    handlers::{
        health_handlers::{healthz, readyz, root},
        stream_handlers::{get_download, get_info, get_stream, head_stream, options_stream},
    },
    services::gateway::GatewayService,
};
use axum::{
    Router,
    http::{HeaderValue, header},
    routing::get,
};
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};

/// Build the router for all media routes, carrying `GatewayService` as state.
pub fn routes() -> Router<GatewayService> {
    Router::new()
        .route("/", get(root))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route(
            "/stream/{container}/{object}",
            get(get_stream).head(head_stream).options(options_stream),
        )
        .route("/dl/{container}/{object}", get(get_download))
        .route("/info/{container}/{object}", get(get_info))
}

/// The complete application: routes, state and the response layers.
///
/// Every response, errors and unmatched routes included, carries
/// `Access-Control-Allow-Origin: *`.
pub fn app(service: GatewayService) -> Router {
    routes()
        .with_state(service)
        .layer(SetResponseHeaderLayer::if_not_present(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(TraceLayer::new_for_http())
}
