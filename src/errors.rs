use crate::services::gateway::GatewayError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// Error returned by handlers; rendered as `{"detail": <message>}`.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "detail": self.message }));
        (self.status, body).into_response()
    }
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        let status = match &err {
            GatewayError::InvalidIdentifier(_) | GatewayError::NoMedia(_) => {
                StatusCode::BAD_REQUEST
            }
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::AccessDenied(_) => StatusCode::FORBIDDEN,
            GatewayError::Unsatisfiable { .. } => StatusCode::RANGE_NOT_SATISFIABLE,
            GatewayError::Backend(_) | GatewayError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        if status.is_server_error() {
            tracing::error!("request failed: {}", err);
        } else {
            tracing::debug!("request rejected ({}): {}", status, err);
        }
        AppError::new(status, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn taxonomy_maps_to_status_codes() {
        let cases = [
            (GatewayError::InvalidIdentifier("x".into()), 400),
            (GatewayError::NotFound("x".into()), 404),
            (GatewayError::NoMedia("x".into()), 400),
            (GatewayError::AccessDenied("x".into()), 403),
            (GatewayError::Unsatisfiable { total_size: 1 }, 416),
            (GatewayError::Backend("x".into()), 500),
            (GatewayError::Internal("x".into()), 500),
        ];
        for (err, code) in cases {
            assert_eq!(AppError::from(err).status.as_u16(), code);
        }
    }

    #[tokio::test]
    async fn body_is_detail_json() {
        let response = AppError::from(GatewayError::NotFound("message 1/2 not found".into()))
            .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value, json!({ "detail": "message 1/2 not found" }));
    }
}
