use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("missing required configuration: {}", .0.join(", "))]
    ConfigMissing(Vec<&'static str>),
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::ConfigMissing(_) => "CONFIG_MISSING",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Internal(ref err) = self {
            tracing::error!(error = %format!("{err:#}"), "request failed");
        }

        let body = ErrorBody {
            error: self.code(),
            message: Some(self.to_string()),
        };

        let mut response = (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response();
        response
            .headers_mut()
            .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
        response
    }
}

/// Failure of a single upstream call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpstreamError {
    #[error("transport error: {message}")]
    Transport { message: String },
    #[error("upstream returned {status}: {message}")]
    Http { status: u16, message: String },
    /// A 2xx answer whose body is not JSON. The source counts as failed.
    #[error("malformed upstream body: {message}")]
    MalformedBody { message: String },
}

impl UpstreamError {
    pub fn status(&self) -> Option<u16> {
        match self {
            UpstreamError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}
