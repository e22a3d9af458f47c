//! HTTP mapping for catalog errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use media_core::CatalogError;
use serde_json::json;

/// Wrapper so the core error can become an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub CatalogError);

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ApiError(CatalogError::Validation(msg.into()))
    }

    pub fn status(&self) -> StatusCode {
        match &self.0 {
            CatalogError::Validation(_) => StatusCode::BAD_REQUEST,
            CatalogError::NotFound(_) => StatusCode::NOT_FOUND,
            CatalogError::Upstream(_) | CatalogError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            CatalogError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, %status, "request failed");
        } else {
            tracing::debug!(error = %self.0, %status, "request rejected");
        }
        (status, Json(json!({ "ok": false, "error": self.0.to_string() }))).into_response()
    }
}
