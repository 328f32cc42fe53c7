use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::services::aggregation::AggregationError;
use crate::services::analytics::AnalyticsError;
use crate::services::corn_fields::CornFieldError;
use crate::services::reading_store::StoreError;
use crate::services::telemetry_sync::SyncError;
use crate::services::thingspeak::TelemetryError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    ServiceUnavailable(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorResponse {
            success: false,
            error: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<SyncError> for ApiError {
    fn from(e: SyncError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl From<TelemetryError> for ApiError {
    fn from(e: TelemetryError) -> Self {
        match e {
            TelemetryError::InvalidField(_) => ApiError::BadRequest(e.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<AggregationError> for ApiError {
    fn from(e: AggregationError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl From<AnalyticsError> for ApiError {
    fn from(e: AnalyticsError) -> Self {
        match e {
            AnalyticsError::NotConfigured => ApiError::ServiceUnavailable(e.to_string()),
            AnalyticsError::NotFound(_) => ApiError::NotFound(e.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<CornFieldError> for ApiError {
    fn from(e: CornFieldError) -> Self {
        match e {
            CornFieldError::NotFound(_) => ApiError::NotFound(e.to_string()),
            CornFieldError::Forbidden(_) => ApiError::Forbidden(e.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::BadRequest("bad".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(AnalyticsError::NotConfigured).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::from(AnalyticsError::NotFound(4)).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(TelemetryError::InvalidField(12)).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(CornFieldError::Forbidden("not yours")).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::from(CornFieldError::NotFound(3)).to_string(),
            "Corn field not found"
        );
    }

    #[test]
    fn test_error_body() {
        let response = ApiError::NotFound("No sensor data available".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
