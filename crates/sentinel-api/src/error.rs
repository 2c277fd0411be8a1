//! HTTP error mapping
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sentinel_core::SentinelError;
use sentinel_topology::TopologyError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Core(#[from] SentinelError),

    #[error(transparent)]
    Topology(#[from] TopologyError),

    #[error("METRICS/{0}")]
    Metrics(#[from] prometheus::Error),

    #[error("BODY/{0}")]
    Body(#[from] JsonRejection),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Core(e) => match e {
                SentinelError::InvalidArgument(_) | SentinelError::InvalidDeviceDescriptor(_) => {
                    StatusCode::BAD_REQUEST
                }
                SentinelError::DeviceNotFound(_) | SentinelError::InvalidTransition { .. } => {
                    StatusCode::NOT_FOUND
                }
                SentinelError::DuplicateDevice { .. } => StatusCode::CONFLICT,
                SentinelError::CapacityExceeded(_) => StatusCode::TOO_MANY_REQUESTS,
                SentinelError::ExternalStoreFailure(_)
                | SentinelError::LedgerIntegrityViolation(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Topology(_) => StatusCode::BAD_REQUEST,
            ApiError::Metrics(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Body(rejection) => rejection.status(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Core(e) => e.code(),
            ApiError::Topology(_) => "invalid_topology",
            ApiError::Metrics(_) => "metrics_failure",
            ApiError::Body(_) => "invalid_body",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }
        let body = json!({ "error": self.code(), "message": self.to_string() });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentinel_core::DeviceStatus;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (SentinelError::InvalidArgument("x".into()), StatusCode::BAD_REQUEST),
            (SentinelError::DeviceNotFound("k".into()), StatusCode::NOT_FOUND),
            (
                SentinelError::InvalidTransition {
                    identity_key: "k".into(),
                    expected: DeviceStatus::Isolated,
                    actual: DeviceStatus::Active,
                },
                StatusCode::NOT_FOUND,
            ),
            (
                SentinelError::DuplicateDevice {
                    name: "a".into(),
                    address: "b".into(),
                },
                StatusCode::CONFLICT,
            ),
            (SentinelError::CapacityExceeded("full".into()), StatusCode::TOO_MANY_REQUESTS),
            (
                SentinelError::ExternalStoreFailure("down".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
        assert_eq!(ApiError::from(TopologyError::EmptyInput).status(), StatusCode::BAD_REQUEST);
    }
}
