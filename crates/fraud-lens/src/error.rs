use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::claims::{ClaimImportError, ClaimsServiceError};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Claims(ClaimsServiceError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Claims(err) => write!(f, "claims error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Claims(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::Claims(ClaimsServiceError::Import(_)) => StatusCode::BAD_REQUEST,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Claims(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<ClaimsServiceError> for AppError {
    fn from(value: ClaimsServiceError) -> Self {
        Self::Claims(value)
    }
}

impl From<ClaimImportError> for AppError {
    fn from(value: ClaimImportError) -> Self {
        Self::Claims(ClaimsServiceError::Import(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::claims::RepositoryError;

    #[test]
    fn import_failures_map_to_bad_request() {
        let error = AppError::from(ClaimImportError::NoRecognizedColumns);
        assert_eq!(error.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn storage_failures_map_to_internal_error() {
        let error = AppError::from(ClaimsServiceError::Repository(
            RepositoryError::Unavailable("disk full".to_string()),
        ));
        assert!(error.to_string().contains("disk full"));
        assert_eq!(
            error.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn listener_failures_surface_as_io_errors() {
        let bind = std::io::Error::new(std::io::ErrorKind::AddrInUse, "address in use");
        let error = AppError::from(bind);
        assert!(matches!(error, AppError::Io(_)));
        assert_eq!(error.to_string(), "io error: address in use");
        assert_eq!(
            error.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
