use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use gatehouse_core::error::{self, ApiError};

/// Internal error type that converts to structured API responses
#[derive(Debug)]
pub enum AppError {
    /// Validation error (400)
    Validation {
        message: String,
        field: Option<String>,
        received: Option<serde_json::Value>,
        docs_hint: Option<String>,
    },
    /// Forbidden (403)
    Forbidden {
        message: String,
        docs_hint: Option<String>,
    },
    /// Endpoint deliberately disabled by configuration (503)
    ServiceUnavailable { message: String },
    /// Internal error (500)
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let request_id = uuid::Uuid::now_v7().to_string();

        let (status, api_error) = match self {
            AppError::Validation {
                message,
                field,
                received,
                docs_hint,
            } => (
                StatusCode::BAD_REQUEST,
                ApiError {
                    error: error::codes::VALIDATION_FAILED.to_string(),
                    message,
                    field,
                    received,
                    request_id,
                    docs_hint,
                },
            ),
            AppError::Forbidden { message, docs_hint } => (
                StatusCode::FORBIDDEN,
                ApiError {
                    error: error::codes::FORBIDDEN.to_string(),
                    message,
                    field: None,
                    received: None,
                    request_id,
                    docs_hint,
                },
            ),
            AppError::ServiceUnavailable { message } => (
                StatusCode::SERVICE_UNAVAILABLE,
                ApiError {
                    error: error::codes::SERVICE_UNAVAILABLE.to_string(),
                    message,
                    field: None,
                    received: None,
                    request_id,
                    docs_hint: None,
                },
            ),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiError {
                        error: error::codes::INTERNAL_ERROR.to_string(),
                        message: "An internal error occurred".to_string(),
                        field: None,
                        received: None,
                        request_id,
                        docs_hint: None,
                    },
                )
            }
        };

        (status, Json(api_error)).into_response()
    }
}

/// Shorthand for "this parameter must be present and non-empty".
pub fn required_param(value: Option<String>, name: &str) -> Result<String, AppError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Validation {
            message: format!("Missing required parameter: {name}"),
            field: Some(name.to_string()),
            received: None,
            docs_hint: Some(
                "Entry links must carry ClickId, ZonaId and Country query parameters.".to_string(),
            ),
        })
}

#[cfg(test)]
mod tests {
    use super::{AppError, required_param};

    #[test]
    fn required_param_accepts_present_values() {
        let value = required_param(Some("abc123".to_string()), "ClickId").unwrap();
        assert_eq!(value, "abc123");
    }

    #[test]
    fn required_param_trims_whitespace() {
        let value = required_param(Some("  abc  ".to_string()), "ClickId").unwrap();
        assert_eq!(value, "abc");
    }

    #[test]
    fn required_param_rejects_absent_and_blank() {
        for value in [None, Some(String::new()), Some("   ".to_string())] {
            let err = required_param(value, "Country").expect_err("must be rejected");
            assert!(matches!(
                err,
                AppError::Validation { field: Some(ref f), .. } if f == "Country"
            ));
        }
    }
}
