//! API error types

use miette::{Diagnostic, JSONReportHandler};
use motchi_core::CoreError;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// API error response
#[derive(Debug, thiserror::Error, Diagnostic, Serialize, Deserialize)]
pub enum ApiError {
    /// Request validation failed
    #[error("Validation failed: {message}")]
    #[diagnostic(
        code(api::validation_error),
        help("Check the field errors for specific validation issues")
    )]
    ValidationError {
        message: String,
        fields: Option<Vec<FieldError>>,
    },

    /// Authentication required
    #[error("Authentication required")]
    #[diagnostic(
        code(api::unauthorized),
        help("Please provide valid authentication credentials")
    )]
    Unauthorized { message: Option<String> },

    /// Resource not found
    #[error("Resource not found: {resource_type}")]
    #[diagnostic(
        code(api::not_found),
        help("The {resource_type} with ID '{resource_id}' does not exist")
    )]
    NotFound {
        resource_type: String,
        resource_id: String,
    },

    /// Conflict with existing resource
    #[error("Resource conflict")]
    #[diagnostic(
        code(api::conflict),
        help("The resource already exists or is in a conflicting state")
    )]
    Conflict { message: String },

    /// Database error from motchi-core
    #[error("{message}")]
    #[diagnostic(code(api::database_error), help("Database operation failed"))]
    Database { message: String, json: String },

    /// Core error from motchi-core
    #[error("{message}")]
    #[diagnostic(code(api::core_error), help("Core operation failed"))]
    Core { message: String, json: String },

    /// JSON error
    #[error("{message}")]
    #[diagnostic(
        code(api::json_error),
        help("Check that your JSON is valid and matches the expected schema")
    )]
    Json { message: String, json: String },

    /// Service temporarily unavailable
    #[error("Service temporarily unavailable")]
    #[diagnostic(
        code(api::service_unavailable),
        help("The service is temporarily down for maintenance")
    )]
    ServiceUnavailable { retry_after_seconds: Option<u64> },
}

/// Field-level validation error
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl ApiError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::ValidationError { .. } => 400,
            ApiError::Unauthorized { .. } => 401,
            ApiError::NotFound { .. } => 404,
            ApiError::Conflict { .. } => 409,
            ApiError::ServiceUnavailable { .. } => 503,
            ApiError::Database { .. } => 500,
            ApiError::Core { .. } => 500,
            ApiError::Json { .. } => 400,
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            fields: None,
        }
    }

    /// Create a not found error
    pub fn not_found(resource_type: impl Into<String>, resource_id: impl Into<String>) -> Self {
        Self::NotFound {
            resource_type: resource_type.into(),
            resource_id: resource_id.into(),
        }
    }

    /// Create an unauthorized error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: Some(message.into()),
        }
    }

    /// Create a conflict error
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Unauthorized { reason } => Self::Unauthorized {
                message: Some(reason),
            },
            CoreError::UserNotFound => Self::not_found("user", "unknown"),
            CoreError::PetNotFound { pet_id } => Self::not_found("pet", pet_id.to_string()),
            CoreError::NoPet { .. } => Self::validation("Caller has no pet"),
            CoreError::UsernameTaken { username } => {
                Self::conflict(format!("Username '{username}' is already taken"))
            }
            CoreError::AlreadyHasPet { .. } => Self::conflict("User already has a pet"),
            CoreError::CoOwnerAlreadySet { .. } => Self::conflict("Pet already has a co-owner"),
            err @ (CoreError::AmbiguousOwnership { .. } | CoreError::Database(_)) => {
                // Render the diagnostic into the detail payload; the
                // user-facing message stays generic
                let handler = JSONReportHandler::new();
                let message = format!("{}", err);
                let mut json = String::new();

                let err: Box<dyn Diagnostic> = Box::new(err);
                handler
                    .render_report(&mut json, err.as_ref())
                    .unwrap_or_default();

                Self::Core { message, json }
            }
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        let diagnostic = miette::miette!(
            code = "json::parse_error",
            help = "Check that your JSON is valid",
            "{}",
            err
        );

        let handler = JSONReportHandler::new();
        let message = err.to_string();
        let mut json = String::new();

        handler
            .render_report(&mut json, diagnostic.as_ref())
            .unwrap_or_default();

        Self::Json { message, json }
    }
}

// Server-side response conversion
#[cfg(feature = "server")]
impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        use axum::Json;
        use axum::http::StatusCode;

        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let error_message = self.to_string();
        let error_type = match &self {
            ApiError::ValidationError { .. } => "validation_error",
            ApiError::Unauthorized { .. } => "unauthorized",
            ApiError::NotFound { .. } => "not_found",
            ApiError::Conflict { .. } => "conflict",
            ApiError::Database { .. } => "database_error",
            ApiError::Core { .. } => "core_error",
            ApiError::Json { .. } => "json_error",
            ApiError::ServiceUnavailable { .. } => "service_unavailable",
        };

        let detail = match &self {
            ApiError::Database { json, .. } => Some(json),
            ApiError::Core { json, .. } => Some(json),
            ApiError::Json { json, .. } => Some(json),
            _ => None,
        };

        let mut error_obj = serde_json::json!({
            "type": error_type,
            "message": error_message,
        });

        if let Some(d) = detail {
            error_obj["detail"] = serde_json::to_value(d).unwrap_or_default();
        }

        let body = serde_json::json!({
            "error": error_obj,
            "timestamp": chrono::Utc::now(),
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::validation("bad").status_code(), 400);
        assert_eq!(ApiError::unauthorized("no token").status_code(), 401);
        assert_eq!(ApiError::not_found("pet", "pet_x").status_code(), 404);
        assert_eq!(ApiError::conflict("taken").status_code(), 409);
    }

    #[test]
    fn test_core_error_mapping() {
        let err: ApiError = CoreError::UsernameTaken {
            username: "alice".into(),
        }
        .into();
        assert_eq!(err.status_code(), 409);

        let err: ApiError = CoreError::unauthorized("expired").into();
        assert_eq!(err.status_code(), 401);

        let err: ApiError = CoreError::AmbiguousOwnership {
            user_id: motchi_core::UserId::generate(),
        }
        .into();
        assert_eq!(err.status_code(), 500);
    }
}
