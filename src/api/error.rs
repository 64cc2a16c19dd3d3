//! HTTP mapping of domain errors

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};

use crate::domain::{DomainError, FieldErrors};

impl DomainError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            DomainError::Validation(_) => StatusCode::BAD_REQUEST,
            DomainError::InsufficientStock { .. } | DomainError::DuplicateKey { .. } => {
                StatusCode::CONFLICT
            }
            DomainError::NotFound { .. } => StatusCode::NOT_FOUND,
            DomainError::Database(_) | DomainError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for DomainError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let (message, details) = match &self {
            DomainError::Validation(errors) => ("Validation failed".to_string(), json!(errors)),
            DomainError::InsufficientStock {
                material_id,
                requested,
                available,
            } => (
                self.to_string(),
                json!({
                    "material_id": material_id,
                    "requested": requested,
                    "available": available,
                }),
            ),
            DomainError::DuplicateKey { field, message } => {
                let mut errors = FieldErrors::new();
                errors.add(field.clone(), message.clone());
                (self.to_string(), json!(errors))
            }
            DomainError::NotFound { .. } => (self.to_string(), Value::Null),
            DomainError::Database(_) | DomainError::Internal(_) => {
                tracing::error!("{}", self);
                ("Internal server error".to_string(), Value::Null)
            }
        };

        let mut error = json!({
            "code": status.as_u16(),
            "message": message,
        });
        if !details.is_null() {
            error["details"] = details;
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            DomainError::validation("title", "This field is required").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            DomainError::InsufficientStock {
                material_id: 1,
                requested: 7,
                available: 6
            }
            .status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            DomainError::not_found("event", 3).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            DomainError::Database("disk I/O error".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
