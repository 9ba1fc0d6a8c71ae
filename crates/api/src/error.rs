use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::models::GroupVerdict;
use persistence::repositories::ValidationRepoError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// The group is in a status that does not permit the requested action.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The action would break an invariant (duplicate membership, creator
    /// removal, re-selecting a rejected use case).
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Required rules are unmet; the fresh verdict rides along in the body.
    #[error("Required rules are not satisfied")]
    RulesUnmet(Box<GroupVerdict>),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    verdict: Option<Box<GroupVerdict>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, verdict) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg, None),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg, None),
            ApiError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "validation_error", msg, None)
            }
            ApiError::InvalidState(msg) => (StatusCode::BAD_REQUEST, "invalid_state", msg, None),
            ApiError::ConstraintViolation(msg) => {
                (StatusCode::BAD_REQUEST, "constraint_violation", msg, None)
            }
            ApiError::RulesUnmet(verdict) => (
                StatusCode::BAD_REQUEST,
                "rules_unmet",
                "Required rules are not satisfied".to_string(),
                Some(verdict),
            ),
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
            ApiError::ServiceUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "service_unavailable",
                msg,
                None,
            ),
        };

        let body = ErrorBody {
            error: error_code.into(),
            message,
            verdict,
        };

        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".into()),
            sqlx::Error::Database(db_err) => {
                if let Some(code) = db_err.code() {
                    match code.as_ref() {
                        "23505" => ApiError::Conflict("Resource already exists".into()),
                        "23503" => ApiError::NotFound("Referenced resource not found".into()),
                        _ => ApiError::Internal(format!("Database error: {}", db_err)),
                    }
                } else {
                    ApiError::Internal(format!("Database error: {}", db_err))
                }
            }
            _ => ApiError::Internal(format!("Database error: {}", err)),
        }
    }
}

impl From<ValidationRepoError> for ApiError {
    fn from(err: ValidationRepoError) -> Self {
        match err {
            ValidationRepoError::Sqlx(e) => e.into(),
            // Dangling references violate an invariant the write paths
            // guarantee; surface as an internal fault, not a 404.
            dangling @ ValidationRepoError::DanglingUseCase { .. } => {
                ApiError::Internal(dangling.to_string())
            }
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let messages: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| {
                    format!(
                        "{}: {}",
                        field,
                        e.message.clone().unwrap_or_default()
                    )
                })
            })
            .collect();

        ApiError::Validation(messages.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::models::group::GroupStatus;
    use uuid::Uuid;

    fn sample_verdict() -> GroupVerdict {
        GroupVerdict {
            group_id: Uuid::new_v4(),
            group_name: "Team Rocket".to_string(),
            status: GroupStatus::Draft,
            has_use_case: true,
            use_case: None,
            member_count: 2,
            validations: Vec::new(),
            all_required_passed: false,
            can_lock: false,
        }
    }

    #[test]
    fn test_api_error_status_codes() {
        let cases: Vec<(ApiError, StatusCode)> = vec![
            (
                ApiError::Unauthorized("no identity".into()),
                StatusCode::UNAUTHORIZED,
            ),
            (ApiError::Forbidden("nope".into()), StatusCode::FORBIDDEN),
            (ApiError::NotFound("gone".into()), StatusCode::NOT_FOUND),
            (ApiError::Conflict("dup".into()), StatusCode::CONFLICT),
            (
                ApiError::Validation("bad".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::InvalidState("locked".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::ConstraintViolation("creator removal".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::RulesUnmet(Box::new(sample_verdict())),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::Internal("boom".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ApiError::ServiceUnavailable("maintenance".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];
        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }

    #[test]
    fn test_api_error_display() {
        assert_eq!(
            format!("{}", ApiError::InvalidState("group is locked".to_string())),
            "Invalid state: group is locked"
        );
        assert_eq!(
            format!("{}", ApiError::RulesUnmet(Box::new(sample_verdict()))),
            "Required rules are not satisfied"
        );
    }

    #[test]
    fn test_from_sqlx_row_not_found() {
        let error: ApiError = sqlx::Error::RowNotFound.into();
        match error {
            ApiError::NotFound(msg) => assert_eq!(msg, "Resource not found"),
            _ => panic!("Expected NotFound error"),
        }
    }

    #[test]
    fn test_dangling_use_case_maps_to_internal() {
        let error: ApiError = ValidationRepoError::DanglingUseCase {
            group_id: Uuid::new_v4(),
            use_case_id: Uuid::new_v4(),
        }
        .into();
        assert!(matches!(error, ApiError::Internal(_)));
    }
}
