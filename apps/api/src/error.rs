use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use rolegraph_core::{AppError, HierarchyViolation};
use tracing::error;

mod types;

pub use types::ErrorResponse;

/// HTTP API error wrapper around core application errors.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(value: AppError) -> Self {
        Self(value)
    }
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match &self.0 {
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "validation"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
            AppError::Hierarchy(violation) => match violation {
                HierarchyViolation::InvalidParent { .. } => {
                    (StatusCode::BAD_REQUEST, "invalid_parent")
                }
                HierarchyViolation::CrossTenant { .. } => (StatusCode::BAD_REQUEST, "cross_tenant"),
                HierarchyViolation::DuplicateCode { .. } => {
                    (StatusCode::CONFLICT, "duplicate_code")
                }
                HierarchyViolation::CyclicParent { .. } => (StatusCode::CONFLICT, "cyclic_parent"),
                HierarchyViolation::HasChildren { .. } => (StatusCode::CONFLICT, "has_children"),
            },
            AppError::Matrix(_) => (StatusCode::BAD_REQUEST, "matrix_violation"),
            AppError::ScopeNotApplicable(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "scope_not_applicable")
            }
            AppError::Timeout(_) => (StatusCode::SERVICE_UNAVAILABLE, "timeout"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            error!(error = %self.0, "request failed");
        }

        let payload = Json(ErrorResponse::new(self.0.to_string(), code));

        (status, payload).into_response()
    }
}

/// Standard API result type.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use rolegraph_core::{AppError, HierarchyViolation, MatrixViolation};

    use super::ApiError;

    fn status_of(error: AppError) -> StatusCode {
        ApiError(error).into_response().status()
    }

    #[test]
    fn hierarchy_violations_split_between_bad_request_and_conflict() {
        assert_eq!(
            status_of(
                HierarchyViolation::InvalidParent {
                    parent_id: "p".to_owned()
                }
                .into()
            ),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(
                HierarchyViolation::CyclicParent {
                    role_id: "r".to_owned(),
                    parent_id: "p".to_owned(),
                }
                .into()
            ),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(
                HierarchyViolation::HasChildren {
                    role_id: "r".to_owned(),
                    child_count: 2,
                }
                .into()
            ),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn engine_errors_map_to_distinct_statuses() {
        assert_eq!(
            status_of(
                MatrixViolation::UnknownResource {
                    resource: "grades".to_owned()
                }
                .into()
            ),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(AppError::ScopeNotApplicable("department".to_owned())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(AppError::Timeout("storage".to_owned())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(AppError::Forbidden("denied".to_owned())),
            StatusCode::FORBIDDEN
        );
    }
}
