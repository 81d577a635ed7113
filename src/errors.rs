use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use diesel::r2d2;
use serde_json::json;
use std::fmt;

use crate::tasks::errors::{FetchErrorKind, SchedulerStateError};

/// Errors surfaced by the HTTP API, rendered as `{"error": {"code", "message"}}`.
#[derive(Debug)]
pub enum AppError {
    // Authentication
    Unauthorized,

    // Validation Errors
    InvalidInput { field: String, message: String },
    DuplicateResource { resource: String },
    ResourceNotFound { resource: String },

    // Job control
    JobsNotRunning,
    UnknownJob { name: String },

    // Database Errors
    DatabaseError,
    ConnectionPoolError,

    // System Errors
    InternalError,
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Unauthorized => write!(f, "A valid admin token is required"),

            AppError::InvalidInput { field, message } => write!(f, "Invalid {}: {}", field, message),
            AppError::DuplicateResource { resource } => write!(f, "{} already exists", resource),
            AppError::ResourceNotFound { resource } => write!(f, "{} not found", resource),

            AppError::JobsNotRunning => write!(f, "Background jobs are not running"),
            AppError::UnknownJob { name } => write!(f, "No scheduled job named '{}'", name),

            AppError::DatabaseError => write!(f, "A database error occurred - please try again"),
            AppError::ConnectionPoolError => {
                write!(f, "Service temporarily unavailable - please try again")
            }

            AppError::InternalError => write!(f, "An unexpected error occurred - please try again"),
        }
    }
}

impl AppError {
    fn code(&self) -> &'static str {
        match self {
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::InvalidInput { .. } => "INVALID_INPUT",
            AppError::DuplicateResource { .. } => "DUPLICATE_RESOURCE",
            AppError::ResourceNotFound { .. } => "RESOURCE_NOT_FOUND",
            AppError::JobsNotRunning => "JOBS_NOT_RUNNING",
            AppError::UnknownJob { .. } => "UNKNOWN_JOB",
            AppError::DatabaseError => "DATABASE_ERROR",
            AppError::ConnectionPoolError => "CONNECTION_POOL_ERROR",
            AppError::InternalError => "INTERNAL_ERROR",
        }
    }

    pub fn invalid_input(field: &str, message: &str) -> Self {
        AppError::InvalidInput {
            field: field.to_string(),
            message: message.to_string(),
        }
    }

    pub fn duplicate_resource(resource: &str) -> Self {
        AppError::DuplicateResource {
            resource: resource.to_string(),
        }
    }

    pub fn resource_not_found(resource: &str) -> Self {
        AppError::ResourceNotFound {
            resource: resource.to_string(),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidInput { .. } | AppError::UnknownJob { .. } => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::ResourceNotFound { .. } => StatusCode::NOT_FOUND,
            AppError::DuplicateResource { .. } => StatusCode::CONFLICT,
            AppError::JobsNotRunning => StatusCode::SERVICE_UNAVAILABLE,
            AppError::DatabaseError | AppError::ConnectionPoolError | AppError::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::DatabaseError | AppError::ConnectionPoolError | AppError::InternalError => {
                log::error!("Server error: {:?}", self);
            }
            AppError::Unauthorized => {
                log::warn!("Rejected admin request: {:?}", self);
            }
            _ => {
                log::info!("Client error: {:?}", self);
            }
        }

        HttpResponse::build(self.status_code()).json(json!({
            "error": {
                "code": self.code(),
                "message": self.to_string()
            }
        }))
    }
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

impl From<r2d2::PoolError> for AppError {
    fn from(err: r2d2::PoolError) -> Self {
        log::error!("Database connection pool error: {}", err);
        AppError::ConnectionPoolError
    }
}

impl From<diesel::result::Error> for AppError {
    fn from(err: diesel::result::Error) -> Self {
        use diesel::result::{DatabaseErrorKind, Error as DieselError};

        match err {
            DieselError::NotFound => AppError::resource_not_found("Record"),
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                AppError::duplicate_resource("Record")
            }
            _ => {
                log::error!("Database error: {}", err);
                AppError::DatabaseError
            }
        }
    }
}

impl From<FetchErrorKind> for AppError {
    fn from(err: FetchErrorKind) -> Self {
        AppError::invalid_input("feed_url", &err.to_string())
    }
}

impl From<SchedulerStateError> for AppError {
    fn from(err: SchedulerStateError) -> Self {
        match err {
            SchedulerStateError::UnknownJob(name) => AppError::UnknownJob { name },
            SchedulerStateError::NotRunning | SchedulerStateError::AlreadyRunning => {
                AppError::JobsNotRunning
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diesel::result::{DatabaseErrorKind, Error as DieselError};

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::invalid_input("name", "empty").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::resource_not_found("Feed source").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(AppError::JobsNotRunning.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_diesel_conversions() {
        assert!(matches!(
            AppError::from(DieselError::NotFound),
            AppError::ResourceNotFound { .. }
        ));
        let unique = DieselError::DatabaseError(
            DatabaseErrorKind::UniqueViolation,
            Box::new("UNIQUE constraint failed".to_string()),
        );
        assert!(matches!(AppError::from(unique), AppError::DuplicateResource { .. }));
    }

    #[test]
    fn test_scheduler_conversions() {
        assert!(matches!(
            AppError::from(SchedulerStateError::UnknownJob("x".into())),
            AppError::UnknownJob { name } if name == "x"
        ));
        assert!(matches!(
            AppError::from(SchedulerStateError::NotRunning),
            AppError::JobsNotRunning
        ));
    }
}
