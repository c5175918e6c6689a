use crate::database::StoreError;
use crate::services::auth_service::AuthError;
use crate::services::import_service::ImportError;
use actix_web::{http::StatusCode, HttpResponse, ResponseError};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Import(#[from] ImportError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("{0}")]
    InvalidTransition(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("{0}")]
    InvalidRequest(String),
    #[error("{context}: {source}")]
    Context {
        context: &'static str,
        source: Box<AppError>,
    },
}

impl AppError {
    /// Prefix the user-visible message, keeping the status of the cause.
    pub fn context(self, context: &'static str) -> Self {
        AppError::Context {
            context,
            source: Box::new(self),
        }
    }

    fn root(&self) -> &AppError {
        match self {
            AppError::Context { source, .. } => source.root(),
            other => other,
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self.root() {
            AppError::Import(ImportError::Write { .. }) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Import(_) => StatusCode::BAD_REQUEST,
            AppError::Auth(AuthError::Store(_)) | AppError::Auth(AuthError::Hashing(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InvalidTransition(_) => StatusCode::CONFLICT,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Context { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut body = serde_json::json!({
            "success": false,
            "error": self.to_string(),
        });

        if let AppError::Import(ImportError::Write { written, total, .. }) = self.root() {
            body["written"] = serde_json::json!(written);
            body["total"] = serde_json::json!(total);
        }

        HttpResponse::build(self.status_code()).json(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let shape = AppError::from(ImportError::Shape("Data must be an array of users".into()));
        assert_eq!(shape.status_code(), StatusCode::BAD_REQUEST);

        let auth = AppError::from(AuthError::InvalidCredentials);
        assert_eq!(auth.status_code(), StatusCode::UNAUTHORIZED);

        let store = AppError::from(StoreError::Backend("offline".into()));
        assert_eq!(store.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        assert_eq!(
            AppError::InvalidTransition("busy".into()).status_code(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_context_keeps_cause_status_and_prefixes_message() {
        let err = AppError::from(AuthError::InvalidCredentials).context("Failed to sign in");
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.to_string(), "Failed to sign in: Invalid credentials");
    }

    #[test]
    fn test_write_error_body_reports_progress() {
        let err = AppError::from(ImportError::Write {
            written: 1,
            total: 2,
            message: "PERMISSION_DENIED".into(),
        })
        .context("Failed to import users");

        let response = err.error_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "Failed to import users: PERMISSION_DENIED");
    }
}
