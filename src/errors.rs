use crate::store::StoreError;
use axum::{Json, http::StatusCode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("sign-in failed: {0}")]
    Auth(String),

    #[error("failed to load attendance data: {0}")]
    Load(#[source] StoreError),

    #[error("{action} failed: {source}")]
    Write {
        action: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("not signed in")]
    NotSignedIn,

    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    #[error("{0}")]
    Invalid(String),

    #[error("{0} is already in progress")]
    Busy(String),
}

impl TrackerError {
    pub fn write(action: &'static str) -> impl FnOnce(StoreError) -> Self {
        move |source| Self::Write { action, source }
    }

    pub fn subject_not_found(id: &str) -> Self {
        Self::NotFound {
            entity: "subject",
            id: id.to_string(),
        }
    }
}

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    pub fn internal(err: impl std::error::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
        }
    }
}

impl From<TrackerError> for AppError {
    fn from(err: TrackerError) -> Self {
        let status = match &err {
            TrackerError::Invalid(_) => StatusCode::BAD_REQUEST,
            TrackerError::Auth(_) | TrackerError::NotSignedIn => StatusCode::UNAUTHORIZED,
            TrackerError::NotFound { .. } => StatusCode::NOT_FOUND,
            TrackerError::Busy(_) => StatusCode::CONFLICT,
            TrackerError::Load(_) | TrackerError::Write { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::internal(err)
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, "{}", self.message);
        }
        let body = serde_json::json!({ "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracker_errors_map_to_status_codes() {
        let busy: AppError = TrackerError::Busy("mark 2024-01-01".into()).into();
        assert_eq!(busy.status, StatusCode::CONFLICT);
        assert_eq!(busy.message, "mark 2024-01-01 is already in progress");

        let missing: AppError = TrackerError::subject_not_found("s1").into();
        assert_eq!(missing.status, StatusCode::NOT_FOUND);
        assert_eq!(missing.message, "subject 's1' not found");

        let down = StoreError::Io(std::io::Error::other("down"));
        let write: AppError = TrackerError::write("mark attendance")(down).into();
        assert_eq!(write.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(write.message.starts_with("mark attendance failed"));

        let anon: AppError = TrackerError::NotSignedIn.into();
        assert_eq!(anon.status, StatusCode::UNAUTHORIZED);
    }
}
