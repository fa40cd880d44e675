//! HTTP error handling and automated response generation
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::{
    db::errors::DatabaseError,
    services::{errors::StorageError, media, sessions::errors::SessionStorageError},
};

/// Represents an HTTP status code, optionally with a custom message.
#[derive(Debug)]
pub struct HttpError {
    /// The numeric HTTP status code to respond with.
    status: StatusCode,
    /// The message to include in the response.
    message: Option<String>,
}

impl From<StatusCode> for HttpError {
    fn from(err: StatusCode) -> Self {
        Self {
            status: err,
            message: None,
        }
    }
}

impl HttpError {
    /// Construct a new HTTP error with a given status code and message.
    pub const fn new(status: StatusCode, message: Option<String>) -> Self {
        Self { status, message }
    }

    /// Shorthand for an error carrying a static message.
    pub fn with_message(status: StatusCode, message: &str) -> Self {
        Self::new(status, Some(message.to_owned()))
    }

    pub const fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let message = self
            .message
            .unwrap_or_else(|| self.status.canonical_reason().unwrap_or("").to_owned());
        (self.status, Json(json!({"message": message}))).into_response()
    }
}

// Storage failures are logged in full but never echoed to the client.
impl From<DatabaseError> for HttpError {
    fn from(err: DatabaseError) -> Self {
        error!("Error raised from database in handler: {err}");
        Self::from(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl From<SessionStorageError> for HttpError {
    fn from(err: SessionStorageError) -> Self {
        error!("Error raised from session store in handler: {err}");
        Self::from(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl From<StorageError> for HttpError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::DatabaseError(err) => err.into(),
            StorageError::SessionStorageError(err) => err.into(),
        }
    }
}

impl From<media::errors::StorageError> for HttpError {
    fn from(err: media::errors::StorageError) -> Self {
        error!("Error raised from media store in handler: {err}");
        Self::from(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn custom_message_is_rendered() {
        let response =
            HttpError::with_message(StatusCode::CONFLICT, "Mobile already registered").into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(
            body_json(response).await,
            json!({"message": "Mobile already registered"})
        );
    }

    #[tokio::test]
    async fn falls_back_to_canonical_reason() {
        let response = HttpError::from(StatusCode::NOT_FOUND).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await, json!({"message": "Not Found"}));
    }

    #[test]
    fn database_errors_are_internal() {
        let err = HttpError::from(DatabaseError::from(sqlx::Error::RowNotFound));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.message.is_none());
    }
}
