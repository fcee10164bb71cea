use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

type Cause = Box<dyn std::error::Error + Send + Sync>;

/// Classified failure returned by every layer of the users pipeline.
///
/// The message is always safe to show to the client. The cause of an
/// internal error is kept for logs only.
#[derive(Debug, Error)]
pub enum RestError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{message}")]
    InternalServerError {
        message: String,
        #[source]
        cause: Option<Cause>,
    },
}

/// Wire shape of an error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody<'a> {
    pub status: u16,
    pub message: &'a str,
    pub error: &'a str,
}

impl RestError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn internal<E>(message: impl Into<String>, cause: E) -> Self
    where
        E: Into<Cause>,
    {
        Self::InternalServerError {
            message: message.into(),
            cause: Some(cause.into()),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InternalServerError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::BadRequest(m) | Self::NotFound(m) => m,
            Self::InternalServerError { message, .. } => message,
        }
    }

    /// Machine-readable tag sent as the `error` field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::NotFound(_) => "not_found",
            Self::InternalServerError { .. } => "internal_server_error",
        }
    }

    fn body(&self) -> ErrorBody<'_> {
        ErrorBody {
            status: self.status().as_u16(),
            message: self.message(),
            error: self.kind(),
        }
    }
}

impl IntoResponse for RestError {
    fn into_response(self) -> Response {
        if let Self::InternalServerError {
            message,
            cause: Some(cause),
        } = &self
        {
            error!(error = %cause, %message, "internal error");
        }
        (self.status(), Json(self.body())).into_response()
    }
}
