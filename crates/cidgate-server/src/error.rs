use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use cidgate_core::CoreError;
use cidgate_types::{ContentId, ParseError};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

pub const PROBLEM_CONTENT_TYPE: &str = "application/problem+json";

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Content {cid} already exists")]
    ContentExists { cid: ContentId },

    #[error("Content {cid} not found")]
    ContentNotFound { cid: ContentId },

    #[error(transparent)]
    InvalidCid(ParseError),

    #[error("missing multipart field `{0}`")]
    MissingField(&'static str),

    #[error("invalid multipart body: {0}")]
    Multipart(String),

    #[error("authentication required")]
    Unauthorized,

    #[error(transparent)]
    Core(CoreError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<CoreError> for ServerError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidIdentifier(e) => Self::InvalidCid(e),
            other => Self::Core(other),
        }
    }
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::ContentExists { .. } => StatusCode::CONFLICT,
            Self::ContentNotFound { .. } => StatusCode::NOT_FOUND,
            Self::InvalidCid(_) | Self::MissingField(_) | Self::Multipart(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Core(_) | Self::Config(_) | Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn problem(&self) -> Option<Problem> {
        match self {
            Self::ContentExists { cid } => Some(Problem {
                kind: "/content-already-exists",
                title: "Content already exists",
                details: self.to_string(),
                cid: cid.to_string(),
            }),
            Self::ContentNotFound { cid } => Some(Problem {
                kind: "/content-not-found",
                title: "Content not found",
                details: self.to_string(),
                cid: cid.to_string(),
            }),
            _ => None,
        }
    }
}

/// Problem document body for conflict and absence responses.
#[derive(Debug, Serialize)]
struct Problem {
    #[serde(rename = "type")]
    kind: &'static str,
    title: &'static str,
    details: String,
    cid: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }

        if let Some(problem) = self.problem() {
            let body = match serde_json::to_vec(&problem) {
                Ok(body) => body,
                Err(e) => return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
            };
            let mut response = (status, body).into_response();
            response.headers_mut().insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static(PROBLEM_CONTENT_TYPE),
            );
            return response;
        }

        if let Self::Unauthorized = self {
            let mut response = status.into_response();
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Basic realm=\"cidgate\""),
            );
            return response;
        }

        (status, self.to_string()).into_response()
    }
}

pub type ServerResult<T> = Result<T, ServerError>;
