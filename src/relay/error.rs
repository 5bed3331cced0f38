use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::providers;

/// A failed relay request. The response body is `{"detail": "<message>"}`.
#[derive(Error, Debug)]
pub(crate) enum Error {
    #[error(
        "Missing required configuration: {}. Please set these in the environment or enter them in the UI.",
        .0.join(", ")
    )]
    MissingConfiguration(Vec<&'static str>),

    #[error("Invalid base URL \"{0}\": {1}")]
    InvalidBaseUrl(String, #[source] url::ParseError),

    #[error("Failed to create the inference client: {0}")]
    Client(#[source] providers::Error),

    #[error("URL is required")]
    CsvUrlRequired,

    #[error("SOCRATA_APP_TOKEN not configured. Please set it in the environment.")]
    CsvTokenMissing,

    /// The CSV host answered with an error status, which is passed on.
    #[error("Failed to fetch CSV: {reason}")]
    CsvUpstream { status: StatusCode, reason: String },

    #[error("Failed to fetch CSV: {0}")]
    CsvRequest(#[source] reqwest::Error),

    #[error("Empty response from judge model")]
    EmptyJudgeResponse,

    #[error("Failed to parse judge response: {0}")]
    MalformedJudgeResponse(#[source] serde_json::Error),

    #[error("Invalid judge response structure: {0}")]
    InvalidJudgeResponse(#[source] serde_json::Error),

    #[error("Judge evaluation failed: {0}")]
    Judge(#[source] providers::Error),

    #[error("Not found")]
    NotFound,
}

impl Error {
    pub(crate) fn status(&self) -> StatusCode {
        match self {
            Error::MissingConfiguration(_) | Error::InvalidBaseUrl(..) | Error::CsvUrlRequired => {
                StatusCode::BAD_REQUEST
            }
            Error::CsvUpstream { status, .. } => *status,
            Error::NotFound => StatusCode::NOT_FOUND,
            Error::Client(_)
            | Error::CsvTokenMissing
            | Error::CsvRequest(_)
            | Error::EmptyJudgeResponse
            | Error::MalformedJudgeResponse(_)
            | Error::InvalidJudgeResponse(_)
            | Error::Judge(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "request rejected");
        }

        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}
