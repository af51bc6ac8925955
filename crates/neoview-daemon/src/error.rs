//! API error types and their JSON responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use neoview_core::{CacheError, ReadError};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use crate::fetch::FetchError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("missing parameter: {0}")]
    MissingParameter(&'static str),

    #[error("invalid parameter {param}: {detail}")]
    InvalidParameter { param: &'static str, detail: String },

    #[error("index out of range: {0}")]
    InvalidIndex(&'static str),

    #[error("incorrect file type: {0}")]
    UnsupportedFileType(String),

    #[error("upstream fetch failed: {0}")]
    UpstreamFetch(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn invalid(param: &'static str, detail: impl Into<String>) -> Self {
        Self::InvalidParameter {
            param,
            detail: detail.into(),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MissingParameter(_)
            | ApiError::InvalidParameter { .. }
            | ApiError::InvalidIndex(_) => StatusCode::BAD_REQUEST,
            ApiError::UnsupportedFileType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::UpstreamFetch(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Fixed error key the front end matches on
    pub fn key(&self) -> String {
        match self {
            ApiError::MissingParameter(param) => {
                format!("{} parameter is missing", display_name(param))
            }
            ApiError::InvalidParameter { param, .. } => {
                format!("{} parameter is invalid", display_name(param))
            }
            ApiError::InvalidIndex(param) => format!("IndexError on {}", param),
            ApiError::UnsupportedFileType(_) => "incorrect file type".to_string(),
            ApiError::UpstreamFetch(_) => "failed to fetch file".to_string(),
            ApiError::Internal(_) => "internal error".to_string(),
        }
    }

    fn detail(&self) -> String {
        match self {
            ApiError::MissingParameter(_) | ApiError::InvalidIndex(_) => String::new(),
            ApiError::InvalidParameter { detail, .. } => detail.clone(),
            ApiError::UnsupportedFileType(detail) | ApiError::UpstreamFetch(detail) => {
                detail.clone()
            }
            ApiError::Internal(_) => String::new(),
        }
    }
}

fn display_name(param: &str) -> &str {
    if param == "url" {
        "URL"
    } else {
        param
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "Request rejected");
        }

        let body = ErrorResponse {
            error: self.key(),
            message: self.detail(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<FetchError> for ApiError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::InvalidUrl(detail) => ApiError::invalid("url", detail),
            FetchError::Cache(CacheError::NoFileName(url)) => {
                ApiError::invalid("url", format!("URL has no file name: {}", url))
            }
            FetchError::Cache(e) => ApiError::internal(e.to_string()),
            e @ (FetchError::Http(_) | FetchError::Status { .. }) => {
                ApiError::UpstreamFetch(e.to_string())
            }
        }
    }
}

impl From<ReadError> for ApiError {
    fn from(err: ReadError) -> Self {
        match err {
            ReadError::UnknownReader(name) => {
                ApiError::invalid("type", format!("unknown reader type: {}", name))
            }
            e => ApiError::UnsupportedFileType(e.to_string()),
        }
    }
}
