//! HTTP handlers. Every response body is an [`ApiResponse`] envelope.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Json, Query};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, warn};

use crate::error::ChronicleError;

pub mod analytics;
pub mod conversations;
pub mod episodes;
pub mod members;
pub mod metrics;
pub mod service;
pub mod team;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            count: None,
            summary: None,
            error: None,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_summary(mut self, summary: Value) -> Self {
        self.summary = Some(summary);
        self
    }
}

impl<T> ApiResponse<Vec<T>> {
    pub fn list(data: Vec<T>) -> Self {
        let count = data.len();
        Self {
            count: Some(count),
            ..Self::ok(data)
        }
    }
}

impl ApiResponse<()> {
    pub fn done(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            count: None,
            summary: None,
            error: None,
            message: Some(message.into()),
        }
    }

    fn failure(error: String, message: Option<String>) -> Self {
        Self {
            success: false,
            data: None,
            count: None,
            summary: None,
            error: Some(error),
            message,
        }
    }
}

/// A failed request: the underlying error plus the action that failed.
#[derive(Debug)]
pub struct ApiError {
    context: &'static str,
    source: ChronicleError,
}

impl ApiError {
    pub fn new(context: &'static str, source: ChronicleError) -> Self {
        Self { context, source }
    }

    pub fn status(&self) -> StatusCode {
        match self.source {
            ChronicleError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self.source {
            ChronicleError::NotFound(message) => ApiResponse::failure(message, None),
            ChronicleError::Validation(message) => {
                warn!(context = self.context, %message, "rejected request");
                ApiResponse::failure(self.context.to_string(), Some(message))
            }
            other => {
                error!(context = self.context, error = %other, "request failed");
                ApiResponse::failure(self.context.to_string(), Some(other.to_string()))
            }
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<Json<ApiResponse<T>>, ApiError>;

pub trait Context<T> {
    fn context(self, context: &'static str) -> std::result::Result<T, ApiError>;
}

impl<T> Context<T> for crate::error::Result<T> {
    fn context(self, context: &'static str) -> std::result::Result<T, ApiError> {
        self.map_err(|source| ApiError::new(context, source))
    }
}

/// Unwraps a JSON body, turning extractor rejections into validation errors.
pub fn body<T>(
    payload: std::result::Result<Json<T>, JsonRejection>,
    context: &'static str,
) -> std::result::Result<T, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| {
            ApiError::new(context, ChronicleError::Validation(rejection.body_text()))
        })
}

pub fn query<T>(
    params: std::result::Result<Query<T>, QueryRejection>,
    context: &'static str,
) -> std::result::Result<T, ApiError> {
    params
        .map(|Query(value)| value)
        .map_err(|rejection| {
            ApiError::new(context, ChronicleError::Validation(rejection.body_text()))
        })
}

pub fn to_summary<S: Serialize>(
    summary: &S,
    context: &'static str,
) -> std::result::Result<Value, ApiError> {
    serde_json::to_value(summary)
        .map_err(ChronicleError::from)
        .context(context)
}
