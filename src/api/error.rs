//! API error responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;

use crate::documents::StoreError;
use crate::templates::RequiredVariable;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_variables: Option<Vec<RequiredVariable>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Validation or rendering failed. Reported as 500 together with the
    /// inputs the caller needs to supply.
    #[error("{message}")]
    Generation {
        message: String,
        kind: Option<String>,
        required_variables: Vec<RequiredVariable>,
    },

    #[error("File not found")]
    NotFound,

    #[error("Invalid file name")]
    InvalidFileName,

    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error("{0}")]
    Internal(String),
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => ApiError::NotFound,
            StoreError::InvalidName(_) => ApiError::InvalidFileName,
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Generation { .. } | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::InvalidFileName | ApiError::InvalidBody(_) => StatusCode::BAD_REQUEST,
        };
        let error = self.to_string();
        let body = match self {
            ApiError::Generation {
                kind,
                required_variables,
                ..
            } => ErrorResponse {
                error,
                required_variables: Some(required_variables),
                kind,
            },
            _ => ErrorResponse {
                error,
                required_variables: None,
                kind: None,
            },
        };
        (status, Json(body)).into_response()
    }
}
