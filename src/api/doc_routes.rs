//! Document generation and download endpoints

use std::collections::BTreeMap;

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, Path, State},
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE},
        StatusCode,
    },
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use serde_json::{Map, Value};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::error::ApiError;
use super::state::AppState;
use crate::documents::{generate_batch, DOCX_MIME_TYPE};
use crate::templates::{RequestFieldMap, TemplateCatalog};

/// Response of a single-document request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub success: bool,
    pub file: String,
    pub download_url: String,
}

/// Response of a multi-document request, keyed by document kind.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchGenerateResponse {
    pub success: bool,
    pub download_urls: BTreeMap<String, String>,
}

/// Which documents a request asks for.
#[derive(Debug, PartialEq, Eq)]
enum Selection {
    /// No kind selector in the body: render the default kind
    Single(String),
    /// Body carries boolean selectors named after catalog kinds
    Multi(Vec<String>),
}

impl Selection {
    fn from_body(body: &Map<String, Value>, catalog: &TemplateCatalog, default_kind: &str) -> Self {
        let selectors: Vec<(&str, bool)> = catalog
            .kinds()
            .filter_map(|kind| match body.get(kind) {
                Some(Value::Bool(selected)) => Some((kind, *selected)),
                _ => None,
            })
            .collect();

        if selectors.is_empty() {
            return Selection::Single(default_kind.to_string());
        }
        Selection::Multi(
            selectors
                .into_iter()
                .filter(|(_, selected)| *selected)
                .map(|(kind, _)| kind.to_string())
                .collect(),
        )
    }

    fn kinds(&self) -> Vec<String> {
        match self {
            Selection::Single(kind) => vec![kind.clone()],
            Selection::Multi(kinds) => kinds.clone(),
        }
    }
}

/// GET /
async fn home_page() -> &'static str {
    "Hello World!"
}

/// POST /generate-doc
///
/// A body without a JSON content type, or one that is not an object, carries
/// no fields and fails validation like an empty form. Malformed JSON is a 400.
async fn generate_doc(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    let body = match payload {
        Ok(Json(Value::Object(body))) => body,
        Ok(Json(_)) | Err(JsonRejection::MissingJsonContentType(_)) => Map::new(),
        Err(rejection) => {
            tracing::warn!("Rejected request body: {}", rejection.body_text());
            return Err(ApiError::InvalidBody(rejection.body_text()));
        }
    };
    let fields = RequestFieldMap::from_json(&body);
    let selection = Selection::from_body(&body, &state.catalog, &state.default_kind);
    let kinds = selection.kinds();

    let artifacts = match generate_batch(&state.catalog, &state.generator, &fields, &kinds).await {
        Ok(artifacts) => artifacts,
        Err(e) => {
            tracing::error!("Template error: {}", e);
            return Err(ApiError::Generation {
                message: e.to_string(),
                kind: match selection {
                    Selection::Multi(_) => e.kind().map(str::to_string),
                    Selection::Single(_) => None,
                },
                required_variables: state.catalog.required_variables_for(&kinds),
            });
        }
    };

    match selection {
        Selection::Single(_) => {
            let artifact = artifacts
                .into_iter()
                .next()
                .ok_or_else(|| ApiError::Internal("No document was generated".to_string()))?;
            Ok(Json(GenerateResponse {
                success: true,
                file: artifact.path.display().to_string(),
                download_url: artifact.download_url,
            })
            .into_response())
        }
        Selection::Multi(_) => Ok(Json(BatchGenerateResponse {
            success: true,
            download_urls: artifacts
                .into_iter()
                .map(|artifact| (artifact.kind, artifact.download_url))
                .collect(),
        })
        .into_response()),
    }
}

/// GET /download/:filename
async fn download_doc(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    let claimed = state.store.claim(&filename).await?;

    let mut response = Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, DOCX_MIME_TYPE)
        .header(
            CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", claimed.file_name()),
        );
    if let Some(size) = claimed.size() {
        response = response.header(CONTENT_LENGTH, size);
    }

    response
        .body(Body::from_stream(claimed.into_stream()))
        .map_err(|e| ApiError::Internal(e.to_string()))
}

/// Create router for document endpoints
pub fn create_doc_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home_page))
        .route("/generate-doc", post(generate_doc))
        .route("/download/:filename", get(download_doc))
        .route("/downloads/:filename", get(download_doc))
        .layer(
            ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            ),
        )
        .with_state(state)
}
