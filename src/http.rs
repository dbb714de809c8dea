//! HTTP surface: `POST /api/sonar/analyze` and `GET /health`.

use crate::error::{Error, ErrorKind};
use crate::request::{AnalysisRequest, RawFields};
use crate::workflow::Analyzer;
use axum::Router;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use std::sync::Arc;

pub const ANALYZE_PATH: &str = "/api/sonar/analyze";
pub const HEALTH_PATH: &str = "/health";

const FIELD_REPO_ZIP: &str = "repoZip";
const FIELD_PROJECT_KEY: &str = "projectKey";
const FIELD_ORGANIZATION: &str = "organization";
const FIELD_BRANCH: &str = "branch";

#[derive(Clone)]
pub struct AppState {
    analyzer: Analyzer,
    default_branch: Arc<str>,
}

impl AppState {
    pub fn new(analyzer: Analyzer, default_branch: impl Into<Arc<str>>) -> Self {
        Self { analyzer, default_branch: default_branch.into() }
    }
}

pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route(ANALYZE_PATH, post(analyze))
        .route(HEALTH_PATH, get(health))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn analyze(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let fields = match multipart {
        Ok(multipart) => match read_fields(multipart).await {
            Ok(fields) => fields,
            Err(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                tracing::warn!(error = %e, "Upload rejected");
                return (e.status(), e.body_text()).into_response();
            },
            Err(e) => {
                tracing::debug!(error = %e, "Malformed multipart body");
                RawFields::default()
            },
        },
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Request is not multipart");
            RawFields::default()
        },
    };
    let request = match AnalysisRequest::validate(fields, headers.get(AUTHORIZATION), &state.default_branch) {
        Ok(request) => request,
        Err(err) => return error_response(err),
    };
    match state.analyzer.analyze(request).await {
        Ok(output) => (StatusCode::OK, output.to_string()).into_response(),
        Err(err) => error_response(err),
    }
}

/// Collect the known form fields. Later duplicates replace earlier ones and
/// unknown fields are skipped.
async fn read_fields(mut multipart: Multipart) -> Result<RawFields, MultipartError> {
    let mut fields = RawFields::default();
    while let Some(field) = multipart.next_field().await? {
        match field.name() {
            Some(FIELD_REPO_ZIP) => fields.repo_zip = Some(field.bytes().await?),
            Some(FIELD_PROJECT_KEY) => fields.project_key = Some(field.text().await?),
            Some(FIELD_ORGANIZATION) => fields.organization = Some(field.text().await?),
            Some(FIELD_BRANCH) => fields.branch = Some(field.text().await?),
            _ => {},
        }
    }
    Ok(fields)
}

fn error_response(err: Error) -> Response {
    let kind: &ErrorKind = &err;
    if kind.is_client_error() {
        tracing::info!(reason = %kind, "Analysis request rejected");
        return (StatusCode::BAD_REQUEST, kind.to_string()).into_response();
    }
    tracing::error!(error = ?err, "Analysis failed");
    (StatusCode::INTERNAL_SERVER_ERROR, format!("Error SonarCloud analysis: {kind}")).into_response()
}
