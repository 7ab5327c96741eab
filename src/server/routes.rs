use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{header, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::errors::{IntakeError, IntakeResult};
use crate::protocol::ApiResponse;
use crate::server::intake::{self, AddItemParams};
use crate::server::state::AppState;
use crate::server::static_files;

const USAGE_HINT: &str = "Use /addItem?code=ITEM&qtty=QTTY&date=DATE to append to the intake log. \
Use /getTime to read the server clock.";

pub async fn health_handler() -> Json<ApiResponse> {
    Json(ApiResponse::ok())
}

pub async fn time_handler(State(state): State<Arc<AppState>>) -> Json<ApiResponse> {
    Json(ApiResponse::server_time(state.clock.now_millis()))
}

pub async fn add_item_handler(
    State(state): State<Arc<AppState>>,
    query: Result<Query<AddItemParams>, QueryRejection>,
) -> IntakeResult<Json<ApiResponse>> {
    let Query(params) = query.map_err(|e| IntakeError::InvalidInput(e.body_text()))?;

    let record = intake::validate(
        &params,
        state.clock.now_millis(),
        state.require_positive_qtty,
    )
    .inspect_err(|e| tracing::info!(error = %e, "addItem rejected"))?;

    let written = state.store.append(&record).await?;
    Ok(Json(ApiResponse::written(written)))
}

/// `/` serves the public index, or a usage hint when none is installed.
pub async fn root_handler(State(state): State<Arc<AppState>>) -> Response {
    match static_files::load(&state.public_dir, static_files::INDEX_FILE).await {
        Some(found) => file_response(found),
        None => Json(ApiResponse::message(USAGE_HINT)).into_response(),
    }
}

/// Any other GET path: a public asset or a JSON 404.
pub async fn static_handler(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
) -> Response {
    if method != Method::GET {
        return IntakeError::NotFound.into_response();
    }
    match static_files::load(&state.public_dir, uri.path()).await {
        Some(found) => file_response(found),
        None => IntakeError::NotFound.into_response(),
    }
}

fn file_response((bytes, content_type): (Vec<u8>, &'static str)) -> Response {
    (StatusCode::OK, [(header::CONTENT_TYPE, content_type)], bytes).into_response()
}
