use std::io::Cursor;
use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;
use tokio::task::JoinError;

use super::repository::ClaimStore;
use super::service::{ClaimListParams, ClaimsService, ClaimsServiceError};

/// Router builder exposing the dashboard endpoints for claims, metrics, and
/// administrative resets. Store calls run on the blocking pool so a long
/// ingestion never stalls the async workers.
pub fn claims_router<S>(service: Arc<ClaimsService<S>>) -> Router
where
    S: ClaimStore + 'static,
{
    let upload_limit = DefaultBodyLimit::max(service.upload_limits().max_bytes);
    Router::new()
        .route("/api/claims", get(list_handler::<S>))
        .route(
            "/api/claims/upload",
            post(upload_handler::<S>).layer(upload_limit),
        )
        .route("/api/metrics", get(metrics_handler::<S>))
        .route("/api/admin/reset", post(reset_handler::<S>))
        .route("/api/admin/drop", post(drop_handler::<S>))
        .with_state(service)
}

pub(crate) async fn list_handler<S>(
    State(service): State<Arc<ClaimsService<S>>>,
    Query(params): Query<ClaimListParams>,
) -> Response
where
    S: ClaimStore + 'static,
{
    match tokio::task::spawn_blocking(move || service.list(&params)).await {
        Ok(Ok(page)) => (StatusCode::OK, axum::Json(page)).into_response(),
        Ok(Err(err)) => error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
        Err(err) => task_failed(err),
    }
}

pub(crate) async fn upload_handler<S>(
    State(service): State<Arc<ClaimsService<S>>>,
    mut multipart: Multipart,
) -> Response
where
    S: ClaimStore + 'static,
{
    let mut upload = None;
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                if field.name() != Some("file") {
                    continue;
                }
                match field.bytes().await {
                    Ok(bytes) => {
                        upload = Some(bytes);
                        break;
                    }
                    Err(err) => return error_response(err.status(), err.body_text()),
                }
            }
            Ok(None) => break,
            Err(err) => return error_response(err.status(), err.body_text()),
        }
    }

    let Some(bytes) = upload else {
        return error_response(StatusCode::BAD_REQUEST, "No file uploaded");
    };

    let outcome =
        tokio::task::spawn_blocking(move || service.ingest_reader(Cursor::new(bytes))).await;

    match outcome {
        Ok(Ok(summary)) => (StatusCode::OK, axum::Json(summary)).into_response(),
        Ok(Err(ClaimsServiceError::Import(err))) => {
            error_response(StatusCode::BAD_REQUEST, err.to_string())
        }
        Ok(Err(err)) => error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
        Err(err) => {
            tracing::error!(error = %err, "ingestion task failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Upload failed")
        }
    }
}

pub(crate) async fn metrics_handler<S>(State(service): State<Arc<ClaimsService<S>>>) -> Response
where
    S: ClaimStore + 'static,
{
    match tokio::task::spawn_blocking(move || service.metrics()).await {
        Ok(Ok(metrics)) => (StatusCode::OK, axum::Json(metrics)).into_response(),
        Ok(Err(err)) => error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
        Err(err) => task_failed(err),
    }
}

pub(crate) async fn reset_handler<S>(State(service): State<Arc<ClaimsService<S>>>) -> Response
where
    S: ClaimStore + 'static,
{
    match tokio::task::spawn_blocking(move || service.reset()).await {
        Ok(Ok(())) => admin_ok("All tables truncated"),
        Ok(Err(err)) => error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
        Err(err) => task_failed(err),
    }
}

pub(crate) async fn drop_handler<S>(State(service): State<Arc<ClaimsService<S>>>) -> Response
where
    S: ClaimStore + 'static,
{
    match tokio::task::spawn_blocking(move || service.drop_schema()).await {
        Ok(Ok(())) => admin_ok("All tables dropped and recreated"),
        Ok(Err(err)) => error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
        Err(err) => task_failed(err),
    }
}

fn admin_ok(message: &str) -> Response {
    let payload = json!({
        "ok": true,
        "message": message,
    });
    (StatusCode::OK, axum::Json(payload)).into_response()
}

fn task_failed(err: JoinError) -> Response {
    tracing::error!(error = %err, "claim store task failed");
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    let payload = json!({
        "error": message.into(),
    });
    (status, axum::Json(payload)).into_response()
}
