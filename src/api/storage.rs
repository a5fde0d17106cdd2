/// Direct object access: signed upload target and asset serving
use crate::{context::AppContext, error::{ApiError, ApiResult}, storage::paths};
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/storage/upload", put(receive_upload))
        .route("/storage/*key", get(serve_object))
}

#[derive(Deserialize)]
struct UploadQuery {
    token: String,
}

/// Target of a signed upload URL. The token authorizes exactly one
/// object key; the body is the raw object content.
async fn receive_upload(
    State(ctx): State<AppContext>,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> ApiResult<Json<serde_json::Value>> {
    let key = ctx
        .uploads
        .receive_signed_upload(&query.token, body.to_vec())
        .await?;

    Ok(Json(json!({ "key": key })))
}

async fn serve_object(
    State(ctx): State<AppContext>,
    Path(key): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let data = ctx
        .uploads
        .get_object(&key)
        .await?
        .ok_or_else(|| ApiError::NotFound("Object not found".to_string()))?;

    let content_type = paths::extension(&key)
        .map(|ext| content_type_for(&ext))
        .unwrap_or("application/octet-stream");

    Ok(([(header::CONTENT_TYPE, content_type)], data))
}

fn content_type_for(ext: &str) -> &'static str {
    match ext {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "mp4" => "video/mp4",
        "csv" => "text/csv",
        "txt" | "md" | "py" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}
