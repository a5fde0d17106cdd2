/// Cloud message handlers
use crate::{
    auth::{AdminUser, AuthUser},
    cloud::CloudMessage,
    context::AppContext,
    error::ApiResult,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use serde::Deserialize;

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/cloud", get(list_own).post(create))
        .route("/cloud/:id", delete(delete_own))
}

async fn list_own(
    State(ctx): State<AppContext>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<CloudMessage>>> {
    Ok(Json(ctx.cloud.list_for_user(&auth.user_id).await?))
}

#[derive(Deserialize)]
struct CreateInput {
    name: String,
    surname: String,
    card_id: String,
    filename: String,
    message: String,
}

async fn create(
    State(ctx): State<AppContext>,
    _admin: AdminUser,
    Json(input): Json<CreateInput>,
) -> ApiResult<(StatusCode, Json<CloudMessage>)> {
    let message = ctx
        .cloud
        .create_for_named_user(
            &input.name,
            &input.surname,
            &input.card_id,
            &input.filename,
            &input.message,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(message)))
}

async fn delete_own(
    State(ctx): State<AppContext>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    ctx.cloud.delete_own(&auth.user_id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
