/// Quiz submission and reporting handlers
use crate::{
    auth::{require_permission, AdminUser, AuthUser, Permission},
    context::AppContext,
    error::ApiResult,
    quizzes::{QuizResults, SubmissionOutcome},
    storage::paths,
};
use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/cards/:directory/:seq/quiz/submit", post(submit))
        .route("/cards/:directory/:seq/quiz/history", get(history))
        .route("/cards/:directory/:seq/quiz/results", get(results))
        .route("/cards/:directory/:seq/quiz/export", get(export_csv))
}

#[derive(Deserialize)]
struct SubmitInput {
    answers: Vec<serde_json::Value>,
}

async fn submit(
    State(ctx): State<AppContext>,
    auth: AuthUser,
    Path((directory, seq)): Path<(String, i64)>,
    Json(input): Json<SubmitInput>,
) -> ApiResult<Json<SubmissionOutcome>> {
    let directory = paths::sanitize_segment(&directory)?;
    Ok(Json(
        ctx.quizzes
            .submit(&auth.user_id, &directory, seq, &input.answers)
            .await?,
    ))
}

async fn history(
    State(ctx): State<AppContext>,
    auth: AuthUser,
    Path((directory, seq)): Path<(String, i64)>,
) -> ApiResult<Json<SubmissionOutcome>> {
    let directory = paths::sanitize_segment(&directory)?;
    Ok(Json(
        ctx.quizzes
            .history(&auth.user_id, &directory, seq)
            .await?,
    ))
}

async fn results(
    State(ctx): State<AppContext>,
    admin: AdminUser,
    Path((directory, seq)): Path<(String, i64)>,
) -> ApiResult<Json<QuizResults>> {
    require_permission(admin.role, Permission::ViewResults)?;

    let directory = paths::sanitize_segment(&directory)?;
    Ok(Json(ctx.quizzes.results(&directory, seq).await?))
}

async fn export_csv(
    State(ctx): State<AppContext>,
    admin: AdminUser,
    Path((directory, seq)): Path<(String, i64)>,
) -> ApiResult<impl IntoResponse> {
    require_permission(admin.role, Permission::ViewResults)?;

    let directory = paths::sanitize_segment(&directory)?;
    let csv = ctx.quizzes.export_csv(&directory, seq).await?;

    let disposition = format!(
        "attachment; filename=\"quiz_{}_{}.csv\"",
        directory, seq
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    ))
}
