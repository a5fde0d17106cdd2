/// Card curation and asset handlers
use crate::{
    auth::AdminUser,
    cards::{Card, EvalMode, Flashcard, InsertPosition, QuizQuestion},
    cards::manager::MoveDirection,
    context::AppContext,
    error::{ApiError, ApiResult},
    storage::paths,
    uploads::SignedUpload,
};
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;
use std::collections::HashMap;

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/cards/:directory", get(list_public).post(create))
        .route("/cards/:directory/all", get(list_admin))
        .route("/cards/:directory/:seq", delete(delete_card))
        .route("/cards/:directory/:seq/title", put(set_title))
        .route("/cards/:directory/:seq/visible", put(set_visible))
        .route("/cards/:directory/:seq/cloud", put(set_cloud))
        .route("/cards/:directory/:seq/presentation", put(set_presentation))
        .route("/cards/:directory/:seq/plan", put(set_plan))
        .route("/cards/:directory/:seq/content", put(set_content))
        .route("/cards/:directory/:seq/eval-mode", put(set_eval_mode))
        .route("/cards/:directory/:seq/show-score", put(set_show_score))
        .route("/cards/:directory/:seq/move", post(move_card))
        .route("/cards/:directory/:seq/background", post(upload_background))
        .route(
            "/cards/:directory/:seq/files",
            post(upload_file).patch(patch_file).delete(delete_file),
        )
        .route("/cards/:directory/:seq/files/sign", post(sign_file_upload))
        .route(
            "/cards/:directory/:seq/files/confirm",
            post(confirm_file_upload),
        )
        .route("/cards/:directory/:seq/files/order", put(reorder_files))
        .route("/cards/:directory/:seq/videos", post(insert_video).patch(patch_video))
        .route("/cards/:directory/:seq/videos/:index", delete(remove_video))
        .route("/cards/:directory/:seq/quiz", put(replace_quiz))
        .route(
            "/cards/:directory/:seq/quiz/:question_id/image",
            post(upload_quiz_image).delete(delete_quiz_image),
        )
        .route("/cards/:directory/:seq/flashcards", put(set_flashcards))
}

/// Read a multipart request into its text fields and the single
/// uploaded file, if any.
async fn read_upload(
    mut multipart: Multipart,
) -> ApiResult<(HashMap<String, String>, Option<(String, Vec<u8>)>)> {
    let mut fields = HashMap::new();
    let mut file = None;

    while let Some(part) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("Malformed multipart body: {}", e)))?
    {
        let name = part.name().unwrap_or_default().to_string();

        if let Some(filename) = part.file_name() {
            let filename = filename.to_string();
            let data = part
                .bytes()
                .await
                .map_err(|e| ApiError::Validation(format!("Failed to read upload: {}", e)))?;
            file = Some((filename, data.to_vec()));
        } else {
            let value = part
                .text()
                .await
                .map_err(|e| ApiError::Validation(format!("Failed to read field: {}", e)))?;
            fields.insert(name, value);
        }
    }

    Ok((fields, file))
}

fn require_file(file: Option<(String, Vec<u8>)>) -> ApiResult<(String, Vec<u8>)> {
    file.ok_or_else(|| ApiError::Validation("Missing file part".to_string()))
}

async fn list_public(
    State(ctx): State<AppContext>,
    Path(directory): Path<String>,
) -> ApiResult<Json<Vec<Card>>> {
    let directory = paths::sanitize_segment(&directory)?;
    Ok(Json(ctx.cards.list_public(&directory).await?))
}

async fn list_admin(
    State(ctx): State<AppContext>,
    _admin: AdminUser,
    Path(directory): Path<String>,
) -> ApiResult<Json<Vec<Card>>> {
    let directory = paths::sanitize_segment(&directory)?;
    Ok(Json(ctx.cards.list_admin(&directory).await?))
}

async fn create(
    State(ctx): State<AppContext>,
    _admin: AdminUser,
    Path(directory): Path<String>,
) -> ApiResult<(StatusCode, Json<Card>)> {
    let directory = paths::sanitize_segment(&directory)?;
    let card = ctx.cards.create(&directory).await?;
    Ok((StatusCode::CREATED, Json(card)))
}

async fn delete_card(
    State(ctx): State<AppContext>,
    _admin: AdminUser,
    Path((directory, seq)): Path<(String, i64)>,
) -> ApiResult<StatusCode> {
    let directory = paths::sanitize_segment(&directory)?;
    ctx.uploads.delete_card(&directory, seq).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct TitleInput {
    title: String,
}

async fn set_title(
    State(ctx): State<AppContext>,
    _admin: AdminUser,
    Path((directory, seq)): Path<(String, i64)>,
    Json(input): Json<TitleInput>,
) -> ApiResult<Json<Card>> {
    let directory = paths::sanitize_segment(&directory)?;
    Ok(Json(ctx.cards.set_title(&directory, seq, &input.title).await?))
}

#[derive(Deserialize)]
struct VisibleInput {
    visible: bool,
}

async fn set_visible(
    State(ctx): State<AppContext>,
    _admin: AdminUser,
    Path((directory, seq)): Path<(String, i64)>,
    Json(input): Json<VisibleInput>,
) -> ApiResult<Json<Card>> {
    let directory = paths::sanitize_segment(&directory)?;
    Ok(Json(
        ctx.cards.set_visible(&directory, seq, input.visible).await?,
    ))
}

#[derive(Deserialize)]
struct CloudInput {
    cloud: bool,
}

async fn set_cloud(
    State(ctx): State<AppContext>,
    _admin: AdminUser,
    Path((directory, seq)): Path<(String, i64)>,
    Json(input): Json<CloudInput>,
) -> ApiResult<Json<Card>> {
    let directory = paths::sanitize_segment(&directory)?;
    Ok(Json(ctx.cards.set_cloud(&directory, seq, input.cloud).await?))
}

#[derive(Deserialize)]
struct LinesInput {
    lines: Vec<String>,
}

async fn set_presentation(
    State(ctx): State<AppContext>,
    _admin: AdminUser,
    Path((directory, seq)): Path<(String, i64)>,
    Json(input): Json<LinesInput>,
) -> ApiResult<Json<Card>> {
    let directory = paths::sanitize_segment(&directory)?;
    Ok(Json(
        ctx.cards
            .set_presentation(&directory, seq, &input.lines)
            .await?,
    ))
}

async fn set_plan(
    State(ctx): State<AppContext>,
    _admin: AdminUser,
    Path((directory, seq)): Path<(String, i64)>,
    Json(input): Json<LinesInput>,
) -> ApiResult<Json<Card>> {
    let directory = paths::sanitize_segment(&directory)?;
    Ok(Json(ctx.cards.set_plan(&directory, seq, &input.lines).await?))
}

#[derive(Deserialize)]
struct ContentInput {
    content: Vec<serde_json::Value>,
    content_version: i64,
}

async fn set_content(
    State(ctx): State<AppContext>,
    _admin: AdminUser,
    Path((directory, seq)): Path<(String, i64)>,
    Json(input): Json<ContentInput>,
) -> ApiResult<Json<Card>> {
    let directory = paths::sanitize_segment(&directory)?;
    Ok(Json(
        ctx.cards
            .set_content(&directory, seq, &input.content, input.content_version)
            .await?,
    ))
}

#[derive(Deserialize)]
struct EvalModeInput {
    mode: String,
}

async fn set_eval_mode(
    State(ctx): State<AppContext>,
    _admin: AdminUser,
    Path((directory, seq)): Path<(String, i64)>,
    Json(input): Json<EvalModeInput>,
) -> ApiResult<Json<Card>> {
    let directory = paths::sanitize_segment(&directory)?;
    let mode = EvalMode::parse(&input.mode)
        .ok_or_else(|| ApiError::Validation(format!("Unknown evaluation mode: {}", input.mode)))?;
    Ok(Json(ctx.cards.set_eval_mode(&directory, seq, mode).await?))
}

#[derive(Deserialize)]
struct ShowScoreInput {
    show_score: bool,
}

async fn set_show_score(
    State(ctx): State<AppContext>,
    _admin: AdminUser,
    Path((directory, seq)): Path<(String, i64)>,
    Json(input): Json<ShowScoreInput>,
) -> ApiResult<Json<Card>> {
    let directory = paths::sanitize_segment(&directory)?;
    Ok(Json(
        ctx.cards
            .set_show_score(&directory, seq, input.show_score)
            .await?,
    ))
}

#[derive(Deserialize)]
struct MoveInput {
    direction: String,
}

async fn move_card(
    State(ctx): State<AppContext>,
    _admin: AdminUser,
    Path((directory, seq)): Path<(String, i64)>,
    Json(input): Json<MoveInput>,
) -> ApiResult<Json<Card>> {
    let directory = paths::sanitize_segment(&directory)?;
    let direction = match input.direction.as_str() {
        "up" => MoveDirection::Up,
        "down" => MoveDirection::Down,
        other => {
            return Err(ApiError::Validation(format!(
                "Unknown move direction: {}",
                other
            )))
        }
    };
    Ok(Json(ctx.cards.move_card(&directory, seq, direction).await?))
}

async fn upload_background(
    State(ctx): State<AppContext>,
    _admin: AdminUser,
    Path((directory, seq)): Path<(String, i64)>,
    multipart: Multipart,
) -> ApiResult<Json<Card>> {
    let directory = paths::sanitize_segment(&directory)?;
    let (_fields, file) = read_upload(multipart).await?;
    let (filename, data) = require_file(file)?;

    Ok(Json(
        ctx.uploads
            .upload_background(&directory, seq, &filename, data)
            .await?,
    ))
}

async fn upload_file(
    State(ctx): State<AppContext>,
    _admin: AdminUser,
    Path((directory, seq)): Path<(String, i64)>,
    multipart: Multipart,
) -> ApiResult<Json<Card>> {
    let directory = paths::sanitize_segment(&directory)?;
    let (fields, file) = read_upload(multipart).await?;
    let (filename, data) = require_file(file)?;

    let label = fields.get("label").cloned().unwrap_or_default();
    let position = InsertPosition::parse(fields.get("position").map(String::as_str));

    Ok(Json(
        ctx.uploads
            .upload_file(&directory, seq, &label, &filename, data, position)
            .await?,
    ))
}

#[derive(Deserialize)]
struct SignInput {
    filename: String,
}

async fn sign_file_upload(
    State(ctx): State<AppContext>,
    _admin: AdminUser,
    Path((directory, seq)): Path<(String, i64)>,
    Json(input): Json<SignInput>,
) -> ApiResult<Json<SignedUpload>> {
    let directory = paths::sanitize_segment(&directory)?;
    Ok(Json(
        ctx.uploads
            .sign_file_upload(&directory, seq, &input.filename)
            .await?,
    ))
}

#[derive(Deserialize)]
struct ConfirmInput {
    filename: String,
    #[serde(default)]
    label: String,
    position: Option<String>,
}

async fn confirm_file_upload(
    State(ctx): State<AppContext>,
    _admin: AdminUser,
    Path((directory, seq)): Path<(String, i64)>,
    Json(input): Json<ConfirmInput>,
) -> ApiResult<Json<Card>> {
    let directory = paths::sanitize_segment(&directory)?;
    let position = InsertPosition::parse(input.position.as_deref());
    Ok(Json(
        ctx.uploads
            .confirm_file_upload(&directory, seq, &input.label, &input.filename, position)
            .await?,
    ))
}

#[derive(Deserialize)]
struct FilePatchInput {
    href: String,
    label: Option<String>,
    hover: Option<String>,
    visible: Option<bool>,
}

async fn patch_file(
    State(ctx): State<AppContext>,
    _admin: AdminUser,
    Path((directory, seq)): Path<(String, i64)>,
    Json(input): Json<FilePatchInput>,
) -> ApiResult<Json<Card>> {
    let directory = paths::sanitize_segment(&directory)?;
    Ok(Json(
        ctx.cards
            .patch_file(
                &directory,
                seq,
                &input.href,
                input.label.as_deref(),
                input.hover.as_deref(),
                input.visible,
            )
            .await?,
    ))
}

#[derive(Deserialize)]
struct FileDeleteInput {
    href: String,
}

async fn delete_file(
    State(ctx): State<AppContext>,
    _admin: AdminUser,
    Path((directory, seq)): Path<(String, i64)>,
    Json(input): Json<FileDeleteInput>,
) -> ApiResult<Json<Card>> {
    let directory = paths::sanitize_segment(&directory)?;
    Ok(Json(
        ctx.uploads.delete_file(&directory, seq, &input.href).await?,
    ))
}

#[derive(Deserialize)]
struct ReorderInput {
    hrefs: Vec<String>,
}

async fn reorder_files(
    State(ctx): State<AppContext>,
    _admin: AdminUser,
    Path((directory, seq)): Path<(String, i64)>,
    Json(input): Json<ReorderInput>,
) -> ApiResult<Json<Card>> {
    let directory = paths::sanitize_segment(&directory)?;
    Ok(Json(
        ctx.cards.reorder_files(&directory, seq, &input.hrefs).await?,
    ))
}

#[derive(Deserialize)]
struct VideoInsertInput {
    position: Option<String>,
}

async fn insert_video(
    State(ctx): State<AppContext>,
    _admin: AdminUser,
    Path((directory, seq)): Path<(String, i64)>,
    Json(input): Json<VideoInsertInput>,
) -> ApiResult<Json<Card>> {
    let directory = paths::sanitize_segment(&directory)?;
    let position = InsertPosition::parse(input.position.as_deref());
    Ok(Json(ctx.cards.insert_video(&directory, seq, position).await?))
}

#[derive(Deserialize)]
struct VideoPatchInput {
    index: usize,
    label: Option<String>,
    href: Option<String>,
}

async fn patch_video(
    State(ctx): State<AppContext>,
    _admin: AdminUser,
    Path((directory, seq)): Path<(String, i64)>,
    Json(input): Json<VideoPatchInput>,
) -> ApiResult<Json<Card>> {
    let directory = paths::sanitize_segment(&directory)?;
    Ok(Json(
        ctx.cards
            .patch_video(
                &directory,
                seq,
                input.index,
                input.label.as_deref(),
                input.href.as_deref(),
            )
            .await?,
    ))
}

async fn remove_video(
    State(ctx): State<AppContext>,
    _admin: AdminUser,
    Path((directory, seq, index)): Path<(String, i64, usize)>,
) -> ApiResult<Json<Card>> {
    let directory = paths::sanitize_segment(&directory)?;
    Ok(Json(ctx.cards.remove_video(&directory, seq, index).await?))
}

#[derive(Deserialize)]
struct QuizInput {
    questions: Vec<QuizQuestion>,
}

async fn replace_quiz(
    State(ctx): State<AppContext>,
    _admin: AdminUser,
    Path((directory, seq)): Path<(String, i64)>,
    Json(input): Json<QuizInput>,
) -> ApiResult<Json<Card>> {
    let directory = paths::sanitize_segment(&directory)?;
    let (card, orphaned) = ctx
        .cards
        .replace_quiz(&directory, seq, input.questions)
        .await?;

    ctx.uploads
        .cleanup_quiz_images(&directory, seq, &orphaned)
        .await;

    Ok(Json(card))
}

async fn upload_quiz_image(
    State(ctx): State<AppContext>,
    _admin: AdminUser,
    Path((directory, seq, question_id)): Path<(String, i64, String)>,
    multipart: Multipart,
) -> ApiResult<Json<Card>> {
    let directory = paths::sanitize_segment(&directory)?;
    let (_fields, file) = read_upload(multipart).await?;
    let (filename, data) = require_file(file)?;

    Ok(Json(
        ctx.uploads
            .upload_quiz_image(&directory, seq, &question_id, &filename, data)
            .await?,
    ))
}

async fn delete_quiz_image(
    State(ctx): State<AppContext>,
    _admin: AdminUser,
    Path((directory, seq, question_id)): Path<(String, i64, String)>,
) -> ApiResult<Json<Card>> {
    let directory = paths::sanitize_segment(&directory)?;
    Ok(Json(
        ctx.uploads
            .delete_quiz_image(&directory, seq, &question_id)
            .await?,
    ))
}

#[derive(Deserialize)]
struct FlashcardsInput {
    flashcards: Vec<Flashcard>,
}

async fn set_flashcards(
    State(ctx): State<AppContext>,
    _admin: AdminUser,
    Path((directory, seq)): Path<(String, i64)>,
    Json(input): Json<FlashcardsInput>,
) -> ApiResult<Json<Card>> {
    let directory = paths::sanitize_segment(&directory)?;
    Ok(Json(
        ctx.cards
            .set_flashcards(&directory, seq, input.flashcards)
            .await?,
    ))
}
