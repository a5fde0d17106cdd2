/// Account administration handlers
use crate::{
    account::UserProfile,
    auth::{require_permission, AdminUser, Permission, Role},
    context::AppContext,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, put},
    Json, Router,
};
use serde::Deserialize;

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/:id", delete(delete_user))
        .route("/users/:id/role", put(set_role))
}

async fn list_users(
    State(ctx): State<AppContext>,
    admin: AdminUser,
) -> ApiResult<Json<Vec<UserProfile>>> {
    require_permission(admin.role, Permission::ViewResults)?;

    let users = ctx.accounts.list_users().await?;
    Ok(Json(users.iter().map(|u| u.profile()).collect()))
}

async fn delete_user(
    State(ctx): State<AppContext>,
    admin: AdminUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    require_permission(admin.role, Permission::ManageUsers)?;

    if id == admin.user_id {
        return Err(ApiError::Validation(
            "Cannot delete your own account".to_string(),
        ));
    }

    ctx.accounts.delete_user(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct RoleInput {
    role: String,
}

async fn set_role(
    State(ctx): State<AppContext>,
    admin: AdminUser,
    Path(id): Path<String>,
    Json(input): Json<RoleInput>,
) -> ApiResult<StatusCode> {
    require_permission(admin.role, Permission::ManageUsers)?;

    let role = match input.role.as_str() {
        "user" => Role::User,
        "admin" => Role::Admin,
        "superadmin" => Role::SuperAdmin,
        other => {
            return Err(ApiError::Validation(format!("Unknown role: {}", other)));
        }
    };

    ctx.accounts.set_role(&id, role).await?;
    Ok(StatusCode::NO_CONTENT)
}
