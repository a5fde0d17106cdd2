/// Registration, verification, login, and session handlers
use crate::{
    account::UserProfile,
    auth::{
        mint_refresh_token, mint_session_token, verify_refresh_token, AuthUser, RefreshClaims,
        SessionClaims, REFRESH_COOKIE, SESSION_COOKIE,
    },
    context::AppContext,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{Duration, Utc};
use serde::Deserialize;

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/verify", post(verify))
        .route("/auth/resend-code", post(resend_code))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password", post(reset_password))
        .route("/auth/me", get(me))
}

#[derive(Deserialize)]
struct RegisterInput {
    name: String,
    surname: String,
    email: String,
    password: String,
    confirm_password: String,
}

async fn register(
    State(ctx): State<AppContext>,
    Json(input): Json<RegisterInput>,
) -> ApiResult<impl IntoResponse> {
    let (user, code) = ctx
        .accounts
        .create_user(
            &input.name,
            &input.surname,
            &input.email,
            &input.password,
            &input.confirm_password,
        )
        .await?;

    ctx.mailer.send_verification_code(&user.email, &code).await?;

    Ok((StatusCode::CREATED, Json(user.profile())))
}

#[derive(Deserialize)]
struct CodeInput {
    email: String,
    code: String,
}

async fn verify(
    State(ctx): State<AppContext>,
    Json(input): Json<CodeInput>,
) -> ApiResult<Json<UserProfile>> {
    let user = ctx.accounts.verify_email(&input.email, &input.code).await?;
    Ok(Json(user.profile()))
}

#[derive(Deserialize)]
struct EmailInput {
    email: String,
}

async fn resend_code(
    State(ctx): State<AppContext>,
    Json(input): Json<EmailInput>,
) -> ApiResult<StatusCode> {
    let (user, code) = ctx.accounts.issue_verification_code(&input.email).await?;
    ctx.mailer.send_verification_code(&user.email, &code).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct LoginInput {
    email: String,
    password: String,
}

async fn login(
    State(ctx): State<AppContext>,
    jar: CookieJar,
    Json(input): Json<LoginInput>,
) -> ApiResult<impl IntoResponse> {
    let user = ctx.accounts.login(&input.email, &input.password).await?;

    let refresh_token = new_refresh_token(&ctx, &user.id)?;
    ctx.accounts
        .store_refresh_token(&user.id, &refresh_token)
        .await?;

    let jar = issue_cookies(&ctx, jar, &user.profile(), &refresh_token)?;

    Ok((jar, Json(user.profile())))
}

async fn refresh(State(ctx): State<AppContext>, jar: CookieJar) -> Response {
    let token = jar.get(REFRESH_COOKIE).map(|c| c.value().to_string());

    let outcome = match token.as_deref() {
        Some(token) => rotate_session(&ctx, token).await,
        None => Err(ApiError::Unauthenticated(
            "Missing refresh cookie".to_string(),
        )),
    };

    match outcome {
        Ok((profile, rotated)) => match issue_cookies(&ctx, jar, &profile, &rotated) {
            Ok(jar) => (jar, Json(profile)).into_response(),
            Err(err) => err.into_response(),
        },
        Err(err) => {
            // An expired or revoked refresh token forces a clean
            // logout: revoke the stored token and clear both cookies.
            if let Some(token) = token {
                match ctx.accounts.find_by_refresh_token(&token).await {
                    Ok(Some(user)) => {
                        if let Err(e) = ctx.accounts.clear_refresh_token(&user.id).await {
                            tracing::warn!(error = %e, "Failed to revoke refresh token");
                        }
                    }
                    Ok(None) => {}
                    Err(e) => tracing::warn!(error = %e, "Refresh token lookup failed"),
                }
            }
            (clear_session_cookies(jar), err).into_response()
        }
    }
}

/// Validate a refresh token end to end and rotate it.
async fn rotate_session(ctx: &AppContext, token: &str) -> ApiResult<(UserProfile, String)> {
    let claims = verify_refresh_token(token, &ctx.config.auth.jwt_secret)?;

    let user = ctx
        .accounts
        .find_by_refresh_token(token)
        .await?
        .ok_or_else(|| ApiError::Unauthenticated("Refresh token revoked".to_string()))?;

    if user.id != claims.sub {
        return Err(ApiError::Unauthenticated(
            "Refresh token mismatch".to_string(),
        ));
    }

    let rotated = new_refresh_token(ctx, &user.id)?;
    ctx.accounts.store_refresh_token(&user.id, &rotated).await?;

    Ok((user.profile(), rotated))
}

async fn logout(
    State(ctx): State<AppContext>,
    jar: CookieJar,
    auth: AuthUser,
) -> ApiResult<impl IntoResponse> {
    ctx.accounts.clear_refresh_token(&auth.user_id).await?;

    Ok((clear_session_cookies(jar), StatusCode::NO_CONTENT))
}

async fn forgot_password(
    State(ctx): State<AppContext>,
    Json(input): Json<EmailInput>,
) -> ApiResult<StatusCode> {
    let (user, code) = ctx.accounts.issue_reset_code(&input.email).await?;
    ctx.mailer.send_reset_code(&user.email, &code).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct ResetInput {
    email: String,
    code: String,
    password: String,
}

async fn reset_password(
    State(ctx): State<AppContext>,
    Json(input): Json<ResetInput>,
) -> ApiResult<Json<UserProfile>> {
    let user = ctx
        .accounts
        .reset_password(&input.email, &input.code, &input.password)
        .await?;
    Ok(Json(user.profile()))
}

async fn me(State(ctx): State<AppContext>, auth: AuthUser) -> ApiResult<Json<UserProfile>> {
    let user = ctx
        .accounts
        .get_user(&auth.user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthenticated("Account no longer exists".to_string()))?;
    Ok(Json(user.profile()))
}

/// Mint a signed refresh token that expires after the configured
/// number of hours.
fn new_refresh_token(ctx: &AppContext, user_id: &str) -> ApiResult<String> {
    let claims = RefreshClaims {
        sub: user_id.to_string(),
        exp: (Utc::now() + Duration::hours(ctx.config.auth.refresh_ttl_hours)).timestamp(),
    };
    mint_refresh_token(&claims, &ctx.config.auth.jwt_secret)
}

fn clear_session_cookies(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/").build())
        .remove(Cookie::build(REFRESH_COOKIE).path("/").build())
}

/// Set the access and refresh cookies for a logged-in account.
fn issue_cookies(
    ctx: &AppContext,
    jar: CookieJar,
    profile: &UserProfile,
    refresh_token: &str,
) -> ApiResult<CookieJar> {
    let claims = SessionClaims {
        sub: profile.id.clone(),
        email: profile.email.clone(),
        name: profile.name.clone(),
        surname: profile.surname.clone(),
        role: profile.role.clone(),
        exp: (Utc::now() + Duration::minutes(ctx.config.auth.access_ttl_minutes)).timestamp(),
    };
    let session = mint_session_token(&claims, &ctx.config.auth.jwt_secret)?;

    // Lifetimes are enforced by the JWT expiry and the stored refresh
    // token, not by cookie max-age.
    let session_cookie = Cookie::build((SESSION_COOKIE, session))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .build();

    let refresh_cookie = Cookie::build((REFRESH_COOKIE, refresh_token.to_string()))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .build();

    Ok(jar.add(session_cookie).add(refresh_cookie))
}
