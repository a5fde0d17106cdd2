/// Authentication extractors and utilities
///
/// Sessions are carried as a signed JWT in an HTTP-only `jwt` cookie.
/// A longer-lived refresh token travels in a second cookie and is
/// persisted on the account record so it can be revoked.
use crate::{context::AppContext, error::ApiError};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Name of the access token cookie.
pub const SESSION_COOKIE: &str = "jwt";

/// Name of the refresh token cookie.
pub const REFRESH_COOKIE: &str = "refresh";

/// Capability checked before a protected operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    SubmitQuiz,
    ManageContent,
    ManageUsers,
    ViewResults,
}

/// Account role, ordered by privilege.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    User,
    Admin,
    SuperAdmin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
            Role::SuperAdmin => "superadmin",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "superadmin" => Role::SuperAdmin,
            "admin" => Role::Admin,
            _ => Role::User,
        }
    }

    /// Whether this role carries the given capability.
    pub fn can(&self, permission: Permission) -> bool {
        match permission {
            Permission::SubmitQuiz => true,
            Permission::ManageContent | Permission::ViewResults => *self >= Role::Admin,
            Permission::ManageUsers => *self >= Role::SuperAdmin,
        }
    }
}

/// Claims embedded in the access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Account id
    pub sub: String,
    pub email: String,
    pub name: String,
    pub surname: String,
    pub role: String,
    /// Expiry as a unix timestamp
    pub exp: i64,
}

impl SessionClaims {
    pub fn role(&self) -> Role {
        Role::from_str(&self.role)
    }
}

/// Mint an access token for an account.
pub fn mint_session_token(
    claims: &SessionClaims,
    jwt_secret: &str,
) -> Result<String, ApiError> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("Failed to sign token: {}", e)))
}

/// Verify an access token and return its claims.
pub fn verify_session_token(token: &str, jwt_secret: &str) -> Result<SessionClaims, ApiError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 30;

    decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
            ApiError::Unauthenticated("Session expired".to_string())
        }
        _ => ApiError::Unauthenticated("Invalid session token".to_string()),
    })
}

/// Claims embedded in the refresh token. Minimal on purpose: the
/// account row is re-read on every refresh, so only the subject and
/// expiry need to travel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    /// Account id
    pub sub: String,
    /// Expiry as a unix timestamp
    pub exp: i64,
}

/// Mint a refresh token for an account.
pub fn mint_refresh_token(
    claims: &RefreshClaims,
    jwt_secret: &str,
) -> Result<String, ApiError> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("Failed to sign token: {}", e)))
}

/// Verify a refresh token and return its claims.
pub fn verify_refresh_token(token: &str, jwt_secret: &str) -> Result<RefreshClaims, ApiError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 30;

    decode::<RefreshClaims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
            ApiError::Unauthenticated("Refresh token expired".to_string())
        }
        _ => ApiError::Unauthenticated("Invalid refresh token".to_string()),
    })
}

/// Authenticated user context, extracted from the session cookie.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub claims: SessionClaims,
}

impl AuthUser {
    pub fn role(&self) -> Role {
        self.claims.role()
    }
}

#[async_trait]
impl FromRequestParts<AppContext> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar
            .get(SESSION_COOKIE)
            .map(|c| c.value().to_string())
            .ok_or_else(|| ApiError::Unauthenticated("Missing session cookie".to_string()))?;

        let claims = verify_session_token(&token, &state.config.auth.jwt_secret)?;
        let user_id = claims.sub.clone();

        Ok(AuthUser { user_id, claims })
    }
}

/// Authenticated admin context. A valid session without the content
/// management capability is rejected with 403, not 401.
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub user_id: String,
    pub claims: SessionClaims,
    pub role: Role,
}

#[async_trait]
impl FromRequestParts<AppContext> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let auth = AuthUser::from_request_parts(parts, state).await?;
        let role = auth.role();

        if !role.can(Permission::ManageContent) {
            tracing::warn!(user_id = %auth.user_id, "Admin capability denied");
            return Err(ApiError::Forbidden("Admin role required".to_string()));
        }

        Ok(AdminUser {
            user_id: auth.user_id,
            claims: auth.claims,
            role,
        })
    }
}

/// Require a specific capability on an already-extracted context.
pub fn require_permission(role: Role, permission: Permission) -> Result<(), ApiError> {
    if role.can(permission) {
        Ok(())
    } else {
        Err(ApiError::Forbidden(format!(
            "Requires capability {:?}",
            permission
        )))
    }
}
