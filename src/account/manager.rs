/// Account lifecycle: registration, verification, login, password reset
use crate::{
    account::{generate_code, User},
    auth::Role,
    error::{ApiError, ApiResult},
    validation,
};
use chrono::{DateTime, Duration, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

pub struct AccountManager {
    db: SqlitePool,
    /// Lifetime of emailed one-time codes, in minutes.
    code_ttl_minutes: i64,
    bcrypt_cost: u32,
}

impl AccountManager {
    pub fn new(db: SqlitePool, code_ttl_minutes: i64) -> Self {
        Self {
            db,
            code_ttl_minutes,
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }

    /// Bcrypt at minimum cost, for test setup only.
    #[cfg(test)]
    pub fn new_fast(db: SqlitePool, code_ttl_minutes: i64) -> Self {
        Self {
            db,
            code_ttl_minutes,
            bcrypt_cost: 4,
        }
    }

    /// Register an account. Names are stored normalized (name upper,
    /// surname lower). The returned code must be emailed to the user;
    /// only its bcrypt hash is stored.
    pub async fn create_user(
        &self,
        name: &str,
        surname: &str,
        email: &str,
        password: &str,
        confirm_password: &str,
    ) -> ApiResult<(User, String)> {
        validation::collect(vec![
            validation::validate_name("name", name),
            validation::validate_name("surname", surname),
            validation::validate_email(email),
            validation::validate_password(password),
            validation::validate_confirmation(password, confirm_password),
        ])?;

        let name = name.trim().to_uppercase();
        let surname = surname.trim().to_lowercase();
        let email = email.trim().to_lowercase();

        if self.find_by_email(&email).await?.is_some() {
            return Err(ApiError::Conflict("Email already registered".to_string()));
        }
        if self.find_by_name_surname(&name, &surname).await?.is_some() {
            return Err(ApiError::Conflict(
                "An account with this name already exists".to_string(),
            ));
        }

        let password_hash = self.hash(password)?;
        let code = generate_code();
        let code_hash = self.hash(&code)?;
        let expires_at = Utc::now() + Duration::minutes(self.code_ttl_minutes);

        let user = User {
            id: Uuid::new_v4().to_string(),
            name,
            surname,
            email,
            password_hash,
            verified: false,
            code_hash: Some(code_hash),
            code_expires_at: Some(expires_at),
            refresh_token: None,
            role: Role::User,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO account (id, name, surname, email, password_hash, verified,
                                 code_hash, code_expires_at, role, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.surname)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.verified)
        .bind(&user.code_hash)
        .bind(user.code_expires_at)
        .bind(user.role.as_str())
        .bind(user.created_at)
        .execute(&self.db)
        .await
        .map_err(|e| {
            if crate::db::is_unique_violation(&e) {
                ApiError::Conflict("Email already registered".to_string())
            } else {
                ApiError::Database(e)
            }
        })?;

        tracing::info!(user_id = %user.id, "Account created");

        Ok((user, code))
    }

    /// Confirm an emailed verification code and mark the account verified.
    pub async fn verify_email(&self, email: &str, code: &str) -> ApiResult<User> {
        let mut user = self.require_by_email(email).await?;

        self.check_code(&user, code)?;

        sqlx::query(
            "UPDATE account SET verified = 1, code_hash = NULL, code_expires_at = NULL WHERE id = ?1",
        )
        .bind(&user.id)
        .execute(&self.db)
        .await?;

        user.verified = true;
        user.code_hash = None;
        user.code_expires_at = None;

        tracing::info!(user_id = %user.id, "Email verified");

        Ok(user)
    }

    /// Re-issue the verification code for an account still awaiting
    /// verification.
    pub async fn issue_verification_code(&self, email: &str) -> ApiResult<(User, String)> {
        let user = self.require_by_email(email).await?;
        if user.verified {
            return Err(ApiError::Conflict("Email already verified".to_string()));
        }
        self.rotate_code(user).await
    }

    /// Issue a password reset code. Only verified accounts can reset;
    /// an unverified account still has its signup code.
    pub async fn issue_reset_code(&self, email: &str) -> ApiResult<(User, String)> {
        let user = self.require_by_email(email).await?;
        if !user.verified {
            return Err(ApiError::Forbidden("Email not verified".to_string()));
        }
        self.rotate_code(user).await
    }

    /// Replace any previous one-time code with a fresh one.
    async fn rotate_code(&self, user: User) -> ApiResult<(User, String)> {
        let code = generate_code();
        let code_hash = self.hash(&code)?;
        let expires_at = Utc::now() + Duration::minutes(self.code_ttl_minutes);

        sqlx::query("UPDATE account SET code_hash = ?1, code_expires_at = ?2 WHERE id = ?3")
            .bind(&code_hash)
            .bind(expires_at)
            .bind(&user.id)
            .execute(&self.db)
            .await?;

        Ok((user, code))
    }

    /// Authenticate by email and password. Nonexistent, unverified, and
    /// wrong-password accounts are rejected uniformly so the response
    /// never reveals which check failed.
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<User> {
        let user = self
            .find_by_email(&email.trim().to_lowercase())
            .await?
            .ok_or_else(|| ApiError::Unauthenticated("Invalid credentials".to_string()))?;

        let matches = bcrypt::verify(password, &user.password_hash)
            .map_err(|e| ApiError::Internal(format!("Password verification failed: {}", e)))?;
        if !matches || !user.verified {
            return Err(ApiError::Unauthenticated("Invalid credentials".to_string()));
        }

        Ok(user)
    }

    /// Persist the refresh token on the account so it can be revoked.
    pub async fn store_refresh_token(&self, user_id: &str, token: &str) -> ApiResult<()> {
        sqlx::query("UPDATE account SET refresh_token = ?1 WHERE id = ?2")
            .bind(token)
            .bind(user_id)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    /// Clear the stored refresh token on logout.
    pub async fn clear_refresh_token(&self, user_id: &str) -> ApiResult<()> {
        sqlx::query("UPDATE account SET refresh_token = NULL WHERE id = ?1")
            .bind(user_id)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    /// Look up the account holding a refresh token. Returns None when
    /// the token has been revoked or never existed.
    pub async fn find_by_refresh_token(&self, token: &str) -> ApiResult<Option<User>> {
        let row = sqlx::query("SELECT * FROM account WHERE refresh_token = ?1")
            .bind(token)
            .fetch_optional(&self.db)
            .await?;

        row.map(Self::row_to_user).transpose()
    }

    /// Complete a password reset: the emailed code authorizes the new
    /// password, and every existing session is revoked.
    pub async fn reset_password(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> ApiResult<User> {
        validation::collect(vec![validation::validate_password(new_password)])?;

        let mut user = self.require_by_email(email).await?;
        self.check_code(&user, code)?;

        let password_hash = self.hash(new_password)?;

        sqlx::query(
            r#"
            UPDATE account
            SET password_hash = ?1, code_hash = NULL, code_expires_at = NULL,
                refresh_token = NULL, verified = 1
            WHERE id = ?2
            "#,
        )
        .bind(&password_hash)
        .bind(&user.id)
        .execute(&self.db)
        .await?;

        user.password_hash = password_hash;
        user.code_hash = None;
        user.code_expires_at = None;
        user.refresh_token = None;
        user.verified = true;

        tracing::info!(user_id = %user.id, "Password reset");

        Ok(user)
    }

    pub async fn get_user(&self, id: &str) -> ApiResult<Option<User>> {
        let row = sqlx::query("SELECT * FROM account WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        row.map(Self::row_to_user).transpose()
    }

    pub async fn find_by_email(&self, email: &str) -> ApiResult<Option<User>> {
        let row = sqlx::query("SELECT * FROM account WHERE email = ?1")
            .bind(email.trim().to_lowercase())
            .fetch_optional(&self.db)
            .await?;

        row.map(Self::row_to_user).transpose()
    }

    /// Find an account by the pair (name, surname), case-insensitively.
    pub async fn find_by_name_surname(&self, name: &str, surname: &str) -> ApiResult<Option<User>> {
        let row = sqlx::query(
            "SELECT * FROM account WHERE LOWER(name) = LOWER(?1) AND LOWER(surname) = LOWER(?2)",
        )
        .bind(name.trim())
        .bind(surname.trim())
        .fetch_optional(&self.db)
        .await?;

        row.map(Self::row_to_user).transpose()
    }

    /// All accounts, ordered by surname then name.
    pub async fn list_users(&self) -> ApiResult<Vec<User>> {
        let rows = sqlx::query("SELECT * FROM account ORDER BY surname, name")
            .fetch_all(&self.db)
            .await?;

        rows.into_iter().map(Self::row_to_user).collect()
    }

    /// Change an account's role.
    pub async fn set_role(&self, user_id: &str, role: Role) -> ApiResult<()> {
        let result = sqlx::query("UPDATE account SET role = ?1 WHERE id = ?2")
            .bind(role.as_str())
            .bind(user_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound("Account not found".to_string()));
        }

        Ok(())
    }

    /// Delete an account and its quiz submissions and cloud messages.
    pub async fn delete_user(&self, user_id: &str) -> ApiResult<()> {
        let result = sqlx::query("DELETE FROM account WHERE id = ?1")
            .bind(user_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound("Account not found".to_string()));
        }

        sqlx::query("DELETE FROM quiz_submission WHERE user_id = ?1")
            .bind(user_id)
            .execute(&self.db)
            .await?;
        sqlx::query("DELETE FROM cloud_message WHERE user_id = ?1")
            .bind(user_id)
            .execute(&self.db)
            .await?;

        tracing::info!(user_id = %user_id, "Account deleted");

        Ok(())
    }

    fn hash(&self, value: &str) -> ApiResult<String> {
        bcrypt::hash(value, self.bcrypt_cost)
            .map_err(|e| ApiError::Internal(format!("Hashing failed: {}", e)))
    }

    /// Validate a one-time code against the stored hash and expiry.
    fn check_code(&self, user: &User, code: &str) -> ApiResult<()> {
        let (hash, expires_at) = match (&user.code_hash, user.code_expires_at) {
            (Some(hash), Some(expires_at)) => (hash, expires_at),
            _ => return Err(ApiError::Forbidden("No active code".to_string())),
        };

        if Utc::now() > expires_at {
            return Err(ApiError::Forbidden("Code expired".to_string()));
        }

        let matches = bcrypt::verify(code, hash)
            .map_err(|e| ApiError::Internal(format!("Code verification failed: {}", e)))?;
        if !matches {
            return Err(ApiError::Forbidden("Invalid code".to_string()));
        }

        Ok(())
    }

    async fn require_by_email(&self, email: &str) -> ApiResult<User> {
        self.find_by_email(email)
            .await?
            .ok_or_else(|| ApiError::NotFound("Account not found".to_string()))
    }

    fn row_to_user(row: sqlx::sqlite::SqliteRow) -> ApiResult<User> {
        let role: String = row.try_get("role")?;
        let code_expires_at: Option<DateTime<Utc>> = row.try_get("code_expires_at")?;

        Ok(User {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            surname: row.try_get("surname")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            verified: row.try_get("verified")?,
            code_hash: row.try_get("code_hash")?,
            code_expires_at,
            refresh_token: row.try_get("refresh_token")?,
            role: Role::from_str(&role),
            created_at: row.try_get("created_at")?,
        })
    }
}
