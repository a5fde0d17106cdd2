/// Cloud messages: short notes tied to a user, a card, and a stored
/// file. Admins create them on behalf of a student resolved by name;
/// students read and delete their own.
use crate::{
    account::AccountManager,
    error::{ApiError, ApiResult},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudMessage {
    pub id: String,
    pub user_id: String,
    pub card_id: String,
    pub filename: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

pub struct CloudMessageManager {
    db: SqlitePool,
    accounts: Arc<AccountManager>,
}

impl CloudMessageManager {
    pub fn new(db: SqlitePool, accounts: Arc<AccountManager>) -> Self {
        Self { db, accounts }
    }

    /// Create a message for the student matching (name, surname).
    pub async fn create_for_named_user(
        &self,
        name: &str,
        surname: &str,
        card_id: &str,
        filename: &str,
        message: &str,
    ) -> ApiResult<CloudMessage> {
        let user = self
            .accounts
            .find_by_name_surname(name, surname)
            .await?
            .ok_or_else(|| {
                ApiError::NotFound(format!("No account named {} {}", name, surname))
            })?;

        let entry = CloudMessage {
            id: Uuid::new_v4().to_string(),
            user_id: user.id,
            card_id: card_id.to_string(),
            filename: filename.to_string(),
            message: message.to_string(),
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO cloud_message (id, user_id, card_id, filename, message, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&entry.id)
        .bind(&entry.user_id)
        .bind(&entry.card_id)
        .bind(&entry.filename)
        .bind(&entry.message)
        .bind(entry.created_at)
        .execute(&self.db)
        .await?;

        tracing::info!(user_id = %entry.user_id, card_id = %card_id, "Cloud message created");

        Ok(entry)
    }

    /// A user's messages, newest first.
    pub async fn list_for_user(&self, user_id: &str) -> ApiResult<Vec<CloudMessage>> {
        let rows = sqlx::query(
            "SELECT * FROM cloud_message WHERE user_id = ?1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(Self::row_to_message).collect()
    }

    /// Delete one of the caller's own messages. Deleting another
    /// user's message is an ownership violation, not a missing row.
    pub async fn delete_own(&self, user_id: &str, message_id: &str) -> ApiResult<()> {
        let row = sqlx::query("SELECT user_id FROM cloud_message WHERE id = ?1")
            .bind(message_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| ApiError::NotFound("Message not found".to_string()))?;

        let owner: String = row.try_get("user_id")?;
        if owner != user_id {
            return Err(ApiError::Forbidden("Not your message".to_string()));
        }

        sqlx::query("DELETE FROM cloud_message WHERE id = ?1")
            .bind(message_id)
            .execute(&self.db)
            .await?;

        Ok(())
    }

    fn row_to_message(row: sqlx::sqlite::SqliteRow) -> ApiResult<CloudMessage> {
        Ok(CloudMessage {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            card_id: row.try_get("card_id")?,
            filename: row.try_get("filename")?,
            message: row.try_get("message")?,
            created_at: row.try_get("created_at")?,
        })
    }
}
