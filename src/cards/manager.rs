/// Card persistence and mutation
///
/// Cards are addressed by (directory, seq) throughout the admin
/// surface. Mutations re-read the embedded JSON lists, modify them in
/// memory, and write the whole column back.
use crate::{
    cards::{Card, EvalMode, FileRef, Flashcard, InsertPosition, QuizQuestion, VideoRef},
    db::is_unique_violation,
    error::{ApiError, ApiResult},
};
use chrono::Utc;
use serde::Serialize;
use sqlx::{Row, SqlitePool};
use std::collections::HashSet;
use uuid::Uuid;

/// Direction for [`CardManager::move_card`], relative to the listing
/// order (descending display order).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Up,
    Down,
}

pub struct CardManager {
    db: SqlitePool,
}

impl CardManager {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Cards of a directory for students: hidden cards dropped, public
    /// projection applied, newest first.
    pub async fn list_public(&self, directory: &str) -> ApiResult<Vec<Card>> {
        let cards = self.list_admin(directory).await?;
        Ok(cards
            .into_iter()
            .filter(|c| c.visible)
            .map(|c| c.public_view())
            .collect())
    }

    /// Every card of a directory, newest first.
    pub async fn list_admin(&self, directory: &str) -> ApiResult<Vec<Card>> {
        let rows = sqlx::query(
            "SELECT * FROM card WHERE directory = ?1 ORDER BY display_order DESC, seq DESC",
        )
        .bind(directory)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(Self::row_to_card).collect()
    }

    pub async fn get(&self, directory: &str, seq: i64) -> ApiResult<Option<Card>> {
        let row = sqlx::query("SELECT * FROM card WHERE directory = ?1 AND seq = ?2")
            .bind(directory)
            .bind(seq)
            .fetch_optional(&self.db)
            .await?;

        row.map(Self::row_to_card).transpose()
    }

    async fn require(&self, directory: &str, seq: i64) -> ApiResult<Card> {
        self.get(directory, seq)
            .await?
            .ok_or_else(|| ApiError::NotFound("Card not found".to_string()))
    }

    /// Create a blank card at the top of a directory. Sequence number
    /// and display order are each allocated as max + 1; a concurrent
    /// allocation surfaces as a unique violation and is retried once.
    pub async fn create(&self, directory: &str) -> ApiResult<Card> {
        let mut retries_left = 1;

        loop {
            let row = sqlx::query(
                "SELECT COALESCE(MAX(seq), 0) AS max_seq, COALESCE(MAX(display_order), 0) AS max_order
                 FROM card WHERE directory = ?1",
            )
            .bind(directory)
            .fetch_one(&self.db)
            .await?;

            let seq: i64 = row.try_get::<i64, _>("max_seq")? + 1;
            let display_order: i64 = row.try_get::<i64, _>("max_order")? + 1;

            let id = Uuid::new_v4().to_string();
            let created_at = Utc::now();

            let result = sqlx::query(
                "INSERT INTO card (id, directory, seq, display_order, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .bind(&id)
            .bind(directory)
            .bind(seq)
            .bind(display_order)
            .bind(created_at)
            .execute(&self.db)
            .await;

            match result {
                Ok(_) => {
                    tracing::info!(directory = %directory, seq = seq, "Card created");
                    return self.require(directory, seq).await;
                }
                Err(e) if is_unique_violation(&e) && retries_left > 0 => {
                    retries_left -= 1;
                    tracing::warn!(directory = %directory, "Card allocation raced, retrying");
                }
                Err(e) if is_unique_violation(&e) => {
                    return Err(ApiError::Conflict(
                        "Concurrent card creation, try again".to_string(),
                    ));
                }
                Err(e) => return Err(ApiError::Database(e)),
            }
        }
    }

    pub async fn set_title(&self, directory: &str, seq: i64, title: &str) -> ApiResult<Card> {
        let card = self.require(directory, seq).await?;
        sqlx::query("UPDATE card SET title = ?1 WHERE id = ?2")
            .bind(title)
            .bind(&card.id)
            .execute(&self.db)
            .await?;
        self.require(directory, seq).await
    }

    pub async fn set_bg(&self, directory: &str, seq: i64, bg: &str) -> ApiResult<Card> {
        let card = self.require(directory, seq).await?;
        sqlx::query("UPDATE card SET bg = ?1 WHERE id = ?2")
            .bind(bg)
            .bind(&card.id)
            .execute(&self.db)
            .await?;
        self.require(directory, seq).await
    }

    pub async fn set_visible(&self, directory: &str, seq: i64, visible: bool) -> ApiResult<Card> {
        let card = self.require(directory, seq).await?;
        sqlx::query("UPDATE card SET visible = ?1 WHERE id = ?2")
            .bind(visible)
            .bind(&card.id)
            .execute(&self.db)
            .await?;
        self.require(directory, seq).await
    }

    pub async fn set_cloud(&self, directory: &str, seq: i64, cloud: bool) -> ApiResult<Card> {
        let card = self.require(directory, seq).await?;
        sqlx::query("UPDATE card SET cloud = ?1 WHERE id = ?2")
            .bind(cloud)
            .bind(&card.id)
            .execute(&self.db)
            .await?;
        self.require(directory, seq).await
    }

    pub async fn set_presentation(
        &self,
        directory: &str,
        seq: i64,
        lines: &[String],
    ) -> ApiResult<Card> {
        let card = self.require(directory, seq).await?;
        self.store_json(&card.id, "presentation", &lines).await?;
        self.require(directory, seq).await
    }

    pub async fn set_plan(&self, directory: &str, seq: i64, lines: &[String]) -> ApiResult<Card> {
        let card = self.require(directory, seq).await?;
        self.store_json(&card.id, "plan", &lines).await?;
        self.require(directory, seq).await
    }

    /// Replace the content blocks and stamp the format version.
    pub async fn set_content(
        &self,
        directory: &str,
        seq: i64,
        content: &[serde_json::Value],
        content_version: i64,
    ) -> ApiResult<Card> {
        let card = self.require(directory, seq).await?;
        let json = serde_json::to_string(content)
            .map_err(|e| ApiError::Internal(format!("Content serialization failed: {}", e)))?;
        sqlx::query("UPDATE card SET content = ?1, content_version = ?2 WHERE id = ?3")
            .bind(json)
            .bind(content_version)
            .bind(&card.id)
            .execute(&self.db)
            .await?;
        self.require(directory, seq).await
    }

    pub async fn set_eval_mode(
        &self,
        directory: &str,
        seq: i64,
        mode: EvalMode,
    ) -> ApiResult<Card> {
        let card = self.require(directory, seq).await?;
        sqlx::query("UPDATE card SET eval_mode = ?1 WHERE id = ?2")
            .bind(mode.as_str())
            .bind(&card.id)
            .execute(&self.db)
            .await?;
        self.require(directory, seq).await
    }

    pub async fn set_show_score(
        &self,
        directory: &str,
        seq: i64,
        show_score: bool,
    ) -> ApiResult<Card> {
        let card = self.require(directory, seq).await?;
        sqlx::query("UPDATE card SET show_score = ?1 WHERE id = ?2")
            .bind(show_score)
            .bind(&card.id)
            .execute(&self.db)
            .await?;
        self.require(directory, seq).await
    }

    /// Swap display order with the neighboring card in listing order.
    /// Moving past either end is rejected.
    pub async fn move_card(
        &self,
        directory: &str,
        seq: i64,
        direction: MoveDirection,
    ) -> ApiResult<Card> {
        let cards = self.list_admin(directory).await?;
        let index = cards
            .iter()
            .position(|c| c.seq == seq)
            .ok_or_else(|| ApiError::NotFound("Card not found".to_string()))?;

        let neighbor_index = match direction {
            MoveDirection::Up => index
                .checked_sub(1)
                .ok_or_else(|| ApiError::Validation("Card is already first".to_string()))?,
            MoveDirection::Down => {
                if index + 1 >= cards.len() {
                    return Err(ApiError::Validation("Card is already last".to_string()));
                }
                index + 1
            }
        };

        let card = &cards[index];
        let neighbor = &cards[neighbor_index];

        // Park one card at a negative order to keep the unique index
        // satisfied mid-swap.
        let mut tx = self.db.begin().await?;
        sqlx::query("UPDATE card SET display_order = ?1 WHERE id = ?2")
            .bind(-card.display_order)
            .bind(&card.id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE card SET display_order = ?1 WHERE id = ?2")
            .bind(card.display_order)
            .bind(&neighbor.id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE card SET display_order = ?1 WHERE id = ?2")
            .bind(neighbor.display_order)
            .bind(&card.id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        self.require(directory, seq).await
    }

    /// Delete a card and its quiz submissions. Returns the storage
    /// prefix the caller should clean up; object deletion is
    /// best-effort and happens outside the database.
    pub async fn delete(&self, directory: &str, seq: i64) -> ApiResult<String> {
        let card = self.require(directory, seq).await?;

        sqlx::query("DELETE FROM card WHERE id = ?1")
            .bind(&card.id)
            .execute(&self.db)
            .await?;
        sqlx::query("DELETE FROM quiz_submission WHERE card_id = ?1")
            .bind(&card.id)
            .execute(&self.db)
            .await?;

        tracing::info!(directory = %directory, seq = seq, "Card deleted");

        Ok(card.storage_prefix())
    }

    /// Insert a file reference at the given position.
    pub async fn append_file(
        &self,
        directory: &str,
        seq: i64,
        file: FileRef,
        position: InsertPosition,
    ) -> ApiResult<Card> {
        let card = self.require(directory, seq).await?;
        let mut files = card.files;

        if files.iter().any(|f| f.href == file.href) {
            return Err(ApiError::Conflict(format!(
                "File already attached: {}",
                file.href
            )));
        }

        let index = position.resolve(files.len());
        files.insert(index, file);

        self.store_json(&card.id, "files", &files).await?;
        self.require(directory, seq).await
    }

    /// Remove a file reference by href. Returns the updated card; the
    /// caller deletes the object itself.
    pub async fn remove_file(&self, directory: &str, seq: i64, href: &str) -> ApiResult<Card> {
        let card = self.require(directory, seq).await?;
        let mut files = card.files;

        let before = files.len();
        files.retain(|f| f.href != href);
        if files.len() == before {
            return Err(ApiError::NotFound(format!("File not attached: {}", href)));
        }

        self.store_json(&card.id, "files", &files).await?;
        self.require(directory, seq).await
    }

    /// Patch a file reference's label, hover text, or visibility.
    pub async fn patch_file(
        &self,
        directory: &str,
        seq: i64,
        href: &str,
        label: Option<&str>,
        hover: Option<&str>,
        visible: Option<bool>,
    ) -> ApiResult<Card> {
        let card = self.require(directory, seq).await?;
        let mut files = card.files;

        let file = files
            .iter_mut()
            .find(|f| f.href == href)
            .ok_or_else(|| ApiError::NotFound(format!("File not attached: {}", href)))?;

        if let Some(label) = label {
            file.label = label.to_string();
        }
        if let Some(hover) = hover {
            file.hover = hover.to_string();
        }
        if let Some(visible) = visible {
            file.visible = visible;
        }

        self.store_json(&card.id, "files", &files).await?;
        self.require(directory, seq).await
    }

    /// Reorder the file list. The new ordering must be an exact
    /// permutation of the attached hrefs: no missing, duplicate, or
    /// unknown entries.
    pub async fn reorder_files(
        &self,
        directory: &str,
        seq: i64,
        ordered_hrefs: &[String],
    ) -> ApiResult<Card> {
        let card = self.require(directory, seq).await?;
        let files = card.files;

        let existing: HashSet<&str> = files.iter().map(|f| f.href.as_str()).collect();
        let requested: HashSet<&str> = ordered_hrefs.iter().map(|s| s.as_str()).collect();

        if ordered_hrefs.len() != files.len() || requested.len() != ordered_hrefs.len() {
            return Err(ApiError::Validation(
                "Ordering must list each attached file exactly once".to_string(),
            ));
        }
        if requested != existing {
            return Err(ApiError::Validation(
                "Ordering must list each attached file exactly once".to_string(),
            ));
        }

        let mut by_href: std::collections::HashMap<String, FileRef> =
            files.into_iter().map(|f| (f.href.clone(), f)).collect();
        let reordered: Vec<FileRef> = ordered_hrefs
            .iter()
            .filter_map(|href| by_href.remove(href))
            .collect();

        self.store_json(&card.id, "files", &reordered).await?;
        self.require(directory, seq).await
    }

    /// Insert a blank video entry at the given position.
    pub async fn insert_video(
        &self,
        directory: &str,
        seq: i64,
        position: InsertPosition,
    ) -> ApiResult<Card> {
        let card = self.require(directory, seq).await?;
        let mut videos = card.videos;

        let index = position.resolve(videos.len());
        videos.insert(
            index,
            VideoRef {
                label: String::new(),
                href: String::new(),
            },
        );

        self.store_json(&card.id, "videos", &videos).await?;
        self.require(directory, seq).await
    }

    /// Patch a video entry by index.
    pub async fn patch_video(
        &self,
        directory: &str,
        seq: i64,
        index: usize,
        label: Option<&str>,
        href: Option<&str>,
    ) -> ApiResult<Card> {
        let card = self.require(directory, seq).await?;
        let mut videos = card.videos;

        let video = videos
            .get_mut(index)
            .ok_or_else(|| ApiError::NotFound(format!("No video at index {}", index)))?;

        if let Some(label) = label {
            video.label = label.to_string();
        }
        if let Some(href) = href {
            video.href = href.to_string();
        }

        self.store_json(&card.id, "videos", &videos).await?;
        self.require(directory, seq).await
    }

    /// Remove a video entry by index.
    pub async fn remove_video(&self, directory: &str, seq: i64, index: usize) -> ApiResult<Card> {
        let card = self.require(directory, seq).await?;
        let mut videos = card.videos;

        if index >= videos.len() {
            return Err(ApiError::NotFound(format!("No video at index {}", index)));
        }
        videos.remove(index);

        self.store_json(&card.id, "videos", &videos).await?;
        self.require(directory, seq).await
    }

    /// Replace the whole quiz. Question ids are reassigned as q1..qN.
    /// Returns the image filenames no longer referenced so the caller
    /// can delete them from storage.
    pub async fn replace_quiz(
        &self,
        directory: &str,
        seq: i64,
        mut questions: Vec<QuizQuestion>,
    ) -> ApiResult<(Card, Vec<String>)> {
        let card = self.require(directory, seq).await?;

        for (i, question) in questions.iter_mut().enumerate() {
            question.id = format!("q{}", i + 1);
        }

        let kept: HashSet<&str> = questions
            .iter()
            .filter_map(|q| q.image.as_deref())
            .collect();
        let orphaned: Vec<String> = card
            .quiz
            .iter()
            .filter_map(|q| q.image.as_deref())
            .filter(|img| !kept.contains(img))
            .map(String::from)
            .collect();

        self.store_json(&card.id, "quiz", &questions).await?;
        let updated = self.require(directory, seq).await?;
        Ok((updated, orphaned))
    }

    /// Attach an image to one quiz question.
    pub async fn set_question_image(
        &self,
        directory: &str,
        seq: i64,
        question_id: &str,
        filename: &str,
    ) -> ApiResult<Card> {
        self.update_question_image(directory, seq, question_id, Some(filename))
            .await
    }

    /// Detach a quiz question's image. Returns the previous filename.
    pub async fn clear_question_image(
        &self,
        directory: &str,
        seq: i64,
        question_id: &str,
    ) -> ApiResult<(Card, Option<String>)> {
        let card = self.require(directory, seq).await?;
        let previous = card
            .quiz
            .iter()
            .find(|q| q.id == question_id)
            .ok_or_else(|| ApiError::NotFound(format!("No question {}", question_id)))?
            .image
            .clone();

        let updated = self
            .update_question_image(directory, seq, question_id, None)
            .await?;
        Ok((updated, previous))
    }

    async fn update_question_image(
        &self,
        directory: &str,
        seq: i64,
        question_id: &str,
        filename: Option<&str>,
    ) -> ApiResult<Card> {
        let card = self.require(directory, seq).await?;
        let mut quiz = card.quiz;

        let question = quiz
            .iter_mut()
            .find(|q| q.id == question_id)
            .ok_or_else(|| ApiError::NotFound(format!("No question {}", question_id)))?;
        question.image = filename.map(String::from);

        self.store_json(&card.id, "quiz", &quiz).await?;
        self.require(directory, seq).await
    }

    /// Replace the flashcard list.
    pub async fn set_flashcards(
        &self,
        directory: &str,
        seq: i64,
        flashcards: Vec<Flashcard>,
    ) -> ApiResult<Card> {
        let card = self.require(directory, seq).await?;
        self.store_json(&card.id, "flashcards", &flashcards).await?;
        self.require(directory, seq).await
    }

    /// Write one JSON column back. Column names are compile-time
    /// constants, never user input.
    async fn store_json<T: Serialize>(
        &self,
        card_id: &str,
        column: &'static str,
        value: &T,
    ) -> ApiResult<()> {
        let json = serde_json::to_string(value)
            .map_err(|e| ApiError::Internal(format!("Serialization failed: {}", e)))?;

        sqlx::query(&format!("UPDATE card SET {} = ?1 WHERE id = ?2", column))
            .bind(json)
            .bind(card_id)
            .execute(&self.db)
            .await?;

        Ok(())
    }

    fn row_to_card(row: sqlx::sqlite::SqliteRow) -> ApiResult<Card> {
        fn parse_json<T: serde::de::DeserializeOwned>(raw: String, column: &str) -> ApiResult<T> {
            serde_json::from_str(&raw).map_err(|e| {
                ApiError::Internal(format!("Corrupt {} column: {}", column, e))
            })
        }

        let eval_mode_raw: String = row.try_get("eval_mode")?;
        let eval_mode = EvalMode::parse(&eval_mode_raw)
            .ok_or_else(|| ApiError::Internal(format!("Corrupt eval mode: {}", eval_mode_raw)))?;

        Ok(Card {
            id: row.try_get("id")?,
            directory: row.try_get("directory")?,
            seq: row.try_get("seq")?,
            display_order: row.try_get("display_order")?,
            title: row.try_get("title")?,
            bg: row.try_get("bg")?,
            cloud: row.try_get("cloud")?,
            presentation: parse_json(row.try_get("presentation")?, "presentation")?,
            plan: parse_json(row.try_get("plan")?, "plan")?,
            content: parse_json(row.try_get("content")?, "content")?,
            content_version: row.try_get("content_version")?,
            files: parse_json(row.try_get("files")?, "files")?,
            videos: parse_json(row.try_get("videos")?, "videos")?,
            quiz: parse_json(row.try_get("quiz")?, "quiz")?,
            flashcards: parse_json(row.try_get("flashcards")?, "flashcards")?,
            eval_mode,
            show_score: row.try_get("show_score")?,
            visible: row.try_get("visible")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    async fn manager() -> CardManager {
        CardManager::new(test_pool().await)
    }

    fn file(href: &str) -> FileRef {
        FileRef {
            label: href.to_string(),
            href: href.to_string(),
            hover: String::new(),
            visible: true,
        }
    }

    #[tokio::test]
    async fn test_create_allocates_seq_and_order() {
        let manager = manager().await;

        let first = manager.create("algebra").await.unwrap();
        assert_eq!((first.seq, first.display_order), (1, 1));

        let second = manager.create("algebra").await.unwrap();
        assert_eq!((second.seq, second.display_order), (2, 2));

        // Other directories allocate independently
        let other = manager.create("geometry").await.unwrap();
        assert_eq!((other.seq, other.display_order), (1, 1));
    }

    #[tokio::test]
    async fn test_seq_not_reused_after_delete_of_last() {
        let manager = manager().await;

        manager.create("algebra").await.unwrap();
        let second = manager.create("algebra").await.unwrap();
        manager.delete("algebra", 1).await.unwrap();

        // max(seq) is still 2, so the next card gets 3
        let third = manager.create("algebra").await.unwrap();
        assert_eq!(third.seq, 3);
        assert_eq!(second.seq, 2);
    }

    #[tokio::test]
    async fn test_move_swaps_neighbors_and_is_self_inverse() {
        let manager = manager().await;

        manager.create("algebra").await.unwrap(); // seq 1, order 1
        manager.create("algebra").await.unwrap(); // seq 2, order 2
        manager.create("algebra").await.unwrap(); // seq 3, order 3

        // Listing order is descending: [3, 2, 1]
        let moved = manager
            .move_card("algebra", 1, MoveDirection::Up)
            .await
            .unwrap();
        assert_eq!(moved.display_order, 2);

        let listing = manager.list_admin("algebra").await.unwrap();
        let seqs: Vec<i64> = listing.iter().map(|c| c.seq).collect();
        assert_eq!(seqs, vec![3, 1, 2]);

        // Moving back restores the original ordering
        manager
            .move_card("algebra", 1, MoveDirection::Down)
            .await
            .unwrap();
        let listing = manager.list_admin("algebra").await.unwrap();
        let seqs: Vec<i64> = listing.iter().map(|c| c.seq).collect();
        assert_eq!(seqs, vec![3, 2, 1]);
    }

    #[tokio::test]
    async fn test_move_past_edges_rejected() {
        let manager = manager().await;

        manager.create("algebra").await.unwrap();
        manager.create("algebra").await.unwrap();

        // seq 2 is listed first
        let err = manager
            .move_card("algebra", 2, MoveDirection::Up)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let err = manager
            .move_card("algebra", 1, MoveDirection::Down)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn test_delete_returns_storage_prefix_and_drops_submissions() {
        let manager = manager().await;
        let pool = manager.db.clone();

        let card = manager.create("algebra").await.unwrap();
        sqlx::query(
            "INSERT INTO quiz_submission (id, user_id, card_id, marks, submitted_at)
             VALUES ('s1', 'u1', ?1, '[]', datetime('now'))",
        )
        .bind(&card.id)
        .execute(&pool)
        .await
        .unwrap();

        let prefix = manager.delete("algebra", 1).await.unwrap();
        assert_eq!(prefix, "algebra/tag1/");

        let remaining: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM quiz_submission WHERE card_id = ?1")
                .bind(&card.id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(remaining, 0);
    }

    #[tokio::test]
    async fn test_file_insert_positions() {
        let manager = manager().await;
        manager.create("algebra").await.unwrap();

        manager
            .append_file("algebra", 1, file("a.pdf"), InsertPosition::End)
            .await
            .unwrap();
        manager
            .append_file("algebra", 1, file("b.pdf"), InsertPosition::Start)
            .await
            .unwrap();
        let card = manager
            .append_file("algebra", 1, file("c.pdf"), InsertPosition::At(0))
            .await
            .unwrap();

        let hrefs: Vec<&str> = card.files.iter().map(|f| f.href.as_str()).collect();
        assert_eq!(hrefs, vec!["b.pdf", "c.pdf", "a.pdf"]);
    }

    #[tokio::test]
    async fn test_duplicate_file_rejected() {
        let manager = manager().await;
        manager.create("algebra").await.unwrap();

        manager
            .append_file("algebra", 1, file("a.pdf"), InsertPosition::End)
            .await
            .unwrap();
        let err = manager
            .append_file("algebra", 1, file("a.pdf"), InsertPosition::End)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_patch_file_fields() {
        let manager = manager().await;
        manager.create("algebra").await.unwrap();
        manager
            .append_file("algebra", 1, file("a.pdf"), InsertPosition::End)
            .await
            .unwrap();

        let card = manager
            .patch_file("algebra", 1, "a.pdf", Some("Cours"), None, Some(false))
            .await
            .unwrap();
        assert_eq!(card.files[0].label, "Cours");
        assert!(!card.files[0].visible);
        assert_eq!(card.files[0].hover, "");
    }

    #[tokio::test]
    async fn test_reorder_requires_exact_permutation() {
        let manager = manager().await;
        manager.create("algebra").await.unwrap();
        for name in ["a.pdf", "b.pdf", "c.pdf"] {
            manager
                .append_file("algebra", 1, file(name), InsertPosition::End)
                .await
                .unwrap();
        }

        // Valid permutation
        let order = vec!["c.pdf".to_string(), "a.pdf".to_string(), "b.pdf".to_string()];
        let card = manager.reorder_files("algebra", 1, &order).await.unwrap();
        let hrefs: Vec<&str> = card.files.iter().map(|f| f.href.as_str()).collect();
        assert_eq!(hrefs, vec!["c.pdf", "a.pdf", "b.pdf"]);

        // Missing entry
        let short = vec!["a.pdf".to_string(), "b.pdf".to_string()];
        assert!(manager.reorder_files("algebra", 1, &short).await.is_err());

        // Duplicate entry
        let dup = vec![
            "a.pdf".to_string(),
            "a.pdf".to_string(),
            "b.pdf".to_string(),
        ];
        assert!(manager.reorder_files("algebra", 1, &dup).await.is_err());

        // Unknown entry
        let unknown = vec![
            "a.pdf".to_string(),
            "b.pdf".to_string(),
            "z.pdf".to_string(),
        ];
        assert!(manager.reorder_files("algebra", 1, &unknown).await.is_err());
    }

    #[tokio::test]
    async fn test_video_operations() {
        let manager = manager().await;
        manager.create("algebra").await.unwrap();

        manager
            .insert_video("algebra", 1, InsertPosition::End)
            .await
            .unwrap();
        let card = manager
            .patch_video("algebra", 1, 0, Some("Intro"), Some("https://example.org/v1"))
            .await
            .unwrap();
        assert_eq!(card.videos[0].label, "Intro");

        let card = manager.remove_video("algebra", 1, 0).await.unwrap();
        assert!(card.videos.is_empty());

        let err = manager.remove_video("algebra", 1, 0).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_replace_quiz_reindexes_and_reports_orphans() {
        let manager = manager().await;
        manager.create("algebra").await.unwrap();

        let initial = vec![
            QuizQuestion {
                id: "old-a".to_string(),
                question: "2+2?".to_string(),
                image: Some("four.png".to_string()),
                options: vec!["3".to_string(), "4".to_string()],
                correct: Some(1),
            },
            QuizQuestion {
                id: "old-b".to_string(),
                question: "3+3?".to_string(),
                image: Some("six.png".to_string()),
                options: vec!["6".to_string(), "7".to_string()],
                correct: Some(0),
            },
        ];
        let (card, orphaned) = manager.replace_quiz("algebra", 1, initial).await.unwrap();
        assert!(orphaned.is_empty());
        assert_eq!(card.quiz[0].id, "q1");
        assert_eq!(card.quiz[1].id, "q2");

        // Drop the second question: its image becomes orphaned
        let replacement = vec![QuizQuestion {
            id: String::new(),
            question: "2+2?".to_string(),
            image: Some("four.png".to_string()),
            options: vec!["3".to_string(), "4".to_string()],
            correct: Some(1),
        }];
        let (card, orphaned) = manager
            .replace_quiz("algebra", 1, replacement)
            .await
            .unwrap();
        assert_eq!(orphaned, vec!["six.png".to_string()]);
        assert_eq!(card.quiz.len(), 1);
        assert_eq!(card.quiz[0].id, "q1");
    }

    #[tokio::test]
    async fn test_question_image_lifecycle() {
        let manager = manager().await;
        manager.create("algebra").await.unwrap();

        let questions = vec![QuizQuestion {
            id: String::new(),
            question: "2+2?".to_string(),
            image: None,
            options: vec!["4".to_string()],
            correct: Some(0),
        }];
        manager.replace_quiz("algebra", 1, questions).await.unwrap();

        let card = manager
            .set_question_image("algebra", 1, "q1", "diagram.png")
            .await
            .unwrap();
        assert_eq!(card.quiz[0].image.as_deref(), Some("diagram.png"));

        let (card, previous) = manager
            .clear_question_image("algebra", 1, "q1")
            .await
            .unwrap();
        assert_eq!(previous.as_deref(), Some("diagram.png"));
        assert_eq!(card.quiz[0].image, None);

        let err = manager
            .set_question_image("algebra", 1, "q9", "x.png")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_field_setters() {
        let manager = manager().await;
        manager.create("algebra").await.unwrap();

        let card = manager.set_title("algebra", 1, "Fractions").await.unwrap();
        assert_eq!(card.title, "Fractions");

        let card = manager.set_visible("algebra", 1, true).await.unwrap();
        assert!(card.visible);

        let card = manager
            .set_eval_mode("algebra", 1, EvalMode::Recorded)
            .await
            .unwrap();
        assert_eq!(card.eval_mode, EvalMode::Recorded);

        let card = manager
            .set_presentation("algebra", 1, &["Ligne 1".to_string()])
            .await
            .unwrap();
        assert_eq!(card.presentation, vec!["Ligne 1".to_string()]);

        let err = manager.set_title("algebra", 9, "x").await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_public_filters_and_projects() {
        let manager = manager().await;
        manager.create("algebra").await.unwrap();
        manager.create("algebra").await.unwrap();
        manager.set_visible("algebra", 1, true).await.unwrap();

        let public = manager.list_public("algebra").await.unwrap();
        assert_eq!(public.len(), 1);
        assert_eq!(public[0].seq, 1);

        let admin = manager.list_admin("algebra").await.unwrap();
        assert_eq!(admin.len(), 2);
    }
}
