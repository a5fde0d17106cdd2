/// Asset upload orchestration
///
/// Bridges the card model and the object store: every mutation that
/// touches both is sequenced here so a failure on one side leaves a
/// cleanup action, not a dangling reference. Object deletion is always
/// best-effort; failures are logged and never abort the request.
use crate::{
    cards::{Card, CardManager, FileRef, InsertPosition},
    config::{AuthConfig, StorageConfig},
    error::{ApiError, ApiResult},
    storage::{paths, ObjectStore},
};
use chrono::{DateTime, Duration, Utc};
use image::ImageFormat;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Maximum edge of the blurred background preview.
const BLUR_PREVIEW_EDGE: u32 = 32;
const BLUR_SIGMA: f32 = 8.0;

/// Claims inside a signed upload token. The token authorizes exactly
/// one object key until `exp`.
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadClaims {
    pub key: String,
    pub exp: i64,
}

/// Result of signing an upload: the client PUTs the bytes to `url`
/// and then confirms with `filename`.
#[derive(Debug, Serialize, Deserialize)]
pub struct SignedUpload {
    pub filename: String,
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

pub struct UploadManager {
    store: Arc<dyn ObjectStore>,
    cards: Arc<CardManager>,
    max_upload_bytes: u64,
    jwt_secret: String,
    upload_url_ttl_minutes: i64,
    public_url: String,
}

impl UploadManager {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        cards: Arc<CardManager>,
        storage_config: &StorageConfig,
        auth_config: &AuthConfig,
        public_url: &str,
    ) -> Self {
        Self {
            store,
            cards,
            max_upload_bytes: storage_config.max_upload_bytes,
            jwt_secret: auth_config.jwt_secret.clone(),
            upload_url_ttl_minutes: auth_config.upload_url_ttl_minutes,
            public_url: public_url.trim_end_matches('/').to_string(),
        }
    }

    /// Replace a card's background image. The previous background and
    /// its blurred preview are deleted after the swap.
    pub async fn upload_background(
        &self,
        directory: &str,
        seq: i64,
        filename: &str,
        data: Vec<u8>,
    ) -> ApiResult<Card> {
        let card = self.require_card(directory, seq).await?;

        paths::safe_filename(filename)?;
        let ext = paths::check_extension(filename, paths::BACKGROUND_EXTENSIONS)?;
        self.check_size(data.len())?;

        let unique = paths::unique_name(filename);
        let blur_name = paths::blur_file_name(&unique);
        let object_key = paths::card_object_key(directory, seq, &unique);
        let blur_key = paths::card_object_key(directory, seq, &blur_name);

        let preview = blur_preview(&data, &ext)?;

        self.store.put(&object_key, data).await?;
        if let Err(e) = self.store.put(&blur_key, preview).await {
            // Roll back the main object so no half-written pair remains
            self.cleanup(&[object_key]).await;
            return Err(e);
        }

        let updated = match self.cards.set_bg(directory, seq, &unique).await {
            Ok(card) => card,
            Err(e) => {
                self.cleanup(&[object_key, blur_key]).await;
                return Err(e);
            }
        };

        self.publish(&object_key).await;
        self.publish(&blur_key).await;

        if !card.bg.is_empty() {
            let old_key = paths::card_object_key(directory, seq, &card.bg);
            let old_blur = paths::card_object_key(directory, seq, &paths::blur_file_name(&card.bg));
            self.cleanup(&[old_key, old_blur]).await;
        }

        tracing::info!(directory = %directory, seq = seq, file = %unique, "Background replaced");

        Ok(updated)
    }

    /// Upload a course file and attach it to the card in one request.
    pub async fn upload_file(
        &self,
        directory: &str,
        seq: i64,
        label: &str,
        filename: &str,
        data: Vec<u8>,
        position: InsertPosition,
    ) -> ApiResult<Card> {
        self.require_card(directory, seq).await?;

        paths::safe_filename(filename)?;
        paths::check_extension(filename, paths::FILE_EXTENSIONS)?;
        self.check_size(data.len())?;

        let unique = paths::unique_name(filename);
        let object_key = paths::card_object_key(directory, seq, &unique);

        self.store.put(&object_key, data).await?;

        let file = FileRef {
            label: label.to_string(),
            href: unique,
            hover: String::new(),
            visible: false,
        };

        match self.cards.append_file(directory, seq, file, position).await {
            Ok(card) => {
                self.publish(&object_key).await;
                Ok(card)
            }
            Err(e) => {
                self.cleanup(&[object_key]).await;
                Err(e)
            }
        }
    }

    /// First phase of a large upload: validate the name and mint a
    /// short-lived token authorizing a direct PUT of the object.
    pub async fn sign_file_upload(
        &self,
        directory: &str,
        seq: i64,
        filename: &str,
    ) -> ApiResult<SignedUpload> {
        self.require_card(directory, seq).await?;

        paths::safe_filename(filename)?;
        paths::check_extension(filename, paths::FILE_EXTENSIONS)?;

        let unique = paths::unique_name(filename);
        let key = paths::card_object_key(directory, seq, &unique);
        let expires_at = Utc::now() + Duration::minutes(self.upload_url_ttl_minutes);

        let claims = UploadClaims {
            key,
            exp: expires_at.timestamp(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| ApiError::Internal(format!("Failed to sign upload token: {}", e)))?;

        Ok(SignedUpload {
            filename: unique,
            url: format!("{}/storage/upload?token={}", self.public_url, token),
            expires_at,
        })
    }

    /// Validate an upload token and return the object key it authorizes.
    pub fn redeem_upload_token(&self, token: &str) -> ApiResult<String> {
        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<UploadClaims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &validation,
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                ApiError::Unauthenticated("Upload token expired".to_string())
            }
            _ => ApiError::Unauthenticated("Invalid upload token".to_string()),
        })?;

        Ok(data.claims.key)
    }

    /// Store the bytes of a signed upload.
    pub async fn receive_signed_upload(&self, token: &str, data: Vec<u8>) -> ApiResult<String> {
        let key = self.redeem_upload_token(token)?;
        self.check_size(data.len())?;
        self.store.put(&key, data).await?;
        Ok(key)
    }

    /// Second phase of a large upload: confirm the object arrived and
    /// attach it to the card. Oversize objects are deleted and rejected.
    pub async fn confirm_file_upload(
        &self,
        directory: &str,
        seq: i64,
        label: &str,
        filename: &str,
        position: InsertPosition,
    ) -> ApiResult<Card> {
        self.require_card(directory, seq).await?;
        paths::safe_filename(filename)?;

        let key = paths::card_object_key(directory, seq, filename);

        let size = self
            .store
            .size(&key)
            .await?
            .ok_or_else(|| ApiError::NotFound("Uploaded object not found".to_string()))?;
        if size > self.max_upload_bytes {
            self.cleanup(std::slice::from_ref(&key)).await;
            return Err(ApiError::Validation(format!(
                "Upload exceeds the {} byte limit",
                self.max_upload_bytes
            )));
        }

        self.publish(&key).await;

        let file = FileRef {
            label: label.to_string(),
            href: filename.to_string(),
            hover: String::new(),
            visible: false,
        };

        match self.cards.append_file(directory, seq, file, position).await {
            Ok(card) => Ok(card),
            Err(e) => {
                self.cleanup(&[key]).await;
                Err(e)
            }
        }
    }

    /// Detach a file from a card and delete its object.
    pub async fn delete_file(&self, directory: &str, seq: i64, href: &str) -> ApiResult<Card> {
        paths::safe_filename(href)?;
        let card = self.cards.remove_file(directory, seq, href).await?;

        let key = paths::card_object_key(directory, seq, href);
        self.cleanup(&[key]).await;

        Ok(card)
    }

    /// Attach an image to a quiz question, replacing any previous one.
    pub async fn upload_quiz_image(
        &self,
        directory: &str,
        seq: i64,
        question_id: &str,
        filename: &str,
        data: Vec<u8>,
    ) -> ApiResult<Card> {
        let card = self.require_card(directory, seq).await?;

        paths::safe_filename(filename)?;
        paths::check_extension(filename, paths::QUIZ_IMAGE_EXTENSIONS)?;
        self.check_size(data.len())?;

        let previous = card
            .quiz
            .iter()
            .find(|q| q.id == question_id)
            .ok_or_else(|| ApiError::NotFound(format!("No question {}", question_id)))?
            .image
            .clone();

        let unique = paths::unique_name(filename);
        let key = paths::quiz_image_key(directory, seq, &unique);

        self.store.put(&key, data).await?;

        let updated = match self
            .cards
            .set_question_image(directory, seq, question_id, &unique)
            .await
        {
            Ok(card) => card,
            Err(e) => {
                self.cleanup(&[key]).await;
                return Err(e);
            }
        };

        if let Some(previous) = previous {
            self.cleanup(&[paths::quiz_image_key(directory, seq, &previous)])
                .await;
        }

        Ok(updated)
    }

    /// Detach a quiz question's image and delete the object.
    pub async fn delete_quiz_image(
        &self,
        directory: &str,
        seq: i64,
        question_id: &str,
    ) -> ApiResult<Card> {
        let (card, previous) = self
            .cards
            .clear_question_image(directory, seq, question_id)
            .await?;

        if let Some(previous) = previous {
            self.cleanup(&[paths::quiz_image_key(directory, seq, &previous)])
                .await;
        }

        Ok(card)
    }

    /// Delete quiz images orphaned by a quiz replacement.
    pub async fn cleanup_quiz_images(&self, directory: &str, seq: i64, filenames: &[String]) {
        let keys: Vec<String> = filenames
            .iter()
            .map(|name| paths::quiz_image_key(directory, seq, name))
            .collect();
        self.cleanup(&keys).await;
    }

    /// Delete a card and everything under its storage prefix.
    pub async fn delete_card(&self, directory: &str, seq: i64) -> ApiResult<()> {
        let prefix = self.cards.delete(directory, seq).await?;

        match self.store.delete_prefix(&prefix).await {
            Ok(count) => {
                tracing::info!(prefix = %prefix, objects = count, "Card storage cleaned up")
            }
            Err(e) => {
                tracing::warn!(prefix = %prefix, error = %e, "Card storage cleanup failed")
            }
        }

        Ok(())
    }

    /// Read an object for serving.
    pub async fn get_object(&self, key: &str) -> ApiResult<Option<Vec<u8>>> {
        self.store.get(key).await
    }

    async fn require_card(&self, directory: &str, seq: i64) -> ApiResult<Card> {
        self.cards
            .get(directory, seq)
            .await?
            .ok_or_else(|| ApiError::NotFound("Card not found".to_string()))
    }

    fn check_size(&self, len: usize) -> ApiResult<()> {
        if len as u64 > self.max_upload_bytes {
            return Err(ApiError::Validation(format!(
                "Upload exceeds the {} byte limit",
                self.max_upload_bytes
            )));
        }
        Ok(())
    }

    /// Best-effort public visibility. Some backends manage visibility
    /// per bucket and report no change.
    async fn publish(&self, key: &str) {
        match self.store.make_public(key).await {
            Ok(changed) => {
                if changed {
                    tracing::debug!(key = %key, "Object marked public");
                }
            }
            Err(e) => tracing::warn!(key = %key, error = %e, "Failed to mark object public"),
        }
    }

    /// Best-effort object deletion. Failures are logged, never surfaced.
    async fn cleanup(&self, keys: &[String]) {
        for key in keys {
            if let Err(e) = self.store.delete(key).await {
                tracing::warn!(key = %key, error = %e, "Object cleanup failed");
            }
        }
    }
}

/// Downscale to at most 32x32, blur, and re-encode in the original
/// format. Used as a loading placeholder for background images.
fn blur_preview(data: &[u8], ext: &str) -> ApiResult<Vec<u8>> {
    let format = ImageFormat::from_extension(ext)
        .ok_or_else(|| ApiError::Validation(format!("Unsupported image format: {}", ext)))?;

    let img = image::load_from_memory(data)
        .map_err(|e| ApiError::Validation(format!("Unreadable image: {}", e)))?;

    let preview = img
        .thumbnail(BLUR_PREVIEW_EDGE, BLUR_PREVIEW_EDGE)
        .blur(BLUR_SIGMA);

    let mut buf = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buf);
    preview
        .write_to(&mut cursor, format)
        .map_err(|e| ApiError::Internal(format!("Preview encoding failed: {}", e)))?;

    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AuthConfig, StorageBackendConfig};
    use crate::db::test_pool;
    use crate::storage::disk::DiskObjectStore;
    use tempfile::tempdir;

    fn auth_config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "0123456789abcdef0123456789abcdef".to_string(),
            access_ttl_minutes: 60,
            refresh_ttl_hours: 168,
            code_ttl_minutes: 10,
            upload_url_ttl_minutes: 15,
        }
    }

    async fn setup(max_upload_bytes: u64) -> (tempfile::TempDir, Arc<CardManager>, UploadManager) {
        let dir = tempdir().unwrap();
        let store: Arc<dyn ObjectStore> =
            Arc::new(DiskObjectStore::new(dir.path().to_path_buf()));
        let cards = Arc::new(CardManager::new(test_pool().await));
        let storage_config = StorageConfig {
            backend: StorageBackendConfig::Disk {
                location: dir.path().to_path_buf(),
            },
            max_upload_bytes,
        };
        let uploads = UploadManager::new(
            store,
            cards.clone(),
            &storage_config,
            &auth_config(),
            "http://localhost:3000",
        );
        (dir, cards, uploads)
    }

    fn png_bytes() -> Vec<u8> {
        let img = image::RgbImage::new(64, 48);
        let mut buf = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buf);
        img.write_to(&mut cursor, ImageFormat::Png).unwrap();
        buf
    }

    #[tokio::test]
    async fn test_background_upload_creates_blur_pair() {
        let (_dir, cards, uploads) = setup(1024 * 1024).await;
        cards.create("algebra").await.unwrap();

        let card = uploads
            .upload_background("algebra", 1, "bg.png", png_bytes())
            .await
            .unwrap();

        assert!(card.bg.starts_with("bg_"));
        assert!(card.bg.ends_with(".png"));

        let key = paths::card_object_key("algebra", 1, &card.bg);
        let blur_key =
            paths::card_object_key("algebra", 1, &paths::blur_file_name(&card.bg));
        assert!(uploads.store.exists(&key).await.unwrap());
        assert!(uploads.store.exists(&blur_key).await.unwrap());
    }

    #[tokio::test]
    async fn test_background_replacement_deletes_previous() {
        let (_dir, cards, uploads) = setup(1024 * 1024).await;
        cards.create("algebra").await.unwrap();

        let first = uploads
            .upload_background("algebra", 1, "bg.png", png_bytes())
            .await
            .unwrap();
        let old_key = paths::card_object_key("algebra", 1, &first.bg);

        let second = uploads
            .upload_background("algebra", 1, "other.png", png_bytes())
            .await
            .unwrap();

        assert_ne!(first.bg, second.bg);
        assert!(!uploads.store.exists(&old_key).await.unwrap());
    }

    #[tokio::test]
    async fn test_background_rejects_wrong_extension() {
        let (_dir, cards, uploads) = setup(1024 * 1024).await;
        cards.create("algebra").await.unwrap();

        let err = uploads
            .upload_background("algebra", 1, "bg.pdf", png_bytes())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn test_file_upload_attaches_hidden() {
        let (_dir, cards, uploads) = setup(1024 * 1024).await;
        cards.create("algebra").await.unwrap();

        let card = uploads
            .upload_file(
                "algebra",
                1,
                "Cours",
                "cours.pdf",
                b"pdf bytes".to_vec(),
                InsertPosition::End,
            )
            .await
            .unwrap();

        assert_eq!(card.files.len(), 1);
        assert!(!card.files[0].visible);
        assert!(card.files[0].href.starts_with("cours_"));
    }

    #[tokio::test]
    async fn test_oversize_upload_rejected() {
        let (_dir, cards, uploads) = setup(10).await;
        cards.create("algebra").await.unwrap();

        let err = uploads
            .upload_file(
                "algebra",
                1,
                "Cours",
                "cours.pdf",
                vec![0u8; 11],
                InsertPosition::End,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn test_signed_upload_round_trip() {
        let (_dir, cards, uploads) = setup(1024).await;
        cards.create("algebra").await.unwrap();

        let signed = uploads
            .sign_file_upload("algebra", 1, "notes.txt")
            .await
            .unwrap();
        let token = signed.url.split("token=").nth(1).unwrap();

        let key = uploads
            .receive_signed_upload(token, b"notes".to_vec())
            .await
            .unwrap();
        assert_eq!(
            key,
            paths::card_object_key("algebra", 1, &signed.filename)
        );

        let card = uploads
            .confirm_file_upload(
                "algebra",
                1,
                "Notes",
                &signed.filename,
                InsertPosition::End,
            )
            .await
            .unwrap();
        assert_eq!(card.files[0].href, signed.filename);
    }

    #[tokio::test]
    async fn test_confirm_rejects_oversize_and_deletes() {
        let (_dir, cards, uploads) = setup(3).await;
        cards.create("algebra").await.unwrap();

        let name = paths::unique_name("big.txt");
        let key = paths::card_object_key("algebra", 1, &name);
        uploads.store.put(&key, vec![0u8; 10]).await.unwrap();

        let err = uploads
            .confirm_file_upload("algebra", 1, "Big", &name, InsertPosition::End)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert!(!uploads.store.exists(&key).await.unwrap());
    }

    #[tokio::test]
    async fn test_confirm_missing_object_not_found() {
        let (_dir, cards, uploads) = setup(1024).await;
        cards.create("algebra").await.unwrap();

        let err = uploads
            .confirm_file_upload("algebra", 1, "Ghost", "ghost.txt", InsertPosition::End)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_invalid_upload_token_rejected() {
        let (_dir, _cards, uploads) = setup(1024).await;
        let err = uploads
            .receive_signed_upload("garbage-token", b"x".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthenticated(_)));
    }

    #[tokio::test]
    async fn test_delete_file_removes_object() {
        let (_dir, cards, uploads) = setup(1024).await;
        cards.create("algebra").await.unwrap();

        let card = uploads
            .upload_file(
                "algebra",
                1,
                "Cours",
                "cours.pdf",
                b"pdf".to_vec(),
                InsertPosition::End,
            )
            .await
            .unwrap();
        let href = card.files[0].href.clone();
        let key = paths::card_object_key("algebra", 1, &href);

        let card = uploads.delete_file("algebra", 1, &href).await.unwrap();
        assert!(card.files.is_empty());
        assert!(!uploads.store.exists(&key).await.unwrap());
    }

    #[tokio::test]
    async fn test_quiz_image_replacement_cleans_previous() {
        let (_dir, cards, uploads) = setup(1024 * 1024).await;
        cards.create("algebra").await.unwrap();
        cards
            .replace_quiz(
                "algebra",
                1,
                vec![crate::cards::QuizQuestion {
                    id: String::new(),
                    question: "2+2?".to_string(),
                    image: None,
                    options: vec!["4".to_string()],
                    correct: Some(0),
                }],
            )
            .await
            .unwrap();

        let card = uploads
            .upload_quiz_image("algebra", 1, "q1", "diagram.png", png_bytes())
            .await
            .unwrap();
        let first = card.quiz[0].image.clone().unwrap();
        let first_key = paths::quiz_image_key("algebra", 1, &first);
        assert!(uploads.store.exists(&first_key).await.unwrap());

        let card = uploads
            .upload_quiz_image("algebra", 1, "q1", "better.png", png_bytes())
            .await
            .unwrap();
        assert_ne!(card.quiz[0].image.as_deref(), Some(first.as_str()));
        assert!(!uploads.store.exists(&first_key).await.unwrap());

        let card = uploads.delete_quiz_image("algebra", 1, "q1").await.unwrap();
        assert_eq!(card.quiz[0].image, None);
    }

    #[tokio::test]
    async fn test_delete_card_removes_prefix() {
        let (_dir, cards, uploads) = setup(1024 * 1024).await;
        cards.create("algebra").await.unwrap();
        uploads
            .upload_file(
                "algebra",
                1,
                "Cours",
                "cours.pdf",
                b"pdf".to_vec(),
                InsertPosition::End,
            )
            .await
            .unwrap();

        uploads.delete_card("algebra", 1).await.unwrap();
        assert!(cards.get("algebra", 1).await.unwrap().is_none());
        assert!(uploads
            .store
            .list_prefix("algebra/tag1/")
            .await
            .unwrap()
            .is_empty());
    }

    /// Delegates to a disk store while recording which keys were
    /// marked public.
    struct RecordingStore {
        inner: DiskObjectStore,
        published: std::sync::Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl ObjectStore for RecordingStore {
        async fn put(&self, key: &str, data: Vec<u8>) -> ApiResult<()> {
            self.inner.put(key, data).await
        }

        async fn get(&self, key: &str) -> ApiResult<Option<Vec<u8>>> {
            self.inner.get(key).await
        }

        async fn delete(&self, key: &str) -> ApiResult<()> {
            self.inner.delete(key).await
        }

        async fn exists(&self, key: &str) -> ApiResult<bool> {
            self.inner.exists(key).await
        }

        async fn size(&self, key: &str) -> ApiResult<Option<u64>> {
            self.inner.size(key).await
        }

        async fn list_prefix(&self, prefix: &str) -> ApiResult<Vec<String>> {
            self.inner.list_prefix(prefix).await
        }

        async fn delete_prefix(&self, prefix: &str) -> ApiResult<usize> {
            self.inner.delete_prefix(prefix).await
        }

        async fn make_public(&self, key: &str) -> ApiResult<bool> {
            self.published.lock().unwrap().push(key.to_string());
            Ok(true)
        }
    }

    #[tokio::test]
    async fn test_uploads_mark_objects_public() {
        let dir = tempdir().unwrap();
        let store = Arc::new(RecordingStore {
            inner: DiskObjectStore::new(dir.path().to_path_buf()),
            published: std::sync::Mutex::new(Vec::new()),
        });
        let cards = Arc::new(CardManager::new(test_pool().await));
        let storage_config = StorageConfig {
            backend: StorageBackendConfig::Disk {
                location: dir.path().to_path_buf(),
            },
            max_upload_bytes: 1024 * 1024,
        };
        let uploads = UploadManager::new(
            store.clone(),
            cards.clone(),
            &storage_config,
            &auth_config(),
            "http://localhost:3000",
        );
        cards.create("algebra").await.unwrap();

        let card = uploads
            .upload_background("algebra", 1, "bg.png", png_bytes())
            .await
            .unwrap();
        let bg_key = paths::card_object_key("algebra", 1, &card.bg);
        let blur_key =
            paths::card_object_key("algebra", 1, &paths::blur_file_name(&card.bg));

        let card = uploads
            .upload_file(
                "algebra",
                1,
                "Cours",
                "cours.pdf",
                b"pdf".to_vec(),
                InsertPosition::End,
            )
            .await
            .unwrap();
        let file_key = paths::card_object_key("algebra", 1, &card.files[0].href);

        let signed = uploads
            .sign_file_upload("algebra", 1, "notes.txt")
            .await
            .unwrap();
        let token = signed.url.split("token=").nth(1).unwrap();
        uploads
            .receive_signed_upload(token, b"notes".to_vec())
            .await
            .unwrap();
        uploads
            .confirm_file_upload("algebra", 1, "Notes", &signed.filename, InsertPosition::End)
            .await
            .unwrap();
        let confirmed_key = paths::card_object_key("algebra", 1, &signed.filename);

        let published = store.published.lock().unwrap().clone();
        assert!(published.contains(&bg_key));
        assert!(published.contains(&blur_key));
        assert!(published.contains(&file_key));
        assert!(published.contains(&confirmed_key));
    }

    #[test]
    fn test_blur_preview_shrinks_image() {
        let preview = blur_preview(&png_bytes(), "png").unwrap();
        let img = image::load_from_memory(&preview).unwrap();
        assert!(img.width() <= BLUR_PREVIEW_EDGE);
        assert!(img.height() <= BLUR_PREVIEW_EDGE);
    }
}
