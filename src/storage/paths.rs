/// Object key construction and filename hygiene
///
/// Every key under the store follows `{directory}/tag{seq}/...`, with
/// quiz images nested one level deeper under `imagesQuizz/`.
use crate::error::{ApiError, ApiResult};
use chrono::Utc;

const MAX_SEGMENT_CHARS: usize = 60;
const MAX_FILENAME_CHARS: usize = 200;

/// Extensions accepted for card background images.
pub const BACKGROUND_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif", "bmp"];

/// Extensions accepted for attached course files.
pub const FILE_EXTENSIONS: &[&str] = &[
    "pdf", "doc", "docx", "xls", "xlsx", "csv", "txt", "md", "py", "zip", "rar", "7z", "ppt",
    "pptx", "jpg", "jpeg", "png", "gif", "svg", "webp", "mp4",
];

/// Extensions accepted for quiz question images.
pub const QUIZ_IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Sanitize a directory segment: keep letters, digits, hyphens, and
/// underscores, truncated to 60 characters. An empty result is rejected.
pub fn sanitize_segment(raw: &str) -> ApiResult<String> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .take(MAX_SEGMENT_CHARS)
        .collect();

    if cleaned.is_empty() {
        return Err(ApiError::Validation(format!(
            "Invalid directory name: {:?}",
            raw
        )));
    }

    Ok(cleaned)
}

/// Reject filenames that could escape the object prefix.
pub fn safe_filename(raw: &str) -> ApiResult<&str> {
    if raw.is_empty()
        || raw.chars().count() > MAX_FILENAME_CHARS
        || raw.contains('/')
        || raw.contains('\\')
        || raw.contains("..")
    {
        return Err(ApiError::Validation(format!(
            "Invalid file name: {:?}",
            raw
        )));
    }

    Ok(raw)
}

/// Lowercased extension of a filename, if any.
pub fn extension(filename: &str) -> Option<String> {
    filename
        .rsplit_once('.')
        .filter(|(base, ext)| !base.is_empty() && !ext.is_empty())
        .map(|(_, ext)| ext.to_lowercase())
}

/// Check a filename against an extension whitelist.
pub fn check_extension(filename: &str, allowed: &[&str]) -> ApiResult<String> {
    match extension(filename) {
        Some(ext) if allowed.contains(&ext.as_str()) => Ok(ext),
        _ => Err(ApiError::Validation(format!(
            "File type not allowed: {:?}",
            filename
        ))),
    }
}

/// Derive a collision-resistant name by appending the current unix
/// millisecond timestamp before the extension.
pub fn unique_name(original: &str) -> String {
    let millis = Utc::now().timestamp_millis();
    match original.rsplit_once('.') {
        Some((base, ext)) if !base.is_empty() => format!("{}_{}.{}", base, millis, ext),
        _ => format!("{}_{}", original, millis),
    }
}

/// Name of the blurred preview stored next to a background image:
/// "Blur" is inserted before the last dot, or appended when there is none.
pub fn blur_file_name(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((base, ext)) if !base.is_empty() => format!("{}Blur.{}", base, ext),
        _ => format!("{}Blur", name),
    }
}

/// Prefix holding every object belonging to one card.
pub fn card_prefix(directory: &str, seq: i64) -> String {
    format!("{}/tag{}/", directory, seq)
}

/// Key for a file or background image attached to a card.
pub fn card_object_key(directory: &str, seq: i64, filename: &str) -> String {
    format!("{}/tag{}/{}", directory, seq, filename)
}

/// Key for a quiz question image.
pub fn quiz_image_key(directory: &str, seq: i64, filename: &str) -> String {
    format!("{}/tag{}/imagesQuizz/{}", directory, seq, filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_segment_strips_specials() {
        assert_eq!(sanitize_segment("alg`bre 3e!").unwrap(), "algbre3e");
    }

    #[test]
    fn test_sanitize_segment_truncates() {
        let long = "a".repeat(100);
        assert_eq!(sanitize_segment(&long).unwrap().len(), 60);
    }

    #[test]
    fn test_sanitize_segment_rejects_empty() {
        assert!(sanitize_segment("///").is_err());
        assert!(sanitize_segment("").is_err());
    }

    #[test]
    fn test_safe_filename_rejects_traversal() {
        assert!(safe_filename("../etc/passwd").is_err());
        assert!(safe_filename("a/b.pdf").is_err());
        assert!(safe_filename("a\\b.pdf").is_err());
        assert!(safe_filename("cours.pdf").is_ok());
    }

    #[test]
    fn test_check_extension() {
        assert_eq!(check_extension("photo.JPG", BACKGROUND_EXTENSIONS).unwrap(), "jpg");
        assert!(check_extension("script.exe", FILE_EXTENSIONS).is_err());
        assert!(check_extension("noext", FILE_EXTENSIONS).is_err());
    }

    #[test]
    fn test_unique_name_keeps_extension() {
        let name = unique_name("cours.pdf");
        assert!(name.starts_with("cours_"));
        assert!(name.ends_with(".pdf"));
    }

    #[test]
    fn test_unique_name_without_extension() {
        let name = unique_name("README");
        assert!(name.starts_with("README_"));
        assert!(!name.contains('.'));
    }

    #[test]
    fn test_blur_file_name() {
        assert_eq!(blur_file_name("bg_123.png"), "bg_123Blur.png");
        assert_eq!(blur_file_name("noext"), "noextBlur");
        assert_eq!(blur_file_name(".hidden"), ".hiddenBlur");
    }

    #[test]
    fn test_key_layout() {
        assert_eq!(card_prefix("algebra", 3), "algebra/tag3/");
        assert_eq!(
            card_object_key("algebra", 3, "cours.pdf"),
            "algebra/tag3/cours.pdf"
        );
        assert_eq!(
            quiz_image_key("algebra", 3, "q1.png"),
            "algebra/tag3/imagesQuizz/q1.png"
        );
    }
}
