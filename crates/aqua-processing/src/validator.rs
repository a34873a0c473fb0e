use aqua_core::constants::{
    DEFAULT_ALLOWED_CONTENT_TYPES, DEFAULT_MAX_FILE_SIZE_BYTES, PLACEHOLDER_FILENAME,
};
use aqua_core::{ValidationError, Violation};
use std::path::Path;

/// Lowercase, drop parameters (`; charset=...`) and map the `image/jpg` alias.
pub fn normalize_content_type(content_type: &str) -> String {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase();

    match essence.as_str() {
        "image/jpg" | "image/pjpeg" => "image/jpeg".to_string(),
        _ => essence,
    }
}

/// Guess an image content type from a file extension.
pub fn guess_content_type(filename: &str) -> Option<&'static str> {
    let extension = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())?;

    match extension.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "heic" => Some("image/heic"),
        "heif" => Some("image/heif"),
        "avif" => Some("image/avif"),
        "bmp" => Some("image/bmp"),
        _ => None,
    }
}

/// Replace every character outside `[A-Za-z0-9._-]` with `_`, collapse runs of
/// `_`, and trim `_` from both ends. Never returns an empty string.
pub fn sanitize_filename(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        let c = if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
            c
        } else {
            '_'
        };
        if c == '_' && out.ends_with('_') {
            continue;
        }
        out.push(c);
    }

    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        PLACEHOLDER_FILENAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Image file validator
///
/// Pure and synchronous: checks size and content type and produces the
/// sanitized name. Every violated rule is reported, not only the first.
#[derive(Debug, Clone)]
pub struct FileValidator {
    max_file_size: u64,
    allowed_content_types: Vec<String>,
}

impl Default for FileValidator {
    fn default() -> Self {
        Self::new(
            DEFAULT_MAX_FILE_SIZE_BYTES,
            DEFAULT_ALLOWED_CONTENT_TYPES
                .iter()
                .map(|ct| ct.to_string())
                .collect(),
        )
    }
}

impl FileValidator {
    pub fn new(max_file_size: u64, allowed_content_types: Vec<String>) -> Self {
        Self {
            max_file_size,
            allowed_content_types: allowed_content_types
                .iter()
                .map(|ct| normalize_content_type(ct))
                .collect(),
        }
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    fn check_size(&self, size: u64) -> Option<Violation> {
        if size == 0 {
            return Some(Violation::EmptyFile);
        }
        if size > self.max_file_size {
            return Some(Violation::FileTooLarge {
                size,
                max: self.max_file_size,
            });
        }
        None
    }

    fn check_content_type(&self, content_type: &str) -> Option<Violation> {
        let normalized = normalize_content_type(content_type);

        if !normalized.starts_with("image/") {
            return Some(Violation::NotAnImage {
                content_type: content_type.to_string(),
            });
        }

        if !self.allowed_content_types.iter().any(|ct| ct == &normalized) {
            return Some(Violation::UnsupportedImageType {
                content_type: content_type.to_string(),
                allowed: self.allowed_content_types.clone(),
            });
        }

        None
    }

    /// Validate a candidate file, returning its sanitized name.
    pub fn validate(
        &self,
        name: &str,
        size: u64,
        content_type: &str,
    ) -> Result<String, ValidationError> {
        let violations: Vec<Violation> = [
            self.check_size(size),
            self.check_content_type(content_type),
        ]
        .into_iter()
        .flatten()
        .collect();

        if !violations.is_empty() {
            return Err(ValidationError { violations });
        }

        Ok(sanitize_filename(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_safe(name: &str) -> bool {
        !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    }

    #[test]
    fn sanitized_names_use_the_safe_alphabet() {
        let inputs = [
            "reef.jpg",
            "my photo (1).JPG",
            "산호초 사진.png",
            "__weird__name__.webp",
            "a//b\\c.gif",
            "",
            "   ",
            "???",
            "émoji 🐠.heic",
            "....",
        ];
        for input in inputs {
            let sanitized = sanitize_filename(input);
            assert!(is_safe(&sanitized), "{input:?} -> {sanitized:?}");
            assert!(!sanitized.starts_with('_') && !sanitized.ends_with('_'));
            assert!(!sanitized.contains("__"));
            assert_eq!(sanitize_filename(&sanitized), sanitized);
        }
    }

    #[test]
    fn sanitize_examples() {
        assert_eq!(sanitize_filename("my photo (1).JPG"), "my_photo_1_.JPG");
        assert_eq!(sanitize_filename("__weird__name__.webp"), "weird_name_.webp");
        assert_eq!(sanitize_filename("산호초 사진.png"), ".png");
        assert_eq!(sanitize_filename("???"), PLACEHOLDER_FILENAME);
        assert_eq!(sanitize_filename(""), PLACEHOLDER_FILENAME);
    }

    #[test]
    fn accepts_allowed_image() {
        let validator = FileValidator::default();
        let name = validator
            .validate("reef shot.jpg", 2 * 1024 * 1024, "image/jpeg")
            .unwrap();
        assert_eq!(name, "reef_shot.jpg");
    }

    #[test]
    fn normalizes_jpeg_alias_and_parameters() {
        let validator = FileValidator::default();
        assert!(validator.validate("a.jpg", 10, "image/jpg").is_ok());
        assert!(validator.validate("a.png", 10, "Image/PNG; q=0.9").is_ok());
        assert_eq!(normalize_content_type(" IMAGE/JPG "), "image/jpeg");
    }

    #[test]
    fn rejects_oversized_file() {
        let validator = FileValidator::default();
        let err = validator
            .validate("big.png", 15 * 1024 * 1024, "image/png")
            .unwrap_err();
        assert_eq!(
            err.violations,
            vec![Violation::FileTooLarge {
                size: 15 * 1024 * 1024,
                max: DEFAULT_MAX_FILE_SIZE_BYTES
            }]
        );
    }

    #[test]
    fn size_at_limit_is_accepted() {
        let validator = FileValidator::new(100, vec!["image/png".to_string()]);
        assert!(validator.validate("a.png", 100, "image/png").is_ok());
        assert!(validator.validate("a.png", 101, "image/png").is_err());
    }

    #[test]
    fn reports_every_violation() {
        let validator = FileValidator::default();
        let err = validator.validate("notes.txt", 0, "text/plain").unwrap_err();
        assert_eq!(err.violations.len(), 2);
        assert!(err.violations.contains(&Violation::EmptyFile));
        assert!(err.violations.contains(&Violation::NotAnImage {
            content_type: "text/plain".to_string()
        }));
    }

    #[test]
    fn image_outside_allow_list_is_unsupported() {
        let validator = FileValidator::default();
        let err = validator.validate("a.tiff", 10, "image/tiff").unwrap_err();
        assert!(matches!(
            err.violations[0],
            Violation::UnsupportedImageType { .. }
        ));
    }

    #[test]
    fn guesses_content_type_from_extension() {
        assert_eq!(guess_content_type("reef.JPG"), Some("image/jpeg"));
        assert_eq!(guess_content_type("dir/reef.heic"), Some("image/heic"));
        assert_eq!(guess_content_type("notes.txt"), None);
        assert_eq!(guess_content_type("noext"), None);
    }
}
