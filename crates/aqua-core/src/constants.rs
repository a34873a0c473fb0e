//! Pipeline-wide defaults.

/// Default maximum accepted file size (10 MiB)
pub const DEFAULT_MAX_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;

/// Concrete image subtypes accepted by default
pub const DEFAULT_ALLOWED_CONTENT_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/webp",
    "image/gif",
    "image/heic",
    "image/heif",
];

/// Name used when sanitising leaves nothing
pub const PLACEHOLDER_FILENAME: &str = "file";

/// Upper bound for the batch worker pool
pub const MAX_BATCH_CONCURRENCY: usize = 4;

/// Lifetime stamped on remotely issued credentials (15 minutes)
pub const DEFAULT_PRESIGN_EXPIRY_SECS: u64 = 15 * 60;

/// Default object key prefix
pub const DEFAULT_UPLOAD_PREFIX: &str = "uploads";
