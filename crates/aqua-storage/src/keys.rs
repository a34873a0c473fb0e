//! Shared object key generation.
//!
//! Key format: `{prefix}/{yyyy}/{mm}/{dd}/{epoch_ms}-{8 hex}/{name}` with a UTC date
//! partition. The name is re-sanitised here even though callers pass an already
//! sanitized name, since the key is what ends up in the bucket.

use chrono::{DateTime, Datelike, Utc};

/// Longest name segment kept in a key (the tail is kept)
pub const MAX_KEY_NAME_LEN: usize = 120;

/// Collapse every run of characters outside `[A-Za-z0-9_.-]` into one `_` and
/// keep the last [`MAX_KEY_NAME_LEN`] characters.
pub fn key_safe_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_run = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
            out.push(c);
            in_run = false;
        } else if !in_run {
            out.push('_');
            in_run = true;
        }
    }

    if out.is_empty() {
        return "image.jpg".to_string();
    }

    // ASCII only at this point, so byte offsets are char offsets.
    let start = out.len().saturating_sub(MAX_KEY_NAME_LEN);
    out[start..].to_string()
}

/// Generate an object key for `name` under `prefix` at time `now`.
pub fn generate_upload_key(prefix: &str, name: &str, now: DateTime<Utc>) -> String {
    let suffix: u32 = rand::random();
    let prefix = prefix.trim_matches('/');
    let base = key_safe_name(name);

    let partition = format!(
        "{:04}/{:02}/{:02}/{}-{:08x}/{}",
        now.year(),
        now.month(),
        now.day(),
        now.timestamp_millis(),
        suffix,
        base
    );

    if prefix.is_empty() {
        partition
    } else {
        format!("{}/{}", prefix, partition)
    }
}

/// Public read URL for `key`: `{base}/{key}`, or empty when there is no public base.
pub fn public_url(public_base: Option<&str>, key: &str) -> String {
    match public_base.map(|b| b.trim_end_matches('/')) {
        Some(base) if !base.is_empty() => format!("{}/{}", base, key),
        _ => String::new(),
    }
}

/// Default public base for a bucket when no CDN is configured.
pub fn bucket_public_base(bucket: &str, region: &str) -> String {
    format!("https://{}.s3.{}.amazonaws.com", bucket, region)
}

/// Keys must not contain `..`, a leading `/`, or be empty.
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty() && !key.starts_with('/') && !key.split('/').any(|seg| seg == "..")
}
