use chrono::{DateTime, Utc};
use std::fmt;

/// Single-use, time-limited write authorization for one object.
///
/// Not `Clone`: the uploader takes it by value, so a credential is dead after
/// its first use. It is never persisted.
#[derive(PartialEq, Eq)]
pub struct Credential {
    /// Broker-assigned key; opaque and unique within a run
    pub object_key: String,
    /// Signed write URL. Treat as a secret.
    pub upload_url: String,
    /// Public read URL of the object once written (may be empty)
    pub public_url: String,
    pub expires_at: DateTime<Utc>,
}

impl Credential {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The signed URL grants write access; keep it out of logs.
        f.debug_struct("Credential")
            .field("object_key", &self.object_key)
            .field("upload_url", &"<redacted>")
            .field("public_url", &self.public_url)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn credential(expires_at: DateTime<Utc>) -> Credential {
        Credential {
            object_key: "uploads/2024/01/01/1-abcd/reef.jpg".to_string(),
            upload_url: "https://bucket.s3/put?X-Amz-Signature=secret".to_string(),
            public_url: "https://cdn/reef.jpg".to_string(),
            expires_at,
        }
    }

    #[test]
    fn expiry_is_inclusive() {
        let now = Utc::now();
        assert!(credential(now).is_expired_at(now));
        assert!(!credential(now + Duration::seconds(60)).is_expired_at(now));
    }

    #[test]
    fn debug_redacts_signed_url() {
        let rendered = format!("{:?}", credential(Utc::now()));
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
