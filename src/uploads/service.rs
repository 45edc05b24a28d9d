use uuid::Uuid;

use crate::config::UploadConfig;

/// How long a signed upload URL stays valid.
pub const UPLOAD_URL_TTL_SECS: u64 = 15 * 60;

pub const DOWNLOAD_TTL_DEFAULT_SECS: u64 = 10 * 60;
pub const DOWNLOAD_TTL_MIN_SECS: u64 = 60;
pub const DOWNLOAD_TTL_MAX_SECS: u64 = 24 * 60 * 60;

pub fn is_allowed_content_type(cfg: &UploadConfig, content_type: &str) -> bool {
    let ct = content_type.trim().to_ascii_lowercase();
    cfg.allowed_mime_types.iter().any(|allowed| *allowed == ct)
}

/// Strip anything that is not safe in an object key. Path separators and
/// dots cannot survive, so a key can never escape its prefix.
pub fn sanitize_filename(raw: &str) -> String {
    let mut out: String = raw
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    while out.starts_with('.') {
        out.remove(0);
    }
    out.truncate(100);
    if out.is_empty() {
        out.push_str("file");
    }
    out
}

/// Unique object key under the owner's prefix:
/// `{userId}/{timestamp}-{random}-{sanitizedFilename}`.
pub fn object_key(user_id: Uuid, filename: &str) -> String {
    let ts = time::OffsetDateTime::now_utc().unix_timestamp();
    let nonce: u32 = rand::random();
    format!("{}/{}-{:08x}-{}", user_id, ts, nonce, sanitize_filename(filename))
}

/// A key belongs to a user when it sits under their id prefix.
pub fn owns_key(user_id: Uuid, key: &str) -> bool {
    key.strip_prefix(&user_id.to_string())
        .map(|rest| rest.starts_with('/'))
        .unwrap_or(false)
}

pub fn clamp_download_ttl(requested: Option<u64>) -> u64 {
    requested
        .unwrap_or(DOWNLOAD_TTL_DEFAULT_SECS)
        .clamp(DOWNLOAD_TTL_MIN_SECS, DOWNLOAD_TTL_MAX_SECS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> UploadConfig {
        UploadConfig {
            max_upload_bytes: 1024,
            allowed_mime_types: vec!["image/png".into(), "image/jpeg".into()],
        }
    }

    #[test]
    fn content_type_allow_list_is_case_insensitive() {
        let cfg = cfg();
        assert!(is_allowed_content_type(&cfg, "image/png"));
        assert!(is_allowed_content_type(&cfg, "Image/PNG "));
        assert!(!is_allowed_content_type(&cfg, "application/x-msdownload"));
        assert!(!is_allowed_content_type(&cfg, "image/webp"));
    }

    #[test]
    fn sanitize_keeps_safe_characters() {
        assert_eq!(sanitize_filename("leak-photo_01.png"), "leak-photo_01.png");
        assert_eq!(sanitize_filename("room 417/../etc"), "room_417_.._etc");
        assert_eq!(sanitize_filename("../../passwd"), "_.._passwd");
        assert_eq!(sanitize_filename("  "), "file");
    }

    #[test]
    fn sanitize_strips_leading_dots_and_truncates() {
        assert_eq!(sanitize_filename("...hidden"), "hidden");
        let long = "x".repeat(300);
        assert_eq!(sanitize_filename(&long).len(), 100);
    }

    #[test]
    fn object_key_is_prefixed_with_the_owner() {
        let user = Uuid::new_v4();
        let key = object_key(user, "photo.png");
        assert!(key.starts_with(&format!("{}/", user)));
        assert!(key.ends_with("-photo.png"));
        assert!(owns_key(user, &key));
    }

    #[test]
    fn object_keys_do_not_collide() {
        let user = Uuid::new_v4();
        assert_ne!(object_key(user, "a.png"), object_key(user, "a.png"));
    }

    #[test]
    fn ownership_requires_the_full_prefix_segment() {
        let user = Uuid::new_v4();
        assert!(owns_key(user, &format!("{}/x.png", user)));
        assert!(!owns_key(user, &format!("{}extra/x.png", user)));
        assert!(!owns_key(user, "someone-else/x.png"));
    }

    #[test]
    fn download_ttl_clamps() {
        assert_eq!(clamp_download_ttl(None), DOWNLOAD_TTL_DEFAULT_SECS);
        assert_eq!(clamp_download_ttl(Some(5)), DOWNLOAD_TTL_MIN_SECS);
        assert_eq!(clamp_download_ttl(Some(999_999)), DOWNLOAD_TTL_MAX_SECS);
        assert_eq!(clamp_download_ttl(Some(3600)), 3600);
    }
}
