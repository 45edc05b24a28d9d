use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub window_seconds: u64,
    pub max_requests: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    pub max_upload_bytes: u64,
    pub allowed_mime_types: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub cors_origin: String,
    pub jwt: JwtConfig,
    pub storage: StorageConfig,
    pub rate_limit: RateLimitConfig,
    pub upload: UploadConfig,
}

fn required(name: &str) -> anyhow::Result<String> {
    std::env::var(name).with_context(|| format!("required env var {} is not set", name))
}

fn required_parsed<T>(name: &str) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    required(name)?
        .parse::<T>()
        .with_context(|| format!("env var {} is not a valid value", name))
}

/// Split a comma-separated MIME list, dropping empty entries.
pub fn parse_mime_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_ascii_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

impl AppConfig {
    /// Load configuration from the environment, failing fast on anything
    /// the service cannot run without.
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = required("DATABASE_URL")?;
        let cors_origin = required("CORS_ORIGIN")?;

        let jwt = JwtConfig {
            secret: required("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "hostelvoice".into()),
            audience: std::env::var("JWT_AUDIENCE")
                .unwrap_or_else(|_| "hostelvoice-users".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60),
            refresh_ttl_minutes: std::env::var("JWT_REFRESH_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24 * 14),
        };

        let storage = StorageConfig {
            endpoint: required("S3_ENDPOINT")?,
            bucket: required("S3_BUCKET")?,
            access_key: required("S3_ACCESS_KEY")?,
            secret_key: required("S3_SECRET_KEY")?,
            region: std::env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".into()),
        };

        let rate_limit = RateLimitConfig {
            window_seconds: required_parsed("RATE_LIMIT_WINDOW_SECONDS")?,
            max_requests: required_parsed("RATE_LIMIT_MAX_REQUESTS")?,
        };

        let allowed_mime_types = parse_mime_list(&required("ALLOWED_MIME_TYPES")?);
        anyhow::ensure!(
            !allowed_mime_types.is_empty(),
            "ALLOWED_MIME_TYPES must list at least one MIME type"
        );
        let upload = UploadConfig {
            max_upload_bytes: required_parsed("MAX_UPLOAD_BYTES")?,
            allowed_mime_types,
        };

        Ok(Self {
            database_url,
            cors_origin,
            jwt,
            storage,
            rate_limit,
            upload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_list_splits_and_normalizes() {
        let list = parse_mime_list("image/png, image/JPEG ,,application/pdf");
        assert_eq!(list, vec!["image/png", "image/jpeg", "application/pdf"]);
    }

    #[test]
    fn mime_list_empty_input() {
        assert!(parse_mime_list("").is_empty());
        assert!(parse_mime_list(" , ,").is_empty());
    }
}
