use axum::{
    extract::{Query, State},
    routing::{delete, get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::extractors::Identity,
    error::{ApiError, ApiResult},
    response::ApiResponse,
    state::AppState,
    uploads::{
        dto::{
            DeleteRequest, DeleteResponse, DownloadQuery, DownloadResponse, SignUploadRequest,
            SignUploadResponse,
        },
        service,
    },
};

pub fn upload_routes() -> Router<AppState> {
    Router::new()
        .route("/uploads/sign", post(sign_upload))
        .route("/uploads/url", get(download_url))
        .route("/uploads", delete(delete_files))
}

#[instrument(skip(state, identity, payload))]
pub async fn sign_upload(
    State(state): State<AppState>,
    identity: Identity,
    Json(payload): Json<SignUploadRequest>,
) -> ApiResult<Json<ApiResponse<SignUploadResponse>>> {
    let filename = payload
        .filename
        .as_deref()
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .ok_or_else(|| ApiError::Validation("filename is required".into()))?;
    let content_type = payload
        .content_type
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::Validation("content_type is required".into()))?;

    if !service::is_allowed_content_type(&state.config.upload, content_type) {
        return Err(ApiError::UnsupportedMediaType(content_type.to_string()));
    }

    let key = service::object_key(identity.id, filename);
    let upload_url = state
        .storage
        .presign_put(&key, content_type, service::UPLOAD_URL_TTL_SECS)
        .await
        .map_err(ApiError::Internal)?;

    info!(user_id = %identity.id, key = %key, "upload url signed");
    Ok(Json(ApiResponse::ok(
        "upload url signed",
        SignUploadResponse {
            key,
            upload_url,
            expires_in_seconds: service::UPLOAD_URL_TTL_SECS,
            max_upload_bytes: state.config.upload.max_upload_bytes,
        },
    )))
}

#[instrument(skip(state, identity))]
pub async fn download_url(
    State(state): State<AppState>,
    identity: Identity,
    Query(query): Query<DownloadQuery>,
) -> ApiResult<Json<ApiResponse<DownloadResponse>>> {
    let key = query
        .key
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .ok_or_else(|| ApiError::Validation("key is required".into()))?;

    if !identity.role.is_staff() && !service::owns_key(identity.id, key) {
        return Err(ApiError::Authorization(
            "you may only access your own files".into(),
        ));
    }

    let ttl = service::clamp_download_ttl(query.ttl);
    let url = state
        .storage
        .presign_get(key, ttl)
        .await
        .map_err(ApiError::Internal)?;

    Ok(Json(ApiResponse::ok(
        "download url signed",
        DownloadResponse {
            url,
            expires_in_seconds: ttl,
        },
    )))
}

#[instrument(skip(state, identity, payload))]
pub async fn delete_files(
    State(state): State<AppState>,
    identity: Identity,
    Json(payload): Json<DeleteRequest>,
) -> ApiResult<Json<ApiResponse<DeleteResponse>>> {
    let keys = payload
        .keys
        .filter(|k| !k.is_empty())
        .ok_or_else(|| ApiError::Validation("keys must be non-empty".into()))?;

    if !identity.role.is_staff() {
        if let Some(foreign) = keys.iter().find(|k| !service::owns_key(identity.id, k)) {
            return Err(ApiError::Authorization(format!(
                "you may only delete your own files ({})",
                foreign
            )));
        }
    }

    let mut deleted = 0usize;
    let mut failed = Vec::new();
    for key in &keys {
        match state.storage.delete_object(key).await {
            Ok(()) => deleted += 1,
            Err(e) => {
                warn!(error = %e, key = %key, "delete failed");
                failed.push(key.clone());
            }
        }
    }

    info!(user_id = %identity.id, deleted, failed = failed.len(), "files deleted");
    Ok(Json(ApiResponse::ok(
        "delete finished",
        DeleteResponse { deleted, failed },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo_types::{ApprovalStatus, Role};
    use uuid::Uuid;

    fn identity(role: Role) -> Identity {
        Identity {
            id: Uuid::new_v4(),
            role,
            approval_status: ApprovalStatus::Approved,
            hostel_name: None,
        }
    }

    #[tokio::test]
    async fn sign_rejects_disallowed_content_type() {
        let state = AppState::fake();
        let result = sign_upload(
            State(state),
            identity(Role::Student),
            Json(SignUploadRequest {
                filename: Some("tool.exe".into()),
                content_type: Some("application/x-msdownload".into()),
            }),
        )
        .await;
        assert!(matches!(
            result.unwrap_err(),
            ApiError::UnsupportedMediaType(_)
        ));
    }

    #[tokio::test]
    async fn sign_returns_key_under_caller_prefix() {
        let state = AppState::fake();
        let caller = identity(Role::Student);
        let caller_id = caller.id;
        let response = sign_upload(
            State(state),
            caller,
            Json(SignUploadRequest {
                filename: Some("leak.png".into()),
                content_type: Some("image/png".into()),
            }),
        )
        .await
        .expect("png should be allowed");
        let data = response.0.data.expect("data present");
        assert!(data.key.starts_with(&format!("{}/", caller_id)));
        assert!(data.upload_url.contains(&data.key));
    }

    #[tokio::test]
    async fn download_requires_ownership_for_students() {
        let state = AppState::fake();
        let result = download_url(
            State(state),
            identity(Role::Student),
            Query(DownloadQuery {
                key: Some("someone-else/file.png".into()),
                ttl: None,
            }),
        )
        .await;
        assert!(matches!(result.unwrap_err(), ApiError::Authorization(_)));
    }

    #[tokio::test]
    async fn staff_can_sign_downloads_for_any_key() {
        let state = AppState::fake();
        let response = download_url(
            State(state),
            identity(Role::Caretaker),
            Query(DownloadQuery {
                key: Some("someone-else/file.png".into()),
                ttl: Some(120),
            }),
        )
        .await
        .expect("staff access");
        let data = response.0.data.expect("data present");
        assert!(data.url.contains("someone-else/file.png"));
        assert_eq!(data.expires_in_seconds, 120);
    }
}
