use axum::{
    extract::{Path, Query, State},
    routing::{get, patch, post},
    Json, Router,
};
use serde::Serialize;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::extractors::Identity,
    error::{ApiError, ApiResult},
    notifications::repo::{self, Notification},
    response::{ApiResponse, Pagination},
    state::AppState,
};

#[derive(Debug, Serialize)]
pub struct UnreadCount {
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct ReadAllResponse {
    pub updated: u64,
}

pub fn notification_routes() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(list_notifications))
        .route("/notifications/unread-count", get(unread_count))
        .route("/notifications/:id/read", patch(mark_read))
        .route("/notifications/read-all", post(mark_all_read))
}

#[instrument(skip(state, identity))]
pub async fn list_notifications(
    State(state): State<AppState>,
    identity: Identity,
    Query(page): Query<Pagination>,
) -> ApiResult<Json<ApiResponse<Vec<Notification>>>> {
    let total = repo::count_by_user(&state.db, identity.id)
        .await
        .map_err(ApiError::Internal)?;
    let items = repo::list_by_user(&state.db, identity.id, page.limit(), page.offset())
        .await
        .map_err(ApiError::Internal)?;
    Ok(Json(ApiResponse::page(
        "notifications",
        items,
        page.meta(total),
    )))
}

#[instrument(skip(state, identity))]
pub async fn unread_count(
    State(state): State<AppState>,
    identity: Identity,
) -> ApiResult<Json<ApiResponse<UnreadCount>>> {
    let count = repo::unread_count(&state.db, identity.id)
        .await
        .map_err(ApiError::Internal)?;
    Ok(Json(ApiResponse::ok("unread count", UnreadCount { count })))
}

#[instrument(skip(state, identity))]
pub async fn mark_read(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Notification>>> {
    let notification = repo::mark_read(&state.db, id, identity.id)
        .await
        .map_err(ApiError::Internal)?
        .ok_or_else(|| ApiError::NotFound("notification not found".into()))?;
    Ok(Json(ApiResponse::ok("notification read", notification)))
}

#[instrument(skip(state, identity))]
pub async fn mark_all_read(
    State(state): State<AppState>,
    identity: Identity,
) -> ApiResult<Json<ApiResponse<ReadAllResponse>>> {
    let updated = repo::mark_all_read(&state.db, identity.id)
        .await
        .map_err(ApiError::Internal)?;
    Ok(Json(ApiResponse::ok(
        "notifications read",
        ReadAllResponse { updated },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unread_count_serialization() {
        let body = UnreadCount { count: 4 };
        let json = serde_json::to_string(&body).unwrap();
        assert_eq!(json, "{\"count\":4}");
    }
}
