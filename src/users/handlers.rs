use axum::{
    extract::{Path, Query, State},
    routing::{get, patch},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::{
        dto::PublicUser,
        extractors::{Admin, Staff},
        repo_types::ApprovalStatus,
    },
    error::{ApiError, ApiResult},
    response::{ApiResponse, Pagination},
    state::AppState,
    users::{
        dto::{ApprovalDecisionRequest, ResidentsQuery},
        repo,
    },
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users/pending", get(list_pending))
        .route("/users/:id/approval", patch(decide_approval))
        .route("/users/residents", get(list_residents))
}

#[instrument(skip(state, _admin))]
pub async fn list_pending(
    State(state): State<AppState>,
    _admin: Admin,
    Query(page): Query<Pagination>,
) -> ApiResult<Json<ApiResponse<Vec<PublicUser>>>> {
    let total = repo::count_pending(&state.db).await.map_err(ApiError::Internal)?;
    let users = repo::list_pending(&state.db, page.limit(), page.offset())
        .await
        .map_err(ApiError::Internal)?;
    let items = users.into_iter().map(PublicUser::from).collect();
    Ok(Json(ApiResponse::page(
        "pending registrations",
        items,
        page.meta(total),
    )))
}

#[instrument(skip(state, admin, payload))]
pub async fn decide_approval(
    State(state): State<AppState>,
    admin: Admin,
    Path(id): Path<Uuid>,
    Json(payload): Json<ApprovalDecisionRequest>,
) -> ApiResult<Json<ApiResponse<PublicUser>>> {
    let decision = payload
        .decision
        .as_deref()
        .map(str::trim)
        .ok_or_else(|| ApiError::Validation("decision is required".into()))?;

    let (status, reason) = match decision {
        "approved" => (ApprovalStatus::Approved, None),
        "rejected" => {
            let reason = payload
                .reason
                .as_deref()
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .ok_or_else(|| {
                    ApiError::Validation("a reason is required to reject a registration".into())
                })?;
            (ApprovalStatus::Rejected, Some(reason))
        }
        _ => {
            return Err(ApiError::Validation(
                "decision must be approved or rejected".into(),
            ))
        }
    };

    let user = repo::set_approval(&state.db, id, status, reason)
        .await
        .map_err(ApiError::Internal)?
        .ok_or_else(|| ApiError::NotFound("user not found".into()))?;

    info!(user_id = %id, admin_id = %admin.0.id, decision = %decision, "registration reviewed");
    Ok(Json(ApiResponse::ok(
        "registration reviewed",
        PublicUser::from(user),
    )))
}

#[instrument(skip(state, _staff))]
pub async fn list_residents(
    State(state): State<AppState>,
    _staff: Staff,
    Query(filter): Query<ResidentsQuery>,
    Query(page): Query<Pagination>,
) -> ApiResult<Json<ApiResponse<Vec<PublicUser>>>> {
    let hostel = filter.hostel.as_deref().map(str::trim).filter(|h| !h.is_empty());
    let total = repo::count_residents(&state.db, hostel)
        .await
        .map_err(ApiError::Internal)?;
    let users = repo::list_residents(&state.db, hostel, page.limit(), page.offset())
        .await
        .map_err(ApiError::Internal)?;
    let items = users.into_iter().map(PublicUser::from).collect();
    Ok(Json(ApiResponse::page("residents", items, page.meta(total))))
}
