use axum::{
    extract::{Path, Query, State},
    routing::{get, patch, post},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::{
        extractors::{Identity, Staff},
        repo_types::User,
    },
    error::{ApiError, ApiResult},
    issues::{
        dto::{
            AssignRequest, CreateIssueRequest, DuplicateCandidate, IssueFilterQuery,
            IssueResponse, IssueStats, MergeRequest, MergeResponse, StatBucket,
            UpdateStatusRequest,
        },
        repo,
        repo_types::{Issue, IssueCategory, IssueStatus, NewIssue},
        service,
    },
    response::{ApiResponse, Pagination},
    state::AppState,
};

const ISSUE_SORT_COLUMNS: &[&str] = &["created_at", "updated_at", "title", "status", "category"];

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/issues", get(list_all))
        .route("/issues/my", get(list_mine))
        .route("/issues/stats", get(stats))
        .route("/issues/:id", get(get_issue))
        .route("/issues/:id/duplicates", get(find_duplicates))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/issues", post(create_issue))
        .route("/issues/:id/assign", patch(assign_issue))
        .route("/issues/:id/status", patch(update_status))
        .route("/issues/merge", post(merge_issues))
}

#[instrument(skip(state, identity, payload))]
pub async fn create_issue(
    State(state): State<AppState>,
    identity: Identity,
    Json(payload): Json<CreateIssueRequest>,
) -> ApiResult<Json<ApiResponse<IssueResponse>>> {
    let title = payload
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::Validation("title is required".into()))?;
    let description = payload
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .ok_or_else(|| ApiError::Validation("description is required".into()))?;
    let category = payload
        .category
        .as_deref()
        .and_then(IssueCategory::parse)
        .ok_or_else(|| ApiError::Validation("category is required".into()))?;

    let issue = repo::insert(
        &state.db,
        NewIssue {
            title,
            description,
            category,
            hostel_name: identity.hostel_name.as_deref(),
            reporter_id: identity.id,
        },
    )
    .await
    .map_err(ApiError::Internal)?;

    info!(issue_id = %issue.id, reporter_id = %identity.id, "issue created");
    Ok(Json(ApiResponse::ok("issue created", IssueResponse::from(issue))))
}

#[instrument(skip(state, identity))]
pub async fn list_mine(
    State(state): State<AppState>,
    identity: Identity,
    Query(page): Query<Pagination>,
) -> ApiResult<Json<ApiResponse<Vec<IssueResponse>>>> {
    let total = repo::count_by_reporter(&state.db, identity.id)
        .await
        .map_err(ApiError::Internal)?;
    let issues = repo::list_by_reporter(&state.db, identity.id, page.limit(), page.offset())
        .await
        .map_err(ApiError::Internal)?;
    let items = issues.into_iter().map(IssueResponse::from).collect();
    Ok(Json(ApiResponse::page("your issues", items, page.meta(total))))
}

fn parse_filters(query: &IssueFilterQuery) -> ApiResult<repo::IssueFilter<'_>> {
    let status = match query.status.as_deref() {
        Some(raw) => Some(
            IssueStatus::parse(raw)
                .ok_or_else(|| ApiError::Validation(format!("unknown status {}", raw)))?,
        ),
        None => None,
    };
    let category = match query.category.as_deref() {
        Some(raw) => Some(
            IssueCategory::parse(raw)
                .ok_or_else(|| ApiError::Validation(format!("unknown category {}", raw)))?,
        ),
        None => None,
    };
    let hostel = query.hostel.as_deref().map(str::trim).filter(|h| !h.is_empty());
    Ok(repo::IssueFilter {
        status,
        category,
        hostel,
    })
}

#[instrument(skip(state, _staff))]
pub async fn list_all(
    State(state): State<AppState>,
    _staff: Staff,
    Query(filters): Query<IssueFilterQuery>,
    Query(page): Query<Pagination>,
) -> ApiResult<Json<ApiResponse<Vec<IssueResponse>>>> {
    let filter = parse_filters(&filters)?;
    let total = repo::count_filtered(&state.db, filter)
        .await
        .map_err(ApiError::Internal)?;
    let issues = repo::list_filtered(
        &state.db,
        filter,
        page.order_column(ISSUE_SORT_COLUMNS, "created_at"),
        page.order(),
        page.limit(),
        page.offset(),
    )
    .await
    .map_err(ApiError::Internal)?;
    let items = issues.into_iter().map(IssueResponse::from).collect();
    Ok(Json(ApiResponse::page("issues", items, page.meta(total))))
}

#[instrument(skip(state, _staff))]
pub async fn stats(
    State(state): State<AppState>,
    _staff: Staff,
) -> ApiResult<Json<ApiResponse<IssueStats>>> {
    let by_status = repo::status_counts(&state.db)
        .await
        .map_err(ApiError::Internal)?
        .into_iter()
        .map(|(key, count)| StatBucket { key, count })
        .collect();
    let by_category = repo::category_counts(&state.db)
        .await
        .map_err(ApiError::Internal)?
        .into_iter()
        .map(|(key, count)| StatBucket { key, count })
        .collect();
    Ok(Json(ApiResponse::ok(
        "issue stats",
        IssueStats {
            by_status,
            by_category,
        },
    )))
}

#[instrument(skip(state, identity))]
pub async fn get_issue(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<IssueResponse>>> {
    let issue = load_issue(&state, id).await?;
    if issue.reporter_id != identity.id && !identity.role.is_staff() {
        return Err(ApiError::Authorization(
            "only the reporter or staff may view this issue".into(),
        ));
    }
    Ok(Json(ApiResponse::ok("issue", IssueResponse::from(issue))))
}

#[instrument(skip(state, _staff))]
pub async fn find_duplicates(
    State(state): State<AppState>,
    _staff: Staff,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Vec<DuplicateCandidate>>>> {
    let probe = load_issue(&state, id).await?;
    let scored = service::find_duplicates(&state.db, &probe)
        .await
        .map_err(ApiError::Internal)?;
    let items = scored
        .into_iter()
        .map(|(score, issue)| DuplicateCandidate {
            score,
            issue: IssueResponse::from(issue),
        })
        .collect();
    Ok(Json(ApiResponse::ok("duplicate candidates", items)))
}

#[instrument(skip(state, staff, payload))]
pub async fn assign_issue(
    State(state): State<AppState>,
    staff: Staff,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignRequest>,
) -> ApiResult<Json<ApiResponse<IssueResponse>>> {
    let caretaker_id = payload
        .caretaker_id
        .ok_or_else(|| ApiError::Validation("caretaker_id is required".into()))?;

    let caretaker = User::find_by_id(&state.db, caretaker_id)
        .await
        .map_err(ApiError::Internal)?
        .ok_or_else(|| ApiError::Validation("assignee does not exist".into()))?;
    if !caretaker.role.is_staff() {
        return Err(ApiError::Validation("assignee must be staff".into()));
    }

    let current = load_issue(&state, id).await?;
    if current.status.is_terminal() {
        return Err(ApiError::InvalidStateTransition(format!(
            "cannot assign a {} issue",
            current.status.as_wire()
        )));
    }

    let issue = repo::assign(&state.db, id, caretaker_id, payload.expected_version)
        .await
        .map_err(ApiError::Internal)?
        .ok_or_else(|| ApiError::Conflict("issue changed concurrently".into()))?;

    service::notify_best_effort(
        &state.db,
        issue.reporter_id,
        "Issue assigned",
        &format!("Your issue \"{}\" is now being handled.", issue.title),
        Some(issue.id),
    )
    .await;
    if caretaker_id != staff.0.id {
        service::notify_best_effort(
            &state.db,
            caretaker_id,
            "Issue assigned to you",
            &format!("You have been assigned \"{}\".", issue.title),
            Some(issue.id),
        )
        .await;
    }

    info!(issue_id = %id, caretaker_id = %caretaker_id, "issue assigned");
    Ok(Json(ApiResponse::ok("issue assigned", IssueResponse::from(issue))))
}

#[instrument(skip(state, _staff, payload))]
pub async fn update_status(
    State(state): State<AppState>,
    _staff: Staff,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> ApiResult<Json<ApiResponse<IssueResponse>>> {
    let next = payload
        .status
        .as_deref()
        .ok_or_else(|| ApiError::Validation("status is required".into()))
        .and_then(|raw| {
            IssueStatus::parse(raw)
                .ok_or_else(|| ApiError::Validation(format!("unknown status {}", raw)))
        })?;

    if next == IssueStatus::Merged {
        return Err(ApiError::Validation(
            "merged is set by the merge operation, not by status update".into(),
        ));
    }

    let current = load_issue(&state, id).await?;
    if !current.status.can_advance_to(next) {
        return Err(ApiError::InvalidStateTransition(format!(
            "{} -> {}",
            current.status.as_wire(),
            next.as_wire()
        )));
    }

    let issue = repo::update_status(
        &state.db,
        id,
        current.status,
        next,
        payload.expected_version,
    )
    .await
    .map_err(ApiError::Internal)?
    .ok_or_else(|| ApiError::Conflict("issue changed concurrently".into()))?;

    service::notify_best_effort(
        &state.db,
        issue.reporter_id,
        "Issue status updated",
        &format!(
            "Your issue \"{}\" is now {}.",
            issue.title,
            issue.status.as_wire()
        ),
        Some(issue.id),
    )
    .await;

    info!(issue_id = %id, status = issue.status.as_wire(), "issue status updated");
    Ok(Json(ApiResponse::ok(
        "status updated",
        IssueResponse::from(issue),
    )))
}

#[instrument(skip(state, _staff, payload))]
pub async fn merge_issues(
    State(state): State<AppState>,
    _staff: Staff,
    Json(payload): Json<MergeRequest>,
) -> ApiResult<Json<ApiResponse<MergeResponse>>> {
    let target_id = payload
        .target_id
        .ok_or_else(|| ApiError::Validation("target_id is required".into()))?;
    let source_ids = payload
        .source_ids
        .ok_or_else(|| ApiError::Validation("source_ids is required".into()))?;

    let (target, merged_ids) = service::merge_issues(&state.db, &source_ids, target_id).await?;

    Ok(Json(ApiResponse::ok(
        "issues merged",
        MergeResponse {
            target: IssueResponse::from(target),
            merged_ids,
        },
    )))
}

async fn load_issue(state: &AppState, id: Uuid) -> ApiResult<Issue> {
    repo::find_by_id(&state.db, id)
        .await
        .map_err(ApiError::Internal)?
        .ok_or_else(|| ApiError::NotFound("issue not found".into()))
}
