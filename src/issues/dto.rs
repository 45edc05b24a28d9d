use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::issues::repo_types::{Issue, IssueCategory, IssueStatus};

#[derive(Debug, Deserialize)]
pub struct CreateIssueRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
}

/// Filters for the staff listing; all free-text, validated by the handler.
#[derive(Debug, Deserialize)]
pub struct IssueFilterQuery {
    pub status: Option<String>,
    pub category: Option<String>,
    pub hostel: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    pub caretaker_id: Option<Uuid>,
    pub expected_version: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: Option<String>,
    pub expected_version: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct MergeRequest {
    pub source_ids: Option<Vec<Uuid>>,
    pub target_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct IssueResponse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: IssueCategory,
    pub status: IssueStatus,
    pub hostel_name: Option<String>,
    pub reporter_id: Uuid,
    pub assigned_to: Option<Uuid>,
    pub merged_into: Option<Uuid>,
    pub version: i32,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl From<Issue> for IssueResponse {
    fn from(i: Issue) -> Self {
        Self {
            id: i.id,
            title: i.title,
            description: i.description,
            category: i.category,
            status: i.status,
            hostel_name: i.hostel_name,
            reporter_id: i.reporter_id,
            assigned_to: i.assigned_to,
            merged_into: i.merged_into,
            version: i.version,
            created_at: i.created_at,
            updated_at: i.updated_at,
        }
    }
}

/// One duplicate candidate with its similarity score in [0, 1].
#[derive(Debug, Serialize)]
pub struct DuplicateCandidate {
    pub score: f64,
    pub issue: IssueResponse,
}

#[derive(Debug, Serialize)]
pub struct MergeResponse {
    pub target: IssueResponse,
    pub merged_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct StatBucket {
    pub key: String,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct IssueStats {
    pub by_status: Vec<StatBucket>,
    pub by_category: Vec<StatBucket>,
}
