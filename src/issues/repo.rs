use anyhow::Context;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::issues::repo_types::{Issue, IssueCategory, IssueStatus, NewIssue};

const ISSUE_COLUMNS: &str = "id, title, description, category, status, hostel_name, \
     reporter_id, assigned_to, merged_into, version, created_at, updated_at";

/// Filters for the staff listing. `None` means "any".
#[derive(Debug, Default, Clone, Copy)]
pub struct IssueFilter<'a> {
    pub status: Option<IssueStatus>,
    pub category: Option<IssueCategory>,
    pub hostel: Option<&'a str>,
}

pub async fn insert(db: &PgPool, new: NewIssue<'_>) -> anyhow::Result<Issue> {
    let issue = sqlx::query_as::<_, Issue>(&format!(
        r#"
        INSERT INTO issues (title, description, category, hostel_name, reporter_id)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {ISSUE_COLUMNS}
        "#
    ))
    .bind(new.title)
    .bind(new.description)
    .bind(new.category)
    .bind(new.hostel_name)
    .bind(new.reporter_id)
    .fetch_one(db)
    .await
    .context("insert issue")?;
    Ok(issue)
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Issue>> {
    let issue = sqlx::query_as::<_, Issue>(&format!(
        "SELECT {ISSUE_COLUMNS} FROM issues WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(db)
    .await
    .context("find issue")?;
    Ok(issue)
}

pub async fn list_by_reporter(
    db: &PgPool,
    reporter_id: Uuid,
    limit: i64,
    offset: i64,
) -> anyhow::Result<Vec<Issue>> {
    let rows = sqlx::query_as::<_, Issue>(&format!(
        r#"
        SELECT {ISSUE_COLUMNS}
        FROM issues
        WHERE reporter_id = $1
        ORDER BY created_at DESC
        LIMIT $2 OFFSET $3
        "#
    ))
    .bind(reporter_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await
    .context("list issues by reporter")?;
    Ok(rows)
}

pub async fn count_by_reporter(db: &PgPool, reporter_id: Uuid) -> anyhow::Result<i64> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM issues WHERE reporter_id = $1")
        .bind(reporter_id)
        .fetch_one(db)
        .await
        .context("count issues by reporter")?;
    Ok(count)
}

pub async fn list_filtered(
    db: &PgPool,
    filter: IssueFilter<'_>,
    order_column: &str,
    order: &str,
    limit: i64,
    offset: i64,
) -> anyhow::Result<Vec<Issue>> {
    // order_column/order come from the pagination whitelist, never from
    // raw client input.
    let rows = sqlx::query_as::<_, Issue>(&format!(
        r#"
        SELECT {ISSUE_COLUMNS}
        FROM issues
        WHERE ($1::issue_status IS NULL OR status = $1)
          AND ($2::issue_category IS NULL OR category = $2)
          AND ($3::text IS NULL OR hostel_name = $3)
        ORDER BY {order_column} {order}
        LIMIT $4 OFFSET $5
        "#
    ))
    .bind(filter.status)
    .bind(filter.category)
    .bind(filter.hostel)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await
    .context("list issues")?;
    Ok(rows)
}

pub async fn count_filtered(db: &PgPool, filter: IssueFilter<'_>) -> anyhow::Result<i64> {
    let (count,): (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*)
        FROM issues
        WHERE ($1::issue_status IS NULL OR status = $1)
          AND ($2::issue_category IS NULL OR category = $2)
          AND ($3::text IS NULL OR hostel_name = $3)
        "#,
    )
    .bind(filter.status)
    .bind(filter.category)
    .bind(filter.hostel)
    .fetch_one(db)
    .await
    .context("count issues")?;
    Ok(count)
}

/// Non-terminal issues sharing the probe's category and hostel; the
/// similarity scoring happens in the service layer.
pub async fn duplicate_pool(db: &PgPool, probe: &Issue) -> anyhow::Result<Vec<Issue>> {
    let rows = sqlx::query_as::<_, Issue>(&format!(
        r#"
        SELECT {ISSUE_COLUMNS}
        FROM issues
        WHERE id <> $1
          AND category = $2
          AND hostel_name IS NOT DISTINCT FROM $3
          AND status IN ('open', 'in_progress')
        ORDER BY created_at DESC
        LIMIT 200
        "#
    ))
    .bind(probe.id)
    .bind(probe.category)
    .bind(probe.hostel_name.as_deref())
    .fetch_all(db)
    .await
    .context("load duplicate candidate pool")?;
    Ok(rows)
}

/// Set the assignee, advancing `open` to `in_progress`. Guarded against
/// terminal states and, when supplied, a stale version token. Returns
/// `None` when no row matched the guards.
pub async fn assign(
    db: &PgPool,
    id: Uuid,
    caretaker_id: Uuid,
    expected_version: Option<i32>,
) -> anyhow::Result<Option<Issue>> {
    let row = sqlx::query_as::<_, Issue>(&format!(
        r#"
        UPDATE issues
        SET assigned_to = $2,
            status = CASE WHEN status = 'open' THEN 'in_progress'::issue_status ELSE status END,
            version = version + 1,
            updated_at = now()
        WHERE id = $1
          AND status IN ('open', 'in_progress')
          AND ($3::int IS NULL OR version = $3)
        RETURNING {ISSUE_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(caretaker_id)
    .bind(expected_version)
    .fetch_optional(db)
    .await
    .context("assign issue")?;
    Ok(row)
}

/// Single-step status move, guarded on the expected current status (and
/// version when supplied) so concurrent updates lose loudly, not silently.
pub async fn update_status(
    db: &PgPool,
    id: Uuid,
    from: IssueStatus,
    to: IssueStatus,
    expected_version: Option<i32>,
) -> anyhow::Result<Option<Issue>> {
    let row = sqlx::query_as::<_, Issue>(&format!(
        r#"
        UPDATE issues
        SET status = $3, version = version + 1, updated_at = now()
        WHERE id = $1 AND status = $2 AND ($4::int IS NULL OR version = $4)
        RETURNING {ISSUE_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(from)
    .bind(to)
    .bind(expected_version)
    .fetch_optional(db)
    .await
    .context("update issue status")?;
    Ok(row)
}

pub async fn find_by_id_for_update_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
) -> anyhow::Result<Option<Issue>> {
    let issue = sqlx::query_as::<_, Issue>(&format!(
        "SELECT {ISSUE_COLUMNS} FROM issues WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut **tx)
    .await
    .context("lock issue for update")?;
    Ok(issue)
}

pub async fn mark_merged_tx(
    tx: &mut Transaction<'_, Postgres>,
    source_id: Uuid,
    target_id: Uuid,
) -> anyhow::Result<Option<Issue>> {
    let row = sqlx::query_as::<_, Issue>(&format!(
        r#"
        UPDATE issues
        SET status = 'merged', merged_into = $2, version = version + 1, updated_at = now()
        WHERE id = $1 AND status IN ('open', 'in_progress')
        RETURNING {ISSUE_COLUMNS}
        "#
    ))
    .bind(source_id)
    .bind(target_id)
    .fetch_optional(&mut **tx)
    .await
    .context("mark issue merged")?;
    Ok(row)
}

/// Bump the canonical issue so its version reflects the merge.
pub async fn touch_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
) -> anyhow::Result<Issue> {
    let row = sqlx::query_as::<_, Issue>(&format!(
        r#"
        UPDATE issues
        SET version = version + 1, updated_at = now()
        WHERE id = $1
        RETURNING {ISSUE_COLUMNS}
        "#
    ))
    .bind(id)
    .fetch_one(&mut **tx)
    .await
    .context("touch issue")?;
    Ok(row)
}

pub async fn status_counts(db: &PgPool) -> anyhow::Result<Vec<(String, i64)>> {
    let rows: Vec<(String, i64)> =
        sqlx::query_as("SELECT status::text, COUNT(*) FROM issues GROUP BY status")
            .fetch_all(db)
            .await
            .context("issue status counts")?;
    Ok(rows)
}

pub async fn category_counts(db: &PgPool) -> anyhow::Result<Vec<(String, i64)>> {
    let rows: Vec<(String, i64)> =
        sqlx::query_as("SELECT category::text, COUNT(*) FROM issues GROUP BY category")
            .fetch_all(db)
            .await
            .context("issue category counts")?;
    Ok(rows)
}
