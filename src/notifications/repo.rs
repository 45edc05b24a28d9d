use anyhow::Context;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub issue_id: Option<Uuid>,
    pub title: String,
    pub body: String,
    pub is_read: bool,
    pub read_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}

const NOTIFICATION_COLUMNS: &str =
    "id, user_id, issue_id, title, body, is_read, read_at, created_at";

pub async fn insert(
    db: &PgPool,
    user_id: Uuid,
    title: &str,
    body: &str,
    issue_id: Option<Uuid>,
) -> anyhow::Result<Notification> {
    let row = sqlx::query_as::<_, Notification>(&format!(
        r#"
        INSERT INTO notifications (user_id, issue_id, title, body)
        VALUES ($1, $2, $3, $4)
        RETURNING {NOTIFICATION_COLUMNS}
        "#
    ))
    .bind(user_id)
    .bind(issue_id)
    .bind(title)
    .bind(body)
    .fetch_one(db)
    .await
    .context("insert notification")?;
    Ok(row)
}

/// Insert within a caller-owned transaction (used by the merge workflow so
/// the notification lands with the merge or not at all).
pub async fn insert_tx(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    title: &str,
    body: &str,
    issue_id: Option<Uuid>,
) -> anyhow::Result<Notification> {
    let row = sqlx::query_as::<_, Notification>(&format!(
        r#"
        INSERT INTO notifications (user_id, issue_id, title, body)
        VALUES ($1, $2, $3, $4)
        RETURNING {NOTIFICATION_COLUMNS}
        "#
    ))
    .bind(user_id)
    .bind(issue_id)
    .bind(title)
    .bind(body)
    .fetch_one(&mut **tx)
    .await
    .context("insert notification")?;
    Ok(row)
}

pub async fn list_by_user(
    db: &PgPool,
    user_id: Uuid,
    limit: i64,
    offset: i64,
) -> anyhow::Result<Vec<Notification>> {
    let rows = sqlx::query_as::<_, Notification>(&format!(
        r#"
        SELECT {NOTIFICATION_COLUMNS}
        FROM notifications
        WHERE user_id = $1
        ORDER BY created_at DESC
        LIMIT $2 OFFSET $3
        "#
    ))
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await
    .context("list notifications")?;
    Ok(rows)
}

pub async fn count_by_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<i64> {
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM notifications WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(db)
            .await
            .context("count notifications")?;
    Ok(count)
}

pub async fn unread_count(db: &PgPool, user_id: Uuid) -> anyhow::Result<i64> {
    let (count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND NOT is_read",
    )
    .bind(user_id)
    .fetch_one(db)
    .await
    .context("count unread notifications")?;
    Ok(count)
}

/// Mark one of the caller's notifications read. Idempotent: re-reading keeps
/// the original `read_at`.
pub async fn mark_read(
    db: &PgPool,
    id: Uuid,
    user_id: Uuid,
) -> anyhow::Result<Option<Notification>> {
    let row = sqlx::query_as::<_, Notification>(&format!(
        r#"
        UPDATE notifications
        SET is_read = true, read_at = COALESCE(read_at, now())
        WHERE id = $1 AND user_id = $2
        RETURNING {NOTIFICATION_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(db)
    .await
    .context("mark notification read")?;
    Ok(row)
}

/// Mark everything unread as read; returns how many rows changed.
pub async fn mark_all_read(db: &PgPool, user_id: Uuid) -> anyhow::Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE notifications
        SET is_read = true, read_at = now()
        WHERE user_id = $1 AND NOT is_read
        "#,
    )
    .bind(user_id)
    .execute(db)
    .await
    .context("mark all notifications read")?;
    Ok(result.rows_affected())
}
