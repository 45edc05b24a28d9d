use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::repo_types::{ApprovalStatus, User};

const USER_COLUMNS: &str = "id, email, password_hash, full_name, role, approval_status, \
     rejection_reason, hostel_name, room_number, phone_number, department, created_at";

/// Registrations still waiting for an admin decision, oldest first.
pub async fn list_pending(db: &PgPool, limit: i64, offset: i64) -> anyhow::Result<Vec<User>> {
    let rows = sqlx::query_as::<_, User>(&format!(
        r#"
        SELECT {USER_COLUMNS}
        FROM users
        WHERE approval_status = 'pending' AND role <> 'admin'
        ORDER BY created_at ASC
        LIMIT $1 OFFSET $2
        "#
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await
    .context("list pending users")?;
    Ok(rows)
}

pub async fn count_pending(db: &PgPool) -> anyhow::Result<i64> {
    let (count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM users WHERE approval_status = 'pending' AND role <> 'admin'",
    )
    .fetch_one(db)
    .await
    .context("count pending users")?;
    Ok(count)
}

/// Approved students, optionally narrowed to one hostel.
pub async fn list_residents(
    db: &PgPool,
    hostel: Option<&str>,
    limit: i64,
    offset: i64,
) -> anyhow::Result<Vec<User>> {
    let rows = sqlx::query_as::<_, User>(&format!(
        r#"
        SELECT {USER_COLUMNS}
        FROM users
        WHERE role = 'student'
          AND approval_status = 'approved'
          AND ($1::text IS NULL OR hostel_name = $1)
        ORDER BY full_name ASC
        LIMIT $2 OFFSET $3
        "#
    ))
    .bind(hostel)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await
    .context("list residents")?;
    Ok(rows)
}

pub async fn count_residents(db: &PgPool, hostel: Option<&str>) -> anyhow::Result<i64> {
    let (count,): (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*)
        FROM users
        WHERE role = 'student'
          AND approval_status = 'approved'
          AND ($1::text IS NULL OR hostel_name = $1)
        "#,
    )
    .bind(hostel)
    .fetch_one(db)
    .await
    .context("count residents")?;
    Ok(count)
}

/// Record an admin decision. Admin accounts are not reviewable; approving
/// clears any previous rejection reason.
pub async fn set_approval(
    db: &PgPool,
    user_id: Uuid,
    status: ApprovalStatus,
    reason: Option<&str>,
) -> anyhow::Result<Option<User>> {
    let row = sqlx::query_as::<_, User>(&format!(
        r#"
        UPDATE users
        SET approval_status = $2, rejection_reason = $3
        WHERE id = $1 AND role <> 'admin'
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(user_id)
    .bind(status)
    .bind(reason)
    .fetch_optional(db)
    .await
    .context("set approval status")?;
    Ok(row)
}
