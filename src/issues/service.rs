use std::collections::{HashMap, HashSet};

use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::ApiError;
use crate::issues::repo;
use crate::issues::repo_types::{Issue, IssueStatus};
use crate::notifications;

/// Minimum Jaccard overlap for an issue to count as a duplicate candidate.
pub const SIMILARITY_THRESHOLD: f64 = 0.3;

const MAX_CANDIDATES: usize = 10;

/// Normalised word tokens: lowercased alphanumeric runs of at least two
/// characters.
fn tokens(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() >= 2)
        .map(|w| w.to_string())
        .collect()
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count() as f64;
    let union = a.union(b).count() as f64;
    intersection / union
}

/// Similarity of two issues over their combined title and description.
pub fn similarity(a: &Issue, b: &Issue) -> f64 {
    let ta = tokens(&format!("{} {}", a.title, a.description));
    let tb = tokens(&format!("{} {}", b.title, b.description));
    jaccard(&ta, &tb)
}

/// Candidate duplicates for the probe issue: non-terminal issues in the same
/// category and hostel whose token overlap clears the threshold, best first.
pub async fn find_duplicates(
    db: &PgPool,
    probe: &Issue,
) -> anyhow::Result<Vec<(f64, Issue)>> {
    let pool = repo::duplicate_pool(db, probe).await?;
    let mut scored: Vec<(f64, Issue)> = pool
        .into_iter()
        .map(|cand| (similarity(probe, &cand), cand))
        .filter(|(score, _)| *score >= SIMILARITY_THRESHOLD)
        .collect();
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(MAX_CANDIDATES);
    Ok(scored)
}

/// Reject structurally invalid merge input before any database work.
pub fn validate_merge_request(source_ids: &[Uuid], target_id: Uuid) -> Result<(), ApiError> {
    if source_ids.is_empty() {
        return Err(ApiError::Validation("source_ids must be non-empty".into()));
    }
    if source_ids.contains(&target_id) {
        return Err(ApiError::Validation(
            "an issue cannot be merged into itself".into(),
        ));
    }
    Ok(())
}

/// Fold the source issues into the target. All sources move to `merged`
/// (recording the target) in one transaction, or nothing changes. The
/// target's text is left untouched; the sources remain readable as the
/// record of detail.
pub async fn merge_issues(
    db: &PgPool,
    source_ids: &[Uuid],
    target_id: Uuid,
) -> Result<(Issue, Vec<Uuid>), ApiError> {
    validate_merge_request(source_ids, target_id)?;

    let mut unique_sources: Vec<Uuid> = Vec::new();
    for id in source_ids {
        if !unique_sources.contains(id) {
            unique_sources.push(*id);
        }
    }

    let mut tx = db.begin().await.map_err(|e| ApiError::Internal(e.into()))?;

    // Lock every row in id order so concurrent merges cannot deadlock.
    let mut lock_order: Vec<Uuid> = unique_sources.clone();
    lock_order.push(target_id);
    lock_order.sort();

    let mut locked: HashMap<Uuid, Issue> = HashMap::new();
    for id in &lock_order {
        let issue = repo::find_by_id_for_update_tx(&mut tx, *id)
            .await
            .map_err(ApiError::Internal)?
            .ok_or_else(|| ApiError::NotFound(format!("issue {} not found", id)))?;
        locked.insert(*id, issue);
    }

    let target = &locked[&target_id];
    if target.status == IssueStatus::Merged {
        return Err(ApiError::InvalidStateTransition(
            "target issue is itself merged".into(),
        ));
    }

    let mut merged_ids = Vec::with_capacity(unique_sources.len());
    for id in &unique_sources {
        let source = &locked[id];
        if source.status.is_terminal() {
            return Err(ApiError::InvalidStateTransition(format!(
                "issue {} is already {}",
                id,
                source.status.as_wire()
            )));
        }
        let merged = repo::mark_merged_tx(&mut tx, *id, target_id)
            .await
            .map_err(ApiError::Internal)?
            .ok_or_else(|| {
                ApiError::Conflict(format!("issue {} changed during merge", id))
            })?;

        notifications::repo::insert_tx(
            &mut tx,
            merged.reporter_id,
            "Issue merged",
            &format!(
                "Your report \"{}\" was merged into a related issue.",
                merged.title
            ),
            Some(merged.id),
        )
        .await
        .map_err(ApiError::Internal)?;

        merged_ids.push(*id);
    }

    let target = repo::touch_tx(&mut tx, target_id)
        .await
        .map_err(ApiError::Internal)?;

    tx.commit().await.map_err(|e| ApiError::Internal(e.into()))?;

    info!(target_id = %target_id, merged = merged_ids.len(), "issues merged");
    Ok((target, merged_ids))
}

/// Insert a notification outside the workflow transaction; a failure here
/// must not fail the request that triggered it.
pub async fn notify_best_effort(
    db: &PgPool,
    user_id: Uuid,
    title: &str,
    body: &str,
    issue_id: Option<Uuid>,
) {
    if let Err(e) = notifications::repo::insert(db, user_id, title, body, issue_id).await {
        warn!(error = %e, user_id = %user_id, "notification insert failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issues::repo_types::{IssueCategory, IssueStatus};
    use time::OffsetDateTime;

    fn issue(title: &str, description: &str) -> Issue {
        Issue {
            id: Uuid::new_v4(),
            title: title.into(),
            description: description.into(),
            category: IssueCategory::Maintenance,
            status: IssueStatus::Open,
            hostel_name: Some("North Block".into()),
            reporter_id: Uuid::new_v4(),
            assigned_to: None,
            merged_into: None,
            version: 1,
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn tokens_normalize_case_and_punctuation() {
        let t = tokens("Ceiling LEAK, in room-417!");
        assert!(t.contains("ceiling"));
        assert!(t.contains("leak"));
        assert!(t.contains("room"));
        assert!(t.contains("417"));
        assert!(t.contains("in"));
        // single characters are dropped
        assert!(!t.contains(""));
        assert_eq!(tokens("a b c").len(), 0);
    }

    #[test]
    fn jaccard_bounds() {
        let a = tokens("water leak in bathroom");
        assert!((jaccard(&a, &a) - 1.0).abs() < f64::EPSILON);

        let b = tokens("broken fan");
        assert_eq!(jaccard(&a, &b), 0.0);

        let empty = HashSet::new();
        assert_eq!(jaccard(&empty, &empty), 0.0);
    }

    #[test]
    fn near_duplicates_clear_the_threshold() {
        let a = issue("Water leak", "ceiling drip in bathroom near room 417");
        let b = issue("Leak in bathroom", "water dripping from ceiling near 417");
        assert!(similarity(&a, &b) >= SIMILARITY_THRESHOLD);
    }

    #[test]
    fn unrelated_issues_stay_below_the_threshold() {
        let a = issue("Water leak", "ceiling drip in bathroom");
        let b = issue("Broken tube light", "corridor light flickers at night");
        assert!(similarity(&a, &b) < SIMILARITY_THRESHOLD);
    }

    #[test]
    fn merge_validation_rejects_empty_sources() {
        let err = validate_merge_request(&[], Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn merge_validation_rejects_self_merge() {
        let target = Uuid::new_v4();
        let err = validate_merge_request(&[Uuid::new_v4(), target], target).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn merge_validation_accepts_distinct_ids() {
        assert!(validate_merge_request(&[Uuid::new_v4()], Uuid::new_v4()).is_ok());
    }
}
