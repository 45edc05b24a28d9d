use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Issue lifecycle. `Merged` is terminal and only ever set by the merge
/// operation; `UpdateStatus` walks the linear chain one step at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(type_name = "issue_status", rename_all = "snake_case")]
pub enum IssueStatus {
    Open,
    InProgress,
    Resolved,
    Merged,
}

impl IssueStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Some(IssueStatus::Open),
            "in-progress" | "in_progress" => Some(IssueStatus::InProgress),
            "resolved" => Some(IssueStatus::Resolved),
            "merged" => Some(IssueStatus::Merged),
            _ => None,
        }
    }

    pub fn as_wire(self) -> &'static str {
        match self {
            IssueStatus::Open => "open",
            IssueStatus::InProgress => "in-progress",
            IssueStatus::Resolved => "resolved",
            IssueStatus::Merged => "merged",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, IssueStatus::Resolved | IssueStatus::Merged)
    }

    /// Forward-only linear transitions; no skips, no backward moves, and
    /// `Merged` is never a valid target here.
    pub fn can_advance_to(self, next: IssueStatus) -> bool {
        matches!(
            (self, next),
            (IssueStatus::Open, IssueStatus::InProgress)
                | (IssueStatus::InProgress, IssueStatus::Resolved)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "PascalCase")]
#[sqlx(type_name = "issue_category", rename_all = "snake_case")]
pub enum IssueCategory {
    Maintenance,
    Electrical,
    Plumbing,
    Cleanliness,
    Safety,
    Other,
}

impl IssueCategory {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "maintenance" => Some(IssueCategory::Maintenance),
            "electrical" => Some(IssueCategory::Electrical),
            "plumbing" => Some(IssueCategory::Plumbing),
            "cleanliness" => Some(IssueCategory::Cleanliness),
            "safety" => Some(IssueCategory::Safety),
            "other" => Some(IssueCategory::Other),
            _ => None,
        }
    }
}

/// Issue record in the database. Never deleted; duplicates are folded into
/// a canonical issue via `merged_into`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Issue {
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

#[derive(Debug)]
pub struct NewIssue<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub category: IssueCategory,
    pub hostel_name: Option<&'a str>,
    pub reporter_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_wire_roundtrip() {
        for s in [
            IssueStatus::Open,
            IssueStatus::InProgress,
            IssueStatus::Resolved,
            IssueStatus::Merged,
        ] {
            assert_eq!(IssueStatus::parse(s.as_wire()), Some(s));
        }
        assert_eq!(IssueStatus::parse("In-Progress"), Some(IssueStatus::InProgress));
        assert_eq!(IssueStatus::parse("closed"), None);
    }

    #[test]
    fn only_single_forward_steps_are_valid() {
        use IssueStatus::*;
        assert!(Open.can_advance_to(InProgress));
        assert!(InProgress.can_advance_to(Resolved));

        // backward
        assert!(!InProgress.can_advance_to(Open));
        assert!(!Resolved.can_advance_to(Open));
        assert!(!Resolved.can_advance_to(InProgress));
        // skipped
        assert!(!Open.can_advance_to(Resolved));
        // merged only via the merge operation
        assert!(!Open.can_advance_to(Merged));
        assert!(!InProgress.can_advance_to(Merged));
        // no self-transitions
        assert!(!Open.can_advance_to(Open));
        // out of terminal states
        assert!(!Merged.can_advance_to(Resolved));
    }

    #[test]
    fn terminal_states() {
        assert!(!IssueStatus::Open.is_terminal());
        assert!(!IssueStatus::InProgress.is_terminal());
        assert!(IssueStatus::Resolved.is_terminal());
        assert!(IssueStatus::Merged.is_terminal());
    }

    #[test]
    fn category_parse_accepts_any_case() {
        assert_eq!(IssueCategory::parse("Maintenance"), Some(IssueCategory::Maintenance));
        assert_eq!(IssueCategory::parse("PLUMBING"), Some(IssueCategory::Plumbing));
        assert_eq!(IssueCategory::parse("other"), Some(IssueCategory::Other));
        assert_eq!(IssueCategory::parse("laundry"), None);
    }

    #[test]
    fn status_serializes_kebab_case() {
        let json = serde_json::to_string(&IssueStatus::InProgress).unwrap();
        assert_eq!(json, "\"in-progress\"");
    }
}
