use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Account role. Fixed at registration; there is no role-change operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
pub enum Role {
    Student,
    Caretaker,
    Admin,
}

impl Role {
    /// Caretakers and admins share the staff-only surface.
    pub fn is_staff(self) -> bool {
        matches!(self, Role::Caretaker | Role::Admin)
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "student" => Some(Role::Student),
            "caretaker" => Some(Role::Caretaker),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "approval_status", rename_all = "lowercase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub full_name: String,
    pub role: Role,
    pub approval_status: ApprovalStatus,
    pub rejection_reason: Option<String>,
    pub hostel_name: Option<String>,
    pub room_number: Option<String>,
    pub phone_number: Option<String>,
    pub department: Option<String>,
    pub created_at: OffsetDateTime,
}

/// Fields required to insert a user row.
#[derive(Debug)]
pub struct NewUser<'a> {
    pub email: &'a str,
    pub password_hash: &'a str,
    pub full_name: &'a str,
    pub role: Role,
    pub approval_status: ApprovalStatus,
    pub hostel_name: Option<&'a str>,
    pub room_number: Option<&'a str>,
    pub phone_number: Option<&'a str>,
    pub department: Option<&'a str>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staff_covers_caretaker_and_admin() {
        assert!(!Role::Student.is_staff());
        assert!(Role::Caretaker.is_staff());
        assert!(Role::Admin.is_staff());
    }

    #[test]
    fn role_parse_is_case_insensitive() {
        assert_eq!(Role::parse("Student"), Some(Role::Student));
        assert_eq!(Role::parse(" ADMIN "), Some(Role::Admin));
        assert_eq!(Role::parse("caretaker"), Some(Role::Caretaker));
        assert_eq!(Role::parse("warden"), None);
    }
}
