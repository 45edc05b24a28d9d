use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::repo_types::{ApprovalStatus, Role, User};

/// Request body for user registration. Role and profile fields arrive as
/// free text and are validated by the handler.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub full_name: Option<String>,
    pub role: Option<String>,
    pub hostel_name: Option<String>,
    pub room_number: Option<String>,
    pub phone_number: Option<String>,
    pub department: Option<String>,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request body for token refresh.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Response returned after login, register or refresh.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: PublicUser,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub approval_status: ApprovalStatus,
    pub hostel_name: Option<String>,
    pub room_number: Option<String>,
    pub phone_number: Option<String>,
    pub department: Option<String>,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            full_name: u.full_name,
            role: u.role,
            approval_status: u.approval_status,
            hostel_name: u.hostel_name,
            room_number: u.room_number,
            phone_number: u.phone_number,
            department: u.department,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_user_serializes_role_and_status_lowercase() {
        let user = PublicUser {
            id: Uuid::new_v4(),
            email: "s@hostel.edu".into(),
            full_name: "Sam Resident".into(),
            role: Role::Student,
            approval_status: ApprovalStatus::Pending,
            hostel_name: Some("North Block".into()),
            room_number: None,
            phone_number: None,
            department: None,
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(json.contains("\"role\":\"student\""));
        assert!(json.contains("\"approval_status\":\"pending\""));
        assert!(json.contains("s@hostel.edu"));
    }
}
