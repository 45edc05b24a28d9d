use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;
use uuid::Uuid;

use crate::auth::claims::TokenKind;
use crate::auth::jwt::JwtKeys;
use crate::auth::repo_types::{ApprovalStatus, Role, User};
use crate::error::ApiError;
use crate::state::AppState;

/// Extracts and validates the bearer JWT, returning the user ID. Does not
/// touch the database; use `Identity` where the approval gate applies.
pub struct AuthUser(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        let auth_header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Authentication("missing Authorization header".into()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .or_else(|| auth_header.strip_prefix("bearer "))
            .ok_or_else(|| ApiError::Authentication("invalid Authorization header".into()))?;

        let claims = match keys.verify(token) {
            Ok(c) => c,
            Err(_) => {
                warn!("invalid or expired token");
                return Err(ApiError::Authentication("invalid or expired token".into()));
            }
        };

        if claims.kind != TokenKind::Access {
            return Err(ApiError::Authentication("access token required".into()));
        }

        Ok(AuthUser(claims.sub))
    }
}

/// Resolved caller identity: user ID, role, and approval status, with the
/// approval gate already enforced.
#[derive(Debug, Clone)]
pub struct Identity {
    pub id: Uuid,
    pub role: Role,
    pub approval_status: ApprovalStatus,
    pub hostel_name: Option<String>,
}

/// The approval gate: pending non-admin accounts and rejected accounts may
/// not execute workflow operations.
pub(crate) fn check_approval_gate(user: &User) -> Result<(), ApiError> {
    match user.approval_status {
        ApprovalStatus::Approved => Ok(()),
        ApprovalStatus::Pending if user.role == Role::Admin => Ok(()),
        ApprovalStatus::Pending => Err(ApiError::ApprovalPending),
        ApprovalStatus::Rejected => Err(ApiError::RegistrationRejected(
            user.rejection_reason
                .clone()
                .unwrap_or_else(|| "no reason recorded".into()),
        )),
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Identity {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(user_id) = AuthUser::from_request_parts(parts, state).await?;

        let user = User::find_by_id(&state.db, user_id)
            .await
            .map_err(ApiError::Internal)?
            .ok_or_else(|| ApiError::Authentication("unknown user".into()))?;

        check_approval_gate(&user)?;

        Ok(Identity {
            id: user.id,
            role: user.role,
            approval_status: user.approval_status,
            hostel_name: user.hostel_name,
        })
    }
}

/// Identity restricted to staff (caretaker or admin).
pub struct Staff(pub Identity);

#[async_trait]
impl FromRequestParts<AppState> for Staff {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let identity = Identity::from_request_parts(parts, state).await?;
        if !identity.role.is_staff() {
            return Err(ApiError::Authorization("staff role required".into()));
        }
        Ok(Staff(identity))
    }
}

/// Identity restricted to admins.
pub struct Admin(pub Identity);

#[async_trait]
impl FromRequestParts<AppState> for Admin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let identity = Identity::from_request_parts(parts, state).await?;
        if identity.role != Role::Admin {
            return Err(ApiError::Authorization("admin role required".into()));
        }
        Ok(Admin(identity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn user(role: Role, approval: ApprovalStatus, reason: Option<&str>) -> User {
        User {
            id: Uuid::new_v4(),
            email: "x@example.com".into(),
            password_hash: String::new(),
            full_name: "X".into(),
            role,
            approval_status: approval,
            rejection_reason: reason.map(|s| s.to_string()),
            hostel_name: None,
            room_number: None,
            phone_number: None,
            department: None,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn approved_users_pass_the_gate() {
        assert!(check_approval_gate(&user(Role::Student, ApprovalStatus::Approved, None)).is_ok());
        assert!(
            check_approval_gate(&user(Role::Caretaker, ApprovalStatus::Approved, None)).is_ok()
        );
    }

    #[test]
    fn pending_admin_bypasses_the_gate() {
        assert!(check_approval_gate(&user(Role::Admin, ApprovalStatus::Pending, None)).is_ok());
    }

    #[test]
    fn pending_non_admin_is_blocked() {
        let err =
            check_approval_gate(&user(Role::Student, ApprovalStatus::Pending, None)).unwrap_err();
        assert!(matches!(err, ApiError::ApprovalPending));
    }

    #[test]
    fn rejected_user_sees_the_stored_reason() {
        let err = check_approval_gate(&user(
            Role::Caretaker,
            ApprovalStatus::Rejected,
            Some("duplicate staff id"),
        ))
        .unwrap_err();
        match err {
            ApiError::RegistrationRejected(reason) => {
                assert_eq!(reason, "duplicate staff id")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
