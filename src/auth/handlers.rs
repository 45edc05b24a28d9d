use axum::{
    extract::{FromRef, State},
    routing::{get, post},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, PublicUser, RefreshRequest, RegisterRequest},
        extractors::AuthUser,
        jwt::JwtKeys,
        password::{hash_password, verify_password},
        repo_types::{ApprovalStatus, NewUser, Role, User},
    },
    error::{ApiError, ApiResult},
    response::ApiResponse,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn trimmed(field: Option<&String>) -> Option<&str> {
    field.map(|s| s.trim()).filter(|s| !s.is_empty())
}

fn issue_token_pair(keys: &JwtKeys, user: &User) -> ApiResult<(String, String)> {
    let access = keys.sign_access(user.id).map_err(ApiError::Internal)?;
    let refresh = keys.sign_refresh(user.id).map_err(ApiError::Internal)?;
    Ok((access, refresh))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> ApiResult<Json<ApiResponse<AuthResponse>>> {
    let email = trimmed(payload.email.as_ref())
        .map(|e| e.to_lowercase())
        .ok_or_else(|| ApiError::Validation("email is required".into()))?;
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(ApiError::Validation("invalid email".into()));
    }

    let password = payload
        .password
        .as_deref()
        .ok_or_else(|| ApiError::Validation("password is required".into()))?;
    if password.len() < 8 {
        return Err(ApiError::Validation("password too short".into()));
    }

    let full_name = trimmed(payload.full_name.as_ref())
        .ok_or_else(|| ApiError::Validation("full_name is required".into()))?;

    let role = payload
        .role
        .as_deref()
        .and_then(Role::parse)
        .ok_or_else(|| ApiError::Validation("role must be student, caretaker or admin".into()))?;

    if User::find_by_email(&state.db, &email)
        .await
        .map_err(ApiError::Internal)?
        .is_some()
    {
        warn!(email = %email, "email already registered");
        return Err(ApiError::Conflict("email already registered".into()));
    }

    let hash = hash_password(password).map_err(ApiError::Internal)?;

    // Admins skip the approval queue; everyone else waits for review.
    let approval_status = if role == Role::Admin {
        ApprovalStatus::Approved
    } else {
        ApprovalStatus::Pending
    };

    let user = User::create(
        &state.db,
        NewUser {
            email: &email,
            password_hash: &hash,
            full_name,
            role,
            approval_status,
            hostel_name: trimmed(payload.hostel_name.as_ref()),
            room_number: trimmed(payload.room_number.as_ref()),
            phone_number: trimmed(payload.phone_number.as_ref()),
            department: trimmed(payload.department.as_ref()),
        },
    )
    .await
    .map_err(ApiError::Internal)?;

    let keys = JwtKeys::from_ref(&state);
    let (access_token, refresh_token) = issue_token_pair(&keys, &user)?;

    info!(user_id = %user.id, role = ?user.role, "user registered");
    Ok(Json(ApiResponse::ok(
        "registered",
        AuthResponse {
            access_token,
            refresh_token,
            user: PublicUser::from(user),
        },
    )))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> ApiResult<Json<ApiResponse<AuthResponse>>> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        return Err(ApiError::Validation("invalid email".into()));
    }

    let user = User::find_by_email(&state.db, &payload.email)
        .await
        .map_err(ApiError::Internal)?
        .ok_or_else(|| {
            warn!(email = %payload.email, "login unknown email");
            ApiError::Authentication("invalid credentials".into())
        })?;

    let ok = verify_password(&payload.password, &user.password_hash)
        .map_err(ApiError::Internal)?;
    if !ok {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::Authentication("invalid credentials".into()));
    }

    let keys = JwtKeys::from_ref(&state);
    let (access_token, refresh_token) = issue_token_pair(&keys, &user)?;

    info!(user_id = %user.id, "user logged in");
    Ok(Json(ApiResponse::ok(
        "logged in",
        AuthResponse {
            access_token,
            refresh_token,
            user: PublicUser::from(user),
        },
    )))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> ApiResult<Json<ApiResponse<AuthResponse>>> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| ApiError::Authentication(e.to_string()))?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await
        .map_err(ApiError::Internal)?
        .ok_or_else(|| ApiError::Authentication("unknown user".into()))?;

    let (access_token, refresh_token) = issue_token_pair(&keys, &user)?;

    Ok(Json(ApiResponse::ok(
        "refreshed",
        AuthResponse {
            access_token,
            refresh_token,
            user: PublicUser::from(user),
        },
    )))
}

/// Profile endpoint. Deliberately skips the approval gate so pending and
/// rejected accounts can still see their own status.
#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<ApiResponse<PublicUser>>> {
    let user = User::find_by_id(&state.db, user_id)
        .await
        .map_err(ApiError::Internal)?
        .ok_or_else(|| ApiError::Authentication("unknown user".into()))?;

    Ok(Json(ApiResponse::ok("profile", PublicUser::from(user))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation() {
        assert!(is_valid_email("student@hostel.edu"));
        assert!(is_valid_email("a.b+c@dorm.example.org"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("spaces in@mail.com"));
    }

    #[test]
    fn trimmed_treats_blank_as_missing() {
        let blank = Some("   ".to_string());
        assert_eq!(trimmed(blank.as_ref()), None);
        let value = Some(" Room 12 ".to_string());
        assert_eq!(trimmed(value.as_ref()), Some("Room 12"));
        assert_eq!(trimmed(None), None);
    }
}
