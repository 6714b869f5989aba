//! Account registration and the access/refresh token lifecycle.
//!
//! Refresh tokens rotate on every use. Presenting one that was already
//! spent means it leaked, so every session of that account is ended.

use axum::extract::State;
use axum::http::header::USER_AGENT;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use gather_core::account::{
    validate_display_name, validate_email, validate_password, validate_username,
    LOGIN_LOCKOUT_MINS, MAX_FAILED_LOGINS,
};
use gather_core::error::CoreError;
use gather_core::roles::DEFAULT_MEMBER_ROLE_ID;
use gather_db::models::session::NewSession;
use gather_db::models::user::{NewUser, User, UserProfile};
use gather_db::repositories::{SessionRepo, UserRepo};
use serde::{Deserialize, Serialize};

use crate::auth::jwt::{issue_access_token, RefreshToken};
use crate::auth::password::{hash_password, verify_decoy, verify_password};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

const BAD_CREDENTIALS: &str = "Invalid username or password";
const BAD_REFRESH: &str = "Invalid or expired refresh token";

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    /// Defaults to the username.
    pub display_name: Option<String>,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// A username, or the account's email address.
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Seconds until `access_token` expires.
    pub expires_in: i64,
    pub user: UserProfile,
}

fn user_agent(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
}

fn unauthorized(msg: &str) -> AppError {
    AppError::Core(CoreError::Unauthorized(msg.to_owned()))
}

fn deactivated() -> AppError {
    AppError::Core(CoreError::Forbidden("Account is deactivated".into()))
}

/// POST /api/v1/auth/register
pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<RegisterRequest>,
) -> AppResult<impl IntoResponse> {
    let username = input.username.trim();
    let email = input.email.trim();
    let display_name = match input.display_name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => name,
        _ => username,
    };

    validate_username(username)?;
    validate_email(email)?;
    validate_display_name(display_name)?;
    validate_password(&input.password)?;

    if UserRepo::email_taken(&state.pool, email).await? {
        return Err(AppError::Core(CoreError::Conflict(
            "An account with this email already exists".into(),
        )));
    }

    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    // A username race still lands on uq_users_username and maps to 409.
    let user = UserRepo::create(
        &state.pool,
        &NewUser {
            username,
            email,
            display_name,
            password_hash: &password_hash,
            role_id: DEFAULT_MEMBER_ROLE_ID,
        },
    )
    .await?;

    tracing::info!(user_id = user.id, username = %user.username, "Account registered");

    let pair = start_session(&state, &user, user_agent(&headers)).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: pair })))
}

/// POST /api/v1/auth/login
///
/// Failures are counted per account. The attempt that reaches the limit
/// locks the account for a while; a locked account is refused with 403
/// even when the password is right.
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<LoginRequest>,
) -> AppResult<Json<DataResponse<TokenPair>>> {
    let Some(user) = UserRepo::find_by_login(&state.pool, input.username.trim()).await? else {
        verify_decoy(&input.password);
        return Err(unauthorized(BAD_CREDENTIALS));
    };

    if !user.is_active {
        return Err(deactivated());
    }
    if user.is_locked(Utc::now()) {
        return Err(AppError::Core(CoreError::Forbidden(
            "Account is temporarily locked. Try again later.".into(),
        )));
    }

    let matches = verify_password(&input.password, &user.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;

    if !matches {
        let locked =
            UserRepo::register_failed_login(&state.pool, user.id, MAX_FAILED_LOGINS, LOGIN_LOCKOUT_MINS)
                .await?;
        if let Some(until) = locked {
            tracing::warn!(user_id = user.id, %until, "Account locked after repeated failed logins");
        }
        return Err(unauthorized(BAD_CREDENTIALS));
    }

    UserRepo::record_login(&state.pool, user.id).await?;
    let pair = start_session(&state, &user, user_agent(&headers)).await?;
    Ok(Json(DataResponse { data: pair }))
}

/// POST /api/v1/auth/refresh
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<RefreshRequest>,
) -> AppResult<Json<DataResponse<TokenPair>>> {
    let presented = RefreshToken::hash_of(&input.refresh_token);
    let next = RefreshToken::generate();
    let expires_at = Utc::now() + state.config.jwt.refresh_ttl;

    let rotated = SessionRepo::rotate(
        &state.pool,
        &presented,
        &next.hash,
        expires_at,
        user_agent(&headers),
    )
    .await?;

    let Some(session) = rotated else {
        if let Some(owner) = SessionRepo::revoked_owner(&state.pool, &presented).await? {
            let ended = SessionRepo::end_all_for_user(&state.pool, owner).await?;
            tracing::warn!(user_id = owner, ended, "Spent refresh token replayed, sessions ended");
        }
        return Err(unauthorized(BAD_REFRESH));
    };

    let user = match UserRepo::find_by_id(&state.pool, session.user_id).await? {
        Some(user) if user.is_active => user,
        Some(user) => {
            SessionRepo::end_all_for_user(&state.pool, user.id).await?;
            return Err(deactivated());
        }
        None => return Err(unauthorized(BAD_REFRESH)),
    };

    let pair = token_pair(&state, &user, next.plaintext)?;
    Ok(Json(DataResponse { data: pair }))
}

/// POST /api/v1/auth/logout
///
/// Ends every session of the caller, not only the current one.
pub async fn logout(State(state): State<AppState>, auth: AuthUser) -> AppResult<StatusCode> {
    let ended = SessionRepo::end_all_for_user(&state.pool, auth.user_id).await?;
    tracing::info!(user_id = auth.user_id, ended, "User logged out");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/auth/me
pub async fn me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<DataResponse<UserProfile>>> {
    let user = UserRepo::find_by_id(&state.pool, auth.user_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "User",
            id: auth.user_id,
        }))?;
    Ok(Json(DataResponse { data: user.profile() }))
}

async fn start_session(state: &AppState, user: &User, agent: Option<&str>) -> AppResult<TokenPair> {
    let refresh = RefreshToken::generate();
    SessionRepo::open(
        &state.pool,
        &NewSession {
            user_id: user.id,
            token_hash: &refresh.hash,
            expires_at: Utc::now() + state.config.jwt.refresh_ttl,
            user_agent: agent,
        },
    )
    .await?;
    token_pair(state, user, refresh.plaintext)
}

fn token_pair(state: &AppState, user: &User, refresh_token: String) -> AppResult<TokenPair> {
    let access_token = issue_access_token(user.id, &user.role, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Token signing error: {e}")))?;
    Ok(TokenPair {
        access_token,
        refresh_token,
        expires_in: state.config.jwt.access_ttl.num_seconds(),
        user: user.profile(),
    })
}
