use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

use crate::auth::session::{self, SessionUser};
use crate::auth::{password, totp::Totp};
use crate::config::AuthConfig;
use crate::db::users;
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, MaybeUser, ValidatedJson};
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Username cannot be empty"))]
    pub username: String,
    #[validate(length(min = 1, message = "Password cannot be empty"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct TotpRequest {
    #[validate(length(min = 6, max = 6, message = "Code must have 6 digits"))]
    pub code: String,
}

/// What the client is told about the logged-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub name: String,
    #[serde(rename = "canDoTotp")]
    pub can_do_totp: bool,
    #[serde(rename = "isTotp")]
    pub is_totp: bool,
}

impl From<&SessionUser> for UserProfile {
    fn from(session: &SessionUser) -> Self {
        Self {
            id: session.user_id,
            username: session.username.clone(),
            name: session.name.clone(),
            can_do_totp: session.totp_secret.is_some(),
            is_totp: session.totp_verified,
        }
    }
}

// -- Cookie helpers --

fn session_cookie(auth: &AuthConfig, token: &str) -> String {
    let max_age_secs = auth.session_hours * 3600;
    format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}",
        auth.cookie_name, token, max_age_secs
    )
}

fn clear_session_cookie(auth: &AuthConfig) -> String {
    format!(
        "{}=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0",
        auth.cookie_name
    )
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/sessions", post(login))
        .route("/sessions/current", get(current).delete(logout))
        .route("/login-totp", post(login_totp))
}

/// POST /sessions: password login, starts a non-admin session
async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> AppResult<Response> {
    let conn = state.db.get()?;

    let user = match users::find_by_username(&conn, &req.username)? {
        Some(user) if password::verify(&req.password, &user.password_hash) => Some(user),
        Some(_) => None,
        None => {
            password::verify_missing_user(&req.password);
            None
        }
    };

    let Some(user) = user else {
        tracing::warn!("Failed login for {}", req.username);
        return Err(AppError::Unauthorized(
            "Incorrect username or password.".into(),
        ));
    };

    let token = session::create_session(&conn, user.id, state.config.auth.session_hours)?;
    tracing::info!("User {} logged in", user.username);

    let profile = UserProfile {
        id: user.id,
        username: user.username,
        name: user.name,
        can_do_totp: user.totp_secret.is_some(),
        is_totp: false,
    };

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, session_cookie(&state.config.auth, &token))],
        Json(profile),
    )
        .into_response())
}

/// POST /login-totp: confirm the second factor and switch to admin mode
async fn login_totp(
    State(state): State<AppState>,
    user: CurrentUser,
    ValidatedJson(req): ValidatedJson<TotpRequest>,
) -> AppResult<Response> {
    let verified = user.session.totp_secret.as_deref().is_some_and(|secret| {
        Totp::new(secret, &state.config.auth.totp_issuer, &user.session.username)
            .is_valid(&req.code)
    });

    if !verified {
        tracing::warn!("Rejected TOTP code for {}", user.session.username);
        return Err(AppError::Unauthorized("Invalid TOTP code".into()));
    }

    let conn = state.db.get()?;
    session::confirm_totp(&conn, &user.token)?;
    tracing::info!("User {} entered admin mode", user.session.username);

    Ok(Json(json!({ "otp": "authorized" })).into_response())
}

/// DELETE /sessions/current: end the session if there is one
async fn logout(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
) -> AppResult<Response> {
    if let Some(user) = user {
        let conn = state.db.get()?;
        session::delete_session(&conn, &user.token)?;
        tracing::info!("User {} logged out", user.session.username);
    }

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, clear_session_cookie(&state.config.auth))],
        Json(json!({})),
    )
        .into_response())
}

/// GET /sessions/current: the logged-in user's profile
async fn current(MaybeUser(user): MaybeUser) -> AppResult<Json<UserProfile>> {
    let user = user.ok_or_else(|| AppError::Unauthorized("Unauthenticated user!".into()))?;
    Ok(Json(UserProfile::from(&user.session)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookies_use_configured_name_and_lifetime() {
        let auth = AuthConfig {
            cookie_name: "sid".into(),
            session_hours: 2,
            totp_issuer: "Forum".into(),
        };
        let cookie = session_cookie(&auth, "tok");
        assert!(cookie.starts_with("sid=tok;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Max-Age=7200"));
        assert!(clear_session_cookie(&auth).starts_with("sid=;"));
    }

    #[test]
    fn profile_reflects_second_factor_state() {
        let session = SessionUser {
            user_id: 3,
            username: "carol".into(),
            name: "Carol".into(),
            totp_secret: Some("SECRET".into()),
            totp_verified: true,
        };
        let profile = UserProfile::from(&session);
        assert!(profile.can_do_totp);
        assert!(profile.is_totp);

        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["canDoTotp"], true);
        assert_eq!(json["isTotp"], true);
    }
}
