use axum::extract::{FromRequest, FromRequestParts, Path, Request};
use axum::http::header;
use axum::http::request::Parts;
use axum::Json;
use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer};
use validator::{Validate, ValidationError};

use crate::auth::policy::Actor;
use crate::auth::session::{self, SessionUser};
use crate::error::AppError;
use crate::state::AppState;

/// The logged-in user behind the request's session cookie.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub session: SessionUser,
    pub token: String,
}

impl CurrentUser {
    pub fn actor(&self) -> Actor {
        self.session.actor()
    }
}

/// Extractor that requires authentication.
/// Returns 401 if no valid session found.
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let MaybeUser(user) = MaybeUser::from_request_parts(parts, state).await?;
        user.ok_or_else(AppError::unauthenticated)
    }
}

/// Optional user extractor: `None` instead of 401 when not authenticated.
pub struct MaybeUser(pub Option<CurrentUser>);

impl MaybeUser {
    pub fn actor(&self) -> Actor {
        self.0.as_ref().map(CurrentUser::actor).unwrap_or(Actor::Anonymous)
    }
}

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = session_token(parts, &state.config.auth.cookie_name) else {
            return Ok(MaybeUser(None));
        };

        let conn = state.db.get()?;
        let user = session::find_session(&conn, token)?.map(|session| CurrentUser {
            session,
            token: token.to_string(),
        });
        Ok(MaybeUser(user))
    }
}

/// Numeric resource id from the `{id}` path segment; must be >= 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceId(pub i64);

impl<S: Send + Sync> FromRequestParts<S> for ResourceId {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|e| AppError::Unprocessable(e.body_text()))?;
        parse_id(&raw).map(ResourceId)
    }
}

fn parse_id(raw: &str) -> Result<i64, AppError> {
    raw.parse::<i64>()
        .ok()
        .filter(|id| *id >= 1)
        .ok_or_else(|| AppError::Unprocessable("ID must be an integer bigger than 0".into()))
}

/// JSON body that must also pass its `validator` rules.
#[derive(Debug)]
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(payload) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| AppError::Unprocessable(e.body_text()))?;
        payload.validate()?;
        Ok(Self(payload))
    }
}

/// `validator` rule: rejects empty and whitespace-only strings.
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IntOrString {
    Int(i64),
    Str(String),
}

/// Optional integer that may also arrive as a numeric string, as form-backed
/// clients send it. Use with `#[serde(default, deserialize_with = ...)]`.
pub fn optional_int_from_str<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<IntOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(IntOrString::Int(n)) => Ok(Some(n)),
        Some(IntOrString::Str(s)) => s
            .parse()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("expected an integer, found \"{}\"", s))),
    }
}

pub fn session_token<'a>(parts: &'a Parts, cookie_name: &str) -> Option<&'a str> {
    parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|s| s.split(';'))
        .map(|s| s.trim())
        .find_map(|cookie| {
            let mut split = cookie.splitn(2, '=');
            let key = split.next()?.trim();
            let val = split.next()?.trim();
            if key == cookie_name && !val.is_empty() {
                Some(val)
            } else {
                None
            }
        })
}
