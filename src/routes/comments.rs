use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::db::comments;
use crate::db::models::{Comment, FlagState, NewComment};
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, MaybeUser, ResourceId, ValidatedJson};
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommentRequest {
    #[serde(rename = "postId")]
    #[validate(range(min = 1, message = "ID must be an integer bigger than 0"))]
    pub post_id: i64,
    #[validate(length(min = 1, message = "Text cannot be empty"))]
    pub text: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct EditCommentRequest {
    /// Optional echo of the path id; must match when present.
    pub id: Option<i64>,
    #[validate(length(min = 1, message = "Text cannot be empty"))]
    pub text: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/comments", get(list_comments))
        .route("/comments/anon", get(list_anonymous_comments))
        .route("/comments/add", post(create_comment))
        .route("/comments/{id}/edit", put(edit_comment))
        .route("/comments/{id}/delete", delete(delete_comment))
        .route("/comments/{id}/interesting", post(mark_interesting))
        .route("/comments/{id}/notInteresting", post(unmark_interesting))
}

async fn list_comments(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<Vec<Comment>>> {
    let conn = state.db.get()?;
    Ok(Json(comments::list_comments(&conn, user.actor())?))
}

async fn list_anonymous_comments(State(state): State<AppState>) -> AppResult<Json<Vec<Comment>>> {
    let conn = state.db.get()?;
    Ok(Json(comments::list_anonymous_comments(&conn)?))
}

async fn create_comment(
    State(state): State<AppState>,
    user: MaybeUser,
    ValidatedJson(req): ValidatedJson<CreateCommentRequest>,
) -> AppResult<impl IntoResponse> {
    let new_comment = NewComment {
        post_id: req.post_id,
        text: req.text,
    };

    let mut conn = state.db.get()?;
    let id = comments::create_comment(&mut conn, user.actor(), &new_comment)?;
    tracing::info!("Comment {} added to post {} by {:?}", id, req.post_id, user.actor());

    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

async fn edit_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    ResourceId(id): ResourceId,
    ValidatedJson(req): ValidatedJson<EditCommentRequest>,
) -> AppResult<impl IntoResponse> {
    if req.id.is_some_and(|body_id| body_id != id) {
        return Err(AppError::Unprocessable("URL and body id mismatch".into()));
    }

    let mut conn = state.db.get()?;
    comments::edit_comment(&mut conn, user.actor(), id, &req.text)?;
    tracing::info!("Comment {} edited by {:?}", id, user.actor());

    Ok(Json(json!({ "id": id })))
}

async fn delete_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    ResourceId(id): ResourceId,
) -> AppResult<impl IntoResponse> {
    let mut conn = state.db.get()?;
    comments::delete_comment(&mut conn, user.actor(), id)?;
    tracing::info!("Comment {} deleted by {:?}", id, user.actor());

    Ok(Json(json!({ "id": id })))
}

async fn mark_interesting(
    State(state): State<AppState>,
    user: CurrentUser,
    ResourceId(id): ResourceId,
) -> AppResult<(StatusCode, Json<FlagState>)> {
    let mut conn = state.db.get()?;
    let flag = comments::mark_interesting(&mut conn, user.actor(), id)?;
    Ok((StatusCode::CREATED, Json(flag)))
}

async fn unmark_interesting(
    State(state): State<AppState>,
    user: CurrentUser,
    ResourceId(id): ResourceId,
) -> AppResult<(StatusCode, Json<FlagState>)> {
    let mut conn = state.db.get()?;
    let flag = comments::unmark_interesting(&mut conn, user.actor(), id)?;
    Ok((StatusCode::CREATED, Json(flag)))
}
