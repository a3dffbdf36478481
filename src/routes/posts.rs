use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::db::models::{NewPost, Post};
use crate::db::posts;
use crate::error::AppResult;
use crate::extractors::{
    not_blank, optional_int_from_str, CurrentUser, ResourceId, ValidatedJson,
};
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePostRequest {
    #[validate(custom(function = not_blank, message = "Title should not be empty"))]
    pub title: String,
    #[validate(length(min = 1, message = "Text cannot be empty"))]
    pub text: String,
    #[serde(default, deserialize_with = "optional_int_from_str")]
    #[validate(range(min = 0, message = "Max Comments must be a non-negative integer"))]
    pub max_comments: Option<i64>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/posts", get(list_posts))
        .route("/posts/add", post(create_post))
        .route("/posts/{id}/delete", delete(delete_post))
}

async fn list_posts(State(state): State<AppState>) -> AppResult<Json<Vec<Post>>> {
    let conn = state.db.get()?;
    Ok(Json(posts::list_posts(&conn)?))
}

async fn create_post(
    State(state): State<AppState>,
    user: CurrentUser,
    ValidatedJson(req): ValidatedJson<CreatePostRequest>,
) -> AppResult<impl IntoResponse> {
    let new_post = NewPost {
        title: req.title.trim().to_string(),
        text: req.text,
        max_comments: req.max_comments,
    };

    let conn = state.db.get()?;
    let id = posts::create_post(&conn, user.actor(), &new_post)?;
    tracing::info!("Post {} created by user {}", id, user.session.user_id);

    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

async fn delete_post(
    State(state): State<AppState>,
    user: CurrentUser,
    ResourceId(id): ResourceId,
) -> AppResult<impl IntoResponse> {
    let mut conn = state.db.get()?;
    posts::delete_post(&mut conn, user.actor(), id)?;
    tracing::info!("Post {} deleted by user {} ({:?})", id, user.session.user_id, user.actor());

    Ok(Json(json!({ "id": id })))
}
