use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub name: String,
    pub password_hash: String,
    pub totp_secret: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    #[serde(rename = "authorId")]
    pub author_id: i64,
    pub author: String,
    pub text: String,
    pub comment_count: i64,
    pub max_comments: Option<i64>,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    #[serde(rename = "postId")]
    pub post_id: i64,
    #[serde(rename = "authorId")]
    pub author_id: Option<i64>,
    /// Author display name, or "Anonymous" for ownerless comments.
    pub author: String,
    pub text: String,
    /// Hidden (null) in the anonymous listing.
    pub num_interesting: Option<i64>,
    /// Whether the viewer flagged this comment; null when there is no viewer.
    #[serde(rename = "isInteresting")]
    pub is_interesting: Option<bool>,
    pub timestamp: String,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub text: String,
    pub max_comments: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub post_id: i64,
    pub text: String,
}

/// State of a comment's interesting flag after a flag or unflag request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagState {
    pub id: i64,
    pub interesting: bool,
    pub num_interesting: i64,
    /// False when the request was a no-op.
    pub changed: bool,
}
