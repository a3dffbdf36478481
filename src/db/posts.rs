use rusqlite::{params, Connection, OptionalExtension};

use crate::auth::policy::{authorize, Action, Actor, Denied};
use crate::db::models::{NewPost, Post};
use crate::db::{is_unique_violation, now_timestamp, StoreError, StoreResult};

/// All posts with author name and comment count, newest first.
pub fn list_posts(conn: &Connection) -> StoreResult<Vec<Post>> {
    let mut stmt = conn.prepare(
        "SELECT p.id, p.title, p.author_id, u.name, p.text, COUNT(c.id), p.max_comments, \
                p.publication_timestamp \
         FROM posts p \
         JOIN users u ON u.id = p.author_id \
         LEFT JOIN comments c ON c.post_id = p.id \
         GROUP BY p.id \
         ORDER BY p.publication_timestamp DESC, p.id DESC",
    )?;

    let posts = stmt
        .query_map([], |row| {
            Ok(Post {
                id: row.get(0)?,
                title: row.get(1)?,
                author_id: row.get(2)?,
                author: row.get(3)?,
                text: row.get(4)?,
                comment_count: row.get(5)?,
                max_comments: row.get(6)?,
                timestamp: row.get(7)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(posts)
}

pub fn create_post(conn: &Connection, actor: Actor, post: &NewPost) -> StoreResult<i64> {
    authorize(actor, Action::CreatePost, None)?;
    let author_id = actor.user_id().ok_or(Denied::Unauthenticated)?;

    let result = conn.execute(
        "INSERT INTO posts (title, author_id, text, max_comments, publication_timestamp) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            post.title,
            author_id,
            post.text,
            post.max_comments,
            now_timestamp()
        ],
    );

    match result {
        Ok(_) => Ok(conn.last_insert_rowid()),
        Err(e) if is_unique_violation(&e) => Err(StoreError::Conflict(
            "A post with this title already exists".into(),
        )),
        Err(e) => Err(e.into()),
    }
}

/// Delete a post and, by cascade, its comments and their flags.
pub fn delete_post(conn: &mut Connection, actor: Actor, id: i64) -> StoreResult<()> {
    let tx = conn.transaction()?;

    let owner: i64 = tx
        .query_row(
            "SELECT author_id FROM posts WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )
        .optional()?
        .ok_or(StoreError::NotFound)?;

    authorize(actor, Action::Modify, Some(owner))?;

    tx.execute("DELETE FROM posts WHERE id = ?1", params![id])?;
    tx.commit()?;
    Ok(())
}
