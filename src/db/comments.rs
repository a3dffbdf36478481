use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use crate::auth::policy::{authorize, Action, Actor, Denied};
use crate::db::models::{Comment, FlagState, NewComment};
use crate::db::{now_timestamp, StoreError, StoreResult};

const ANONYMOUS_AUTHOR: &str = "Anonymous";

/// Every comment, newest first, with `isInteresting` resolved for the viewer.
pub fn list_comments(conn: &Connection, actor: Actor) -> StoreResult<Vec<Comment>> {
    authorize(actor, Action::ReadAllComments, None)?;
    let viewer = actor.user_id().ok_or(Denied::Unauthenticated)?;

    let mut stmt = conn.prepare(
        "SELECT c.id, c.post_id, c.author_id, u.name, c.text, c.interesting_count, \
                f.user_id IS NOT NULL, c.publication_timestamp \
         FROM comments c \
         LEFT JOIN users u ON u.id = c.author_id \
         LEFT JOIN interesting_flags f ON f.comment_id = c.id AND f.user_id = ?1 \
         ORDER BY c.publication_timestamp DESC, c.id DESC",
    )?;

    let comments = stmt
        .query_map(params![viewer], |row| {
            let author: Option<String> = row.get(3)?;
            Ok(Comment {
                id: row.get(0)?,
                post_id: row.get(1)?,
                author_id: row.get(2)?,
                author: author.unwrap_or_else(|| ANONYMOUS_AUTHOR.to_string()),
                text: row.get(4)?,
                num_interesting: Some(row.get(5)?),
                is_interesting: Some(row.get(6)?),
                timestamp: row.get(7)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(comments)
}

/// Ownerless comments only, without any interesting data.
pub fn list_anonymous_comments(conn: &Connection) -> StoreResult<Vec<Comment>> {
    authorize(Actor::Anonymous, Action::ReadAnonymousComments, None)?;

    let mut stmt = conn.prepare(
        "SELECT id, post_id, text, publication_timestamp FROM comments \
         WHERE author_id IS NULL \
         ORDER BY publication_timestamp DESC, id DESC",
    )?;

    let comments = stmt
        .query_map([], |row| {
            Ok(Comment {
                id: row.get(0)?,
                post_id: row.get(1)?,
                author_id: None,
                author: ANONYMOUS_AUTHOR.to_string(),
                text: row.get(2)?,
                num_interesting: None,
                is_interesting: None,
                timestamp: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(comments)
}

/// Add a comment, owned by the actor when logged in and ownerless otherwise.
///
/// The post's comment cap is checked in the same immediate transaction as the
/// insert, so sequential and concurrent submissions both stay within it.
pub fn create_comment(conn: &mut Connection, actor: Actor, comment: &NewComment) -> StoreResult<i64> {
    authorize(actor, Action::CreateComment, None)?;

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let max_comments: Option<i64> = tx
        .query_row(
            "SELECT max_comments FROM posts WHERE id = ?1",
            params![comment.post_id],
            |row| row.get(0),
        )
        .optional()?
        .ok_or(StoreError::NotFound)?;

    if let Some(max) = max_comments {
        let count: i64 = tx.query_row(
            "SELECT COUNT(*) FROM comments WHERE post_id = ?1",
            params![comment.post_id],
            |row| row.get(0),
        )?;
        if count >= max {
            return Err(StoreError::CommentLimitReached);
        }
    }

    tx.execute(
        "INSERT INTO comments (post_id, author_id, text, interesting_count, publication_timestamp) \
         VALUES (?1, ?2, ?3, 0, ?4)",
        params![comment.post_id, actor.user_id(), comment.text, now_timestamp()],
    )?;
    let id = tx.last_insert_rowid();
    tx.commit()?;
    Ok(id)
}

/// Owner of a comment, `None` when it is anonymous. Missing comments are
/// `StoreError::NotFound`.
fn comment_owner(conn: &Connection, id: i64) -> StoreResult<Option<i64>> {
    conn.query_row(
        "SELECT author_id FROM comments WHERE id = ?1",
        params![id],
        |row| row.get::<_, Option<i64>>(0),
    )
    .optional()?
    .ok_or(StoreError::NotFound)
}

pub fn edit_comment(conn: &mut Connection, actor: Actor, id: i64, text: &str) -> StoreResult<()> {
    let tx = conn.transaction()?;
    let owner = comment_owner(&tx, id)?;
    authorize(actor, Action::Modify, owner)?;

    tx.execute(
        "UPDATE comments SET text = ?1 WHERE id = ?2",
        params![text, id],
    )?;
    tx.commit()?;
    Ok(())
}

pub fn delete_comment(conn: &mut Connection, actor: Actor, id: i64) -> StoreResult<()> {
    let tx = conn.transaction()?;
    let owner = comment_owner(&tx, id)?;
    authorize(actor, Action::Modify, owner)?;

    tx.execute("DELETE FROM comments WHERE id = ?1", params![id])?;
    tx.commit()?;
    Ok(())
}

/// Flag a comment as interesting for the actor. Flagging twice is a no-op.
pub fn mark_interesting(conn: &mut Connection, actor: Actor, id: i64) -> StoreResult<FlagState> {
    set_interesting(conn, actor, id, true)
}

/// Remove the actor's flag. Unflagging an unflagged comment is a no-op.
pub fn unmark_interesting(conn: &mut Connection, actor: Actor, id: i64) -> StoreResult<FlagState> {
    set_interesting(conn, actor, id, false)
}

fn set_interesting(
    conn: &mut Connection,
    actor: Actor,
    id: i64,
    interesting: bool,
) -> StoreResult<FlagState> {
    authorize(actor, Action::Flag, None)?;
    let user_id = actor.user_id().ok_or(Denied::Unauthenticated)?;

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    comment_owner(&tx, id)?;

    // The flag row and the counter move together or not at all.
    let changed = if interesting {
        let inserted = tx.execute(
            "INSERT OR IGNORE INTO interesting_flags (user_id, comment_id) VALUES (?1, ?2)",
            params![user_id, id],
        )?;
        if inserted > 0 {
            tx.execute(
                "UPDATE comments SET interesting_count = interesting_count + 1 WHERE id = ?1",
                params![id],
            )?;
        }
        inserted > 0
    } else {
        let removed = tx.execute(
            "DELETE FROM interesting_flags WHERE user_id = ?1 AND comment_id = ?2",
            params![user_id, id],
        )?;
        if removed > 0 {
            tx.execute(
                "UPDATE comments SET interesting_count = max(interesting_count - 1, 0) WHERE id = ?1",
                params![id],
            )?;
        }
        removed > 0
    };

    let num_interesting: i64 = tx.query_row(
        "SELECT interesting_count FROM comments WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )?;
    tx.commit()?;

    if changed {
        tracing::debug!(
            "User {} set interesting={} on comment {} (now {})",
            user_id,
            interesting,
            id,
            num_interesting
        );
    }

    Ok(FlagState {
        id,
        interesting,
        num_interesting,
        changed,
    })
}
