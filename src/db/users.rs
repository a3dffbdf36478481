use rusqlite::{params, Connection, OptionalExtension};

use crate::db::models::User;

fn map_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        name: row.get(2)?,
        password_hash: row.get(3)?,
        totp_secret: row.get(4)?,
    })
}

/// Insert a user. Users are never updated afterwards.
pub fn create_user(
    conn: &Connection,
    username: &str,
    name: &str,
    password_hash: &str,
    totp_secret: Option<&str>,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO users (username, name, password_hash, totp_secret) VALUES (?1, ?2, ?3, ?4)",
        params![username, name, password_hash, totp_secret],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn find_by_username(conn: &Connection, username: &str) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        "SELECT id, username, name, password_hash, totp_secret FROM users WHERE username = ?1",
        params![username],
        map_user,
    )
    .optional()
}
