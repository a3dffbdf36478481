use rand::Rng;
use rusqlite::{params, Connection, OptionalExtension};

use crate::auth::policy::Actor;

/// A live session joined with the user it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub user_id: i64,
    pub username: String,
    pub name: String,
    pub totp_secret: Option<String>,
    pub totp_verified: bool,
}

impl SessionUser {
    pub fn actor(&self) -> Actor {
        if self.totp_verified {
            Actor::Admin(self.user_id)
        } else {
            Actor::User(self.user_id)
        }
    }
}

/// Create a new session for a user. Returns the session token.
pub fn create_session(conn: &Connection, user_id: i64, hours: u64) -> Result<String, rusqlite::Error> {
    let token = generate_token();
    let id = uuid::Uuid::now_v7().to_string();

    conn.execute(
        "INSERT INTO sessions (id, user_id, token, expires_at) VALUES (?1, ?2, ?3, datetime('now', ?4))",
        params![id, user_id, token, format!("+{} hours", hours)],
    )?;

    Ok(token)
}

/// Resolve an unexpired session token.
pub fn find_session(conn: &Connection, token: &str) -> Result<Option<SessionUser>, rusqlite::Error> {
    conn.query_row(
        "SELECT u.id, u.username, u.name, u.totp_secret, s.totp_verified FROM sessions s \
         JOIN users u ON u.id = s.user_id \
         WHERE s.token = ?1 AND s.expires_at > datetime('now')",
        params![token],
        |row| {
            Ok(SessionUser {
                user_id: row.get(0)?,
                username: row.get(1)?,
                name: row.get(2)?,
                totp_secret: row.get(3)?,
                totp_verified: row.get(4)?,
            })
        },
    )
    .optional()
}

/// Mark a session as having passed the second factor.
pub fn confirm_totp(conn: &Connection, token: &str) -> Result<bool, rusqlite::Error> {
    let changed = conn.execute(
        "UPDATE sessions SET totp_verified = 1 WHERE token = ?1",
        params![token],
    )?;
    Ok(changed > 0)
}

/// Delete a session by token.
pub fn delete_session(conn: &Connection, token: &str) -> Result<(), rusqlite::Error> {
    conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
    Ok(())
}

/// Drop sessions past their expiry. Returns how many were removed.
pub fn purge_expired(conn: &Connection) -> Result<usize, rusqlite::Error> {
    conn.execute(
        "DELETE FROM sessions WHERE expires_at <= datetime('now')",
        [],
    )
}

/// Generate a cryptographically random 32-byte hex token.
fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
