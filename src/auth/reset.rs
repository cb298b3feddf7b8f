use rusqlite::{params, Connection, OptionalExtension};

use crate::auth::session::generate_token;

/// Issue a single-use password reset token that expires after `minutes`.
pub fn issue_token(conn: &Connection, user_id: i64, minutes: u64) -> rusqlite::Result<String> {
    let token = generate_token();
    conn.execute(
        "INSERT INTO password_resets (token, user_id, expires_at) VALUES (?1, ?2, datetime('now', ?3))",
        params![token, user_id, format!("+{} minutes", minutes)],
    )?;
    Ok(token)
}

/// The user a reset token belongs to, if the token exists and has not expired.
pub fn verify_token(conn: &Connection, token: &str) -> rusqlite::Result<Option<i64>> {
    conn.query_row(
        "SELECT user_id FROM password_resets WHERE token = ?1 AND expires_at > datetime('now')",
        params![token],
        |row| row.get(0),
    )
    .optional()
}

/// Claim a token: delete it and return its user in one statement, so two
/// submissions racing on the same link cannot both succeed.
pub fn redeem(conn: &Connection, token: &str) -> rusqlite::Result<Option<i64>> {
    conn.query_row(
        "DELETE FROM password_resets WHERE token = ?1 AND expires_at > datetime('now') RETURNING user_id",
        params![token],
        |row| row.get(0),
    )
    .optional()
}

/// Drop every outstanding reset token for a user, expired ones included.
pub fn consume_tokens(conn: &Connection, user_id: i64) -> rusqlite::Result<()> {
    conn.execute(
        "DELETE FROM password_resets WHERE user_id = ?1 OR expires_at <= datetime('now')",
        params![user_id],
    )?;
    Ok(())
}
