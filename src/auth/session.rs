use rand::Rng;
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::models::User;
use crate::db::users;

/// Create a new session for a user. Returns the session token.
pub fn create_session(conn: &Connection, user_id: i64, hours: u64) -> rusqlite::Result<String> {
    let token = generate_token();
    let id = uuid::Uuid::now_v7().to_string();

    conn.execute(
        "INSERT INTO sessions (id, user_id, token, expires_at) VALUES (?1, ?2, ?3, datetime('now', ?4))",
        params![id, user_id, token, format!("+{} hours", hours)],
    )?;

    Ok(token)
}

/// Delete a session by token.
pub fn delete_session(conn: &Connection, token: &str) -> rusqlite::Result<()> {
    conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
    Ok(())
}

/// Resolve an unexpired session to its user and record the visit as the
/// user's last-seen time.
pub fn lookup_user(conn: &Connection, token: &str) -> rusqlite::Result<Option<User>> {
    let user_id: Option<i64> = conn
        .query_row(
            "SELECT user_id FROM sessions WHERE token = ?1 AND expires_at > datetime('now')",
            params![token],
            |row| row.get(0),
        )
        .optional()?;

    let Some(user_id) = user_id else {
        return Ok(None);
    };

    users::touch_last_seen(conn, user_id)?;
    users::find_by_id(conn, user_id)
}

/// Generate a cryptographically random 32-byte hex token.
pub(crate) fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    #[test]
    fn generate_token_is_64_hex_chars() {
        let token = generate_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn generate_token_is_unique() {
        assert_ne!(generate_token(), generate_token());
    }

    #[test]
    fn session_round_trip_touches_last_seen() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let id = users::create(&conn, "susan", "susan@example.com", "h").unwrap();

        let token = create_session(&conn, id, 1).unwrap();
        let user = lookup_user(&conn, &token).unwrap().unwrap();
        assert_eq!(user.id, id);
        assert!(user.last_seen.is_some());

        delete_session(&conn, &token).unwrap();
        assert!(lookup_user(&conn, &token).unwrap().is_none());
    }

    #[test]
    fn expired_session_is_ignored() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let id = users::create(&conn, "susan", "susan@example.com", "h").unwrap();
        let token = create_session(&conn, id, 1).unwrap();
        conn.execute(
            "UPDATE sessions SET expires_at = datetime('now', '-1 minutes')",
            [],
        )
        .unwrap();

        assert!(lookup_user(&conn, &token).unwrap().is_none());
        assert!(lookup_user(&conn, "unknown").unwrap().is_none());
    }
}
