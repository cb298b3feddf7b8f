use rusqlite::{ffi, params, Connection, ErrorCode, OptionalExtension};

use crate::db::models::User;

pub fn create(
    conn: &Connection,
    username: &str,
    email: &str,
    password_hash: &str,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO user (username, email, password_hash) VALUES (?1, ?2, ?3)",
        params![username, email, password_hash],
    )?;
    Ok(conn.last_insert_rowid())
}

/// The `user` column named by a UNIQUE constraint failure, such as
/// `"username"`. Lets a lost insert race surface as a form error.
pub fn unique_violation(err: &rusqlite::Error) -> Option<&str> {
    match err {
        rusqlite::Error::SqliteFailure(e, Some(msg))
            if e.code == ErrorCode::ConstraintViolation
                && e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            msg.strip_prefix("UNIQUE constraint failed: user.")
        }
        _ => None,
    }
}

pub fn find_by_id(conn: &Connection, id: i64) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {} FROM user WHERE id = ?1", User::COLUMNS),
        params![id],
        User::from_row,
    )
    .optional()
}

pub fn find_by_username(conn: &Connection, username: &str) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {} FROM user WHERE username = ?1", User::COLUMNS),
        params![username],
        User::from_row,
    )
    .optional()
}

pub fn find_by_email(conn: &Connection, email: &str) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {} FROM user WHERE email = ?1", User::COLUMNS),
        params![email],
        User::from_row,
    )
    .optional()
}

pub fn username_taken(conn: &Connection, username: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM user WHERE username = ?1",
        params![username],
        |row| row.get(0),
    )
}

pub fn email_taken(conn: &Connection, email: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM user WHERE email = ?1",
        params![email],
        |row| row.get(0),
    )
}

pub fn update_profile(
    conn: &Connection,
    id: i64,
    username: &str,
    about_me: Option<&str>,
) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE user SET username = ?1, about_me = ?2 WHERE id = ?3",
        params![username, about_me, id],
    )?;
    Ok(())
}

pub fn set_password_hash(conn: &Connection, id: i64, password_hash: &str) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE user SET password_hash = ?1 WHERE id = ?2",
        params![password_hash, id],
    )?;
    Ok(())
}

pub fn touch_last_seen(conn: &Connection, id: i64) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE user SET last_seen = datetime('now') WHERE id = ?1",
        params![id],
    )?;
    Ok(())
}

// --- Follow edges ---

/// Add the edge `follower -> followed` unless it already exists.
/// Returns whether a row was inserted.
pub fn follow(conn: &Connection, follower_id: i64, followed_id: i64) -> rusqlite::Result<bool> {
    if is_following(conn, follower_id, followed_id)? {
        return Ok(false);
    }
    conn.execute(
        "INSERT INTO followers (follower_id, followed_id) VALUES (?1, ?2)",
        params![follower_id, followed_id],
    )?;
    Ok(true)
}

/// Remove every `follower -> followed` edge. Missing edges are not an error.
pub fn unfollow(conn: &Connection, follower_id: i64, followed_id: i64) -> rusqlite::Result<bool> {
    let removed = conn.execute(
        "DELETE FROM followers WHERE follower_id = ?1 AND followed_id = ?2",
        params![follower_id, followed_id],
    )?;
    Ok(removed > 0)
}

pub fn is_following(conn: &Connection, follower_id: i64, followed_id: i64) -> rusqlite::Result<bool> {
    Ok(follow_edge_count(conn, follower_id, followed_id)? > 0)
}

pub fn follow_edge_count(
    conn: &Connection,
    follower_id: i64,
    followed_id: i64,
) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM followers WHERE follower_id = ?1 AND followed_id = ?2",
        params![follower_id, followed_id],
        |row| row.get(0),
    )
}

pub fn followers_count(conn: &Connection, user_id: i64) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(DISTINCT follower_id) FROM followers WHERE followed_id = ?1",
        params![user_id],
        |row| row.get(0),
    )
}

pub fn followed_count(conn: &Connection, user_id: i64) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(DISTINCT followed_id) FROM followers WHERE follower_id = ?1",
        params![user_id],
        |row| row.get(0),
    )
}
