use rusqlite::Row;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub about_me: Option<String>,
    pub last_seen: Option<String>,
}

impl User {
    pub(crate) const COLUMNS: &'static str =
        "id, username, email, password_hash, about_me, last_seen";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(User {
            id: row.get(0)?,
            username: row.get(1)?,
            email: row.get(2)?,
            password_hash: row.get(3)?,
            about_me: row.get(4)?,
            last_seen: row.get(5)?,
        })
    }
}

/// A post joined with its author's username, the shape every listing needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub body: String,
    pub timestamp: String,
    pub user_id: i64,
    pub author: String,
}

impl Post {
    pub(crate) const SELECT: &'static str =
        "SELECT p.id, p.body, p.timestamp, p.user_id, u.username FROM post p JOIN user u ON u.id = p.user_id";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Post {
            id: row.get(0)?,
            body: row.get(1)?,
            timestamp: row.get(2)?,
            user_id: row.get(3)?,
            author: row.get(4)?,
        })
    }
}
