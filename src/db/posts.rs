use rusqlite::{params, Connection};

use crate::db::models::Post;
use crate::db::pagination::{self, Page};

pub fn create(conn: &Connection, user_id: i64, body: &str) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO post (body, user_id) VALUES (?1, ?2)",
        params![body, user_id],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Home feed: posts by everyone `user_id` follows, plus the user's own.
pub fn followed_posts(
    conn: &Connection,
    user_id: i64,
    page: i64,
    per_page: i64,
) -> rusqlite::Result<Page<Post>> {
    const FILTER: &str = "WHERE p.user_id = ?1
           OR p.user_id IN (SELECT followed_id FROM followers WHERE follower_id = ?1)";

    pagination::fetch(
        conn,
        &format!("SELECT COUNT(*) FROM post p {}", FILTER),
        &format!(
            "{} {} ORDER BY p.timestamp DESC, p.id DESC LIMIT ?2 OFFSET ?3",
            Post::SELECT,
            FILTER
        ),
        &[&user_id],
        page,
        per_page,
        Post::from_row,
    )
}

pub fn user_posts(
    conn: &Connection,
    user_id: i64,
    page: i64,
    per_page: i64,
) -> rusqlite::Result<Page<Post>> {
    pagination::fetch(
        conn,
        "SELECT COUNT(*) FROM post WHERE user_id = ?1",
        &format!(
            "{} WHERE p.user_id = ?1 ORDER BY p.timestamp DESC, p.id DESC LIMIT ?2 OFFSET ?3",
            Post::SELECT
        ),
        &[&user_id],
        page,
        per_page,
        Post::from_row,
    )
}

pub fn all_posts(conn: &Connection, page: i64, per_page: i64) -> rusqlite::Result<Page<Post>> {
    pagination::fetch(
        conn,
        "SELECT COUNT(*) FROM post",
        &format!(
            "{} ORDER BY p.timestamp DESC, p.id DESC LIMIT ?1 OFFSET ?2",
            Post::SELECT
        ),
        &[],
        page,
        per_page,
        Post::from_row,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{test_pool, users};

    fn bodies(page: &Page<Post>) -> Vec<&str> {
        page.items.iter().map(|p| p.body.as_str()).collect()
    }

    #[test]
    fn followed_posts_includes_followed_and_own_only() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let john = users::create(&conn, "john", "john@example.com", "h").unwrap();
        let susan = users::create(&conn, "susan", "susan@example.com", "h").unwrap();
        let mary = users::create(&conn, "mary", "mary@example.com", "h").unwrap();

        create(&conn, john, "post from john").unwrap();
        create(&conn, susan, "post from susan").unwrap();
        create(&conn, mary, "post from mary").unwrap();
        users::follow(&conn, john, susan).unwrap();

        let feed = followed_posts(&conn, john, 1, 10).unwrap();
        assert_eq!(bodies(&feed), vec!["post from susan", "post from john"]);
        assert_eq!(feed.items[0].author, "susan");
        assert_eq!(feed.total, 2);
    }

    #[test]
    fn duplicate_edges_do_not_duplicate_feed_rows() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let john = users::create(&conn, "john", "john@example.com", "h").unwrap();
        let susan = users::create(&conn, "susan", "susan@example.com", "h").unwrap();
        create(&conn, susan, "only once").unwrap();
        for _ in 0..2 {
            conn.execute(
                "INSERT INTO followers (follower_id, followed_id) VALUES (?1, ?2)",
                params![john, susan],
            )
            .unwrap();
        }

        let feed = followed_posts(&conn, john, 1, 10).unwrap();
        assert_eq!(bodies(&feed), vec!["only once"]);
    }

    #[test]
    fn listings_are_newest_first_and_paginated() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let john = users::create(&conn, "john", "john@example.com", "h").unwrap();
        for i in 1..=5 {
            create(&conn, john, &format!("post {}", i)).unwrap();
        }

        let first = user_posts(&conn, john, 1, 2).unwrap();
        assert_eq!(bodies(&first), vec!["post 5", "post 4"]);
        assert_eq!(first.next_num(), Some(2));

        let last = all_posts(&conn, 3, 2).unwrap();
        assert_eq!(bodies(&last), vec!["post 1"]);
        assert!(!last.has_next());
        assert_eq!(last.prev_num(), Some(2));
    }

    #[test]
    fn page_beyond_last_is_empty() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let john = users::create(&conn, "john", "john@example.com", "h").unwrap();
        create(&conn, john, "lonely").unwrap();

        let page = followed_posts(&conn, john, 50, 3).unwrap();
        assert!(page.items.is_empty());
        assert!(!page.has_next());
        assert_eq!(page.total, 1);
    }
}
