pub mod assets;
pub mod auth;
pub mod home;
pub mod users;

use axum::routing::get;
use axum::Router;
use chrono::{NaiveDateTime, Utc};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use crate::db::models::Post;
use crate::db::pagination::Page;
use crate::error::AppError;
use crate::extractors::CurrentUser;
use crate::flash;
use crate::state::AppState;

/// The full application: every route, the flash middleware and request tracing.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(home::router())
        .merge(auth::router())
        .merge(users::router())
        .route("/static/{*path}", get(assets::serve))
        .fallback(not_found)
        .layer(axum::middleware::from_fn(flash::clear_consumed))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn not_found() -> AppError {
    AppError::NotFound
}

// --- Shared view data ---

/// Data every page passes to `base.html`.
pub struct Layout {
    pub title: String,
    pub current_user: Option<String>,
    pub profile_url: Option<String>,
    pub messages: Vec<String>,
}

impl Layout {
    pub fn new(title: &str, user: Option<&CurrentUser>, messages: Vec<String>) -> Self {
        Layout {
            title: title.to_string(),
            current_user: user.map(|u| u.username.clone()),
            profile_url: user.map(|u| profile_url(&u.username)),
            messages,
        }
    }
}

pub struct PostView {
    pub author: String,
    pub author_url: String,
    pub body: String,
    pub posted: String,
}

impl From<Post> for PostView {
    fn from(post: Post) -> Self {
        PostView {
            author_url: profile_url(&post.author),
            author: post.author,
            body: post.body,
            posted: parse_and_format_time(&post.timestamp),
        }
    }
}

/// Previous/next links for a paginated listing.
pub struct Pager {
    pub prev_url: Option<String>,
    pub next_url: Option<String>,
}

impl Pager {
    pub fn new<T>(page: &Page<T>, base: &str) -> Self {
        Pager {
            prev_url: page.prev_num().map(|n| format!("{}?page={}", base, n)),
            next_url: page.next_num().map(|n| format!("{}?page={}", base, n)),
        }
    }
}

pub fn post_views(page: Page<Post>, base: &str) -> (Vec<PostView>, Pager) {
    let pager = Pager::new(&page, base);
    let posts = page.items.into_iter().map(PostView::from).collect();
    (posts, pager)
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

impl PageQuery {
    /// Requested page; missing or non-numeric values mean the first page.
    pub fn number(&self) -> i64 {
        self.page
            .as_deref()
            .and_then(|p| p.trim().parse::<i64>().ok())
            .unwrap_or(1)
            .max(1)
    }
}

pub fn profile_url(username: &str) -> String {
    format!("/user/{}", urlencoding::encode(username))
}

// --- Time formatting ---

pub fn parse_and_format_time(db_time: &str) -> String {
    NaiveDateTime::parse_from_str(db_time, "%Y-%m-%d %H:%M:%S")
        .map(|dt| format_relative_time(&dt))
        .unwrap_or_else(|_| db_time.to_string())
}

pub fn format_relative_time(dt: &NaiveDateTime) -> String {
    let now = Utc::now().naive_utc();
    let diff = now.signed_duration_since(*dt);

    if diff.num_seconds() < 60 {
        return "just now".to_string();
    }

    let minutes = diff.num_minutes();
    if minutes < 60 {
        return format!("{}m ago", minutes);
    }

    let hours = diff.num_hours();
    if hours < 24 {
        return format!("{}h ago", hours);
    }

    let days = diff.num_days();
    if days < 7 {
        return format!("{}d ago", days);
    }

    dt.format("%b %-d, %Y").to_string()
}
