use askama::Template;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Form, Router};

use crate::db::posts;
use crate::error::AppResult;
use crate::extractors::CurrentUser;
use crate::flash::{self, Flashes};
use crate::forms::{FieldErrors, PostForm};
use crate::routes::{post_views, Layout, PageQuery, Pager, PostView};
use crate::state::AppState;

/// Shared by the home feed (with the post form) and explore (without).
#[derive(Template)]
#[template(path = "pages/index.html")]
pub struct IndexTemplate {
    pub layout: Layout,
    pub greeting: Option<String>,
    pub draft: String,
    pub errors: FieldErrors,
    pub posts: Vec<PostView>,
    pub pager: Pager,
}

/// Wrapper to render askama templates as axum responses
pub struct Html<T: Template>(pub T);

impl<T: Template> IntoResponse for Html<T> {
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(body) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
                body,
            )
                .into_response(),
            Err(e) => {
                tracing::error!("Template render error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response()
            }
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index).post(create_post))
        .route("/index", get(index).post(create_post))
        .route("/explore", get(explore))
}

pub async fn index(
    State(state): State<AppState>,
    user: CurrentUser,
    Flashes(messages): Flashes,
    Query(query): Query<PageQuery>,
) -> AppResult<Html<IndexTemplate>> {
    home_page(
        &state,
        &user,
        messages,
        query.number(),
        String::new(),
        FieldErrors::default(),
    )
}

pub async fn create_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<PostForm>,
) -> AppResult<Response> {
    let errors = form.errors();
    if !errors.is_empty() {
        return Ok(home_page(&state, &user, Vec::new(), 1, form.post, errors)?.into_response());
    }

    {
        let conn = state.db.get()?;
        posts::create(&conn, user.id, form.post.trim())?;
    }
    tracing::info!(author = %user.username, "New post");

    Ok(flash::redirect("/", "Your post is now live!"))
}

pub async fn explore(
    State(state): State<AppState>,
    user: CurrentUser,
    Flashes(messages): Flashes,
    Query(query): Query<PageQuery>,
) -> AppResult<Html<IndexTemplate>> {
    let page = {
        let conn = state.db.get()?;
        posts::all_posts(&conn, query.number(), state.config.feed.posts_per_page)?
    };
    let (posts, pager) = post_views(page, "/explore");

    Ok(Html(IndexTemplate {
        layout: Layout::new("Explore", Some(&user), messages),
        greeting: None,
        draft: String::new(),
        errors: FieldErrors::default(),
        posts,
        pager,
    }))
}

fn home_page(
    state: &AppState,
    user: &CurrentUser,
    messages: Vec<String>,
    page: i64,
    draft: String,
    errors: FieldErrors,
) -> AppResult<Html<IndexTemplate>> {
    let page = {
        let conn = state.db.get()?;
        posts::followed_posts(&conn, user.id, page, state.config.feed.posts_per_page)?
    };
    let (posts, pager) = post_views(page, "/index");

    Ok(Html(IndexTemplate {
        layout: Layout::new("Home", Some(user), messages),
        greeting: Some(user.username.clone()),
        draft,
        errors,
        posts,
        pager,
    }))
}
