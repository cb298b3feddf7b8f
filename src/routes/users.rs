use askama::Template;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Form, Router};

use crate::db::users;
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::flash::{self, Flashes};
use crate::forms::{EditProfileForm, FieldErrors};
use crate::routes::home::Html;
use crate::routes::{parse_and_format_time, post_views, profile_url, Layout, PageQuery, Pager, PostView};
use crate::state::AppState;

pub struct ProfileView {
    pub username: String,
    pub about_me: Option<String>,
    pub last_seen: Option<String>,
    pub followers: i64,
    pub following: i64,
}

#[derive(Template)]
#[template(path = "pages/user.html")]
pub struct UserTemplate {
    pub layout: Layout,
    pub profile: ProfileView,
    pub is_self: bool,
    pub is_following: bool,
    pub follow_url: String,
    pub unfollow_url: String,
    pub posts: Vec<PostView>,
    pub pager: Pager,
}

#[derive(Template)]
#[template(path = "pages/edit_profile.html")]
pub struct EditProfileTemplate {
    pub layout: Layout,
    pub username: String,
    pub about_me: String,
    pub errors: FieldErrors,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/user/{username}", get(user_page))
        .route("/edit_profile", get(edit_profile_page).post(edit_profile_submit))
        .route("/follow/{username}", get(follow))
        .route("/unfollow/{username}", get(unfollow))
}

pub async fn user_page(
    State(state): State<AppState>,
    current: CurrentUser,
    Flashes(messages): Flashes,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> AppResult<Html<UserTemplate>> {
    let conn = state.db.get()?;
    let user = users::find_by_username(&conn, &username)?.ok_or(AppError::NotFound)?;

    let page = crate::db::posts::user_posts(
        &conn,
        user.id,
        query.number(),
        state.config.feed.posts_per_page,
    )?;
    let profile = ProfileView {
        followers: users::followers_count(&conn, user.id)?,
        following: users::followed_count(&conn, user.id)?,
        last_seen: user.last_seen.as_deref().map(parse_and_format_time),
        about_me: user.about_me.clone(),
        username: user.username.clone(),
    };
    let is_following = users::is_following(&conn, current.id, user.id)?;

    let base = profile_url(&user.username);
    let (posts, pager) = post_views(page, &base);
    let encoded = urlencoding::encode(&user.username);

    Ok(Html(UserTemplate {
        layout: Layout::new(&user.username, Some(&current), messages),
        profile,
        is_self: current.id == user.id,
        is_following,
        follow_url: format!("/follow/{}", encoded),
        unfollow_url: format!("/unfollow/{}", encoded),
        posts,
        pager,
    }))
}

pub async fn edit_profile_page(
    current: CurrentUser,
    Flashes(messages): Flashes,
) -> Html<EditProfileTemplate> {
    Html(EditProfileTemplate {
        layout: Layout::new("Edit Profile", Some(&current), messages),
        username: current.username.clone(),
        about_me: current.about_me.clone().unwrap_or_default(),
        errors: FieldErrors::default(),
    })
}

pub async fn edit_profile_submit(
    State(state): State<AppState>,
    current: CurrentUser,
    Form(form): Form<EditProfileForm>,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let errors = form.errors(&conn, &current.username)?;
    if !errors.is_empty() {
        return Ok(Html(EditProfileTemplate {
            layout: Layout::new("Edit Profile", Some(&current), Vec::new()),
            username: form.username,
            about_me: form.about_me,
            errors,
        })
        .into_response());
    }

    if let Err(e) = users::update_profile(&conn, current.id, form.username.trim(), form.about_me()) {
        let Some(column) = users::unique_violation(&e) else {
            return Err(e.into());
        };
        let mut errors = FieldErrors::default();
        errors.already_exists(column);
        return Ok(Html(EditProfileTemplate {
            layout: Layout::new("Edit Profile", Some(&current), Vec::new()),
            username: form.username,
            about_me: form.about_me,
            errors,
        })
        .into_response());
    }
    Ok(flash::redirect("/edit_profile", "Your changes have been saved."))
}

pub async fn follow(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(username): Path<String>,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let Some(target) = users::find_by_username(&conn, &username)? else {
        return Ok(flash::redirect("/", format!("User {} not found.", username)));
    };
    if target.id == current.id {
        return Ok(flash::redirect(
            &profile_url(&username),
            "You cannot follow yourself!",
        ));
    }

    users::follow(&conn, current.id, target.id)?;
    tracing::info!(follower = %current.username, followed = %target.username, "Follow");

    Ok(flash::redirect(
        &profile_url(&username),
        format!("You are following {}!", username),
    ))
}

pub async fn unfollow(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(username): Path<String>,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let Some(target) = users::find_by_username(&conn, &username)? else {
        return Ok(flash::redirect("/", format!("User {} not found.", username)));
    };
    if target.id == current.id {
        return Ok(flash::redirect(
            &profile_url(&username),
            "You cannot unfollow yourself!",
        ));
    }

    users::unfollow(&conn, current.id, target.id)?;
    tracing::info!(follower = %current.username, followed = %target.username, "Unfollow");

    Ok(flash::redirect(
        &profile_url(&username),
        format!("You are not following {}.", username),
    ))
}
