use askama::Template;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap};
use axum::response::{AppendHeaders, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Form, Router};
use serde::Deserialize;

use crate::auth::{password, reset, session};
use crate::config::AuthConfig;
use crate::db::users;
use crate::error::{AppError, AppResult};
use crate::extractors::{cookie_value, MaybeUser};
use crate::flash::{self, Flashes};
use crate::forms::{
    FieldErrors, LoginForm, RegistrationForm, ResetPasswordForm, ResetPasswordRequestForm,
};
use crate::mail;
use crate::routes::home::Html;
use crate::routes::Layout;
use crate::state::AppState;

// -- Templates --

#[derive(Template)]
#[template(path = "pages/login.html")]
pub struct LoginTemplate {
    pub layout: Layout,
    pub username: String,
    pub errors: FieldErrors,
}

#[derive(Template)]
#[template(path = "pages/register.html")]
pub struct RegisterTemplate {
    pub layout: Layout,
    pub username: String,
    pub email: String,
    pub errors: FieldErrors,
}

#[derive(Template)]
#[template(path = "pages/reset_password_request.html")]
pub struct ResetRequestTemplate {
    pub layout: Layout,
    pub email: String,
    pub errors: FieldErrors,
}

#[derive(Template)]
#[template(path = "pages/reset_password.html")]
pub struct ResetPasswordTemplate {
    pub layout: Layout,
    pub errors: FieldErrors,
}

#[derive(Deserialize, Default)]
pub struct NextQuery {
    pub next: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login_page).post(login_submit))
        .route("/logout", get(logout))
        .route("/register", get(register_page).post(register_submit))
        .route(
            "/reset_password_request",
            get(reset_request_page).post(reset_request_submit),
        )
        .route(
            "/reset_password/{token}",
            get(reset_password_page).post(reset_password_submit),
        )
}

// -- Cookie helpers --

fn session_cookie(auth: &AuthConfig, token: &str, remember: bool) -> String {
    let mut cookie = format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/",
        auth.cookie_name, token
    );
    if remember {
        cookie.push_str(&format!("; Max-Age={}", auth.session_hours * 3600));
    }
    cookie
}

fn clear_session_cookie(auth: &AuthConfig) -> String {
    format!(
        "{}=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0",
        auth.cookie_name
    )
}

/// Only same-site paths are followed after login. Browsers drop tabs and
/// newlines from URLs, so `/\t/host` would turn into `//host`.
fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(n)
            if n.starts_with('/')
                && !n.starts_with("//")
                && !n.contains('\\')
                && !n.chars().any(|c| c.is_control() || c.is_whitespace()) =>
        {
            n
        }
        _ => "/",
    }
}

async fn hash_password(password: String, cost: u32) -> AppResult<String> {
    tokio::task::spawn_blocking(move || password::hash(&password, cost))
        .await
        .map_err(|e| AppError::Internal(format!("Password hashing task failed: {}", e)))?
        .map_err(AppError::from)
}

// -- Login / logout --

pub async fn login_page(
    MaybeUser(user): MaybeUser,
    Flashes(messages): Flashes,
) -> Response {
    if user.is_some() {
        return Redirect::to("/").into_response();
    }
    Html(LoginTemplate {
        layout: Layout::new("Sign In", None, messages),
        username: String::new(),
        errors: FieldErrors::default(),
    })
    .into_response()
}

pub async fn login_submit(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Query(query): Query<NextQuery>,
    Form(form): Form<LoginForm>,
) -> AppResult<Response> {
    if user.is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    let errors = form.errors();
    if !errors.is_empty() {
        return Ok(Html(LoginTemplate {
            layout: Layout::new("Sign In", None, Vec::new()),
            username: form.username,
            errors,
        })
        .into_response());
    }

    let found = {
        let conn = state.db.get()?;
        users::find_by_username(&conn, form.username.trim())?
    };

    let verified = match found {
        Some(user) => {
            let candidate = form.password.clone();
            let hash = user.password_hash.clone();
            let ok = tokio::task::spawn_blocking(move || {
                password::verify(&candidate, hash.as_deref())
            })
            .await
            .map_err(|e| AppError::Internal(format!("Password check task failed: {}", e)))?;
            ok.then_some(user)
        }
        None => None,
    };

    let Some(user) = verified else {
        tracing::info!(username = %form.username, "Failed login");
        return Ok(flash::redirect("/login", "Invalid username or password"));
    };

    let target = safe_next(query.next.as_deref());
    let token = {
        let conn = state.db.get()?;
        session::create_session(&conn, user.id, state.config.auth.session_hours)?
    };
    tracing::info!(username = %user.username, "User logged in");

    let cookie = session_cookie(&state.config.auth, &token, form.remember());
    Ok((
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Redirect::to(target),
    )
        .into_response())
}

/// GET /logout: delete session and redirect
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Response> {
    if let Some(token) = cookie_value(&headers, &state.config.auth.cookie_name) {
        let conn = state.db.get()?;
        if let Err(e) = session::delete_session(&conn, token) {
            tracing::warn!("Failed to delete session: {}", e);
        }
    }

    Ok((
        AppendHeaders([(header::SET_COOKIE, clear_session_cookie(&state.config.auth))]),
        Redirect::to("/"),
    )
        .into_response())
}

// -- Registration --

pub async fn register_page(MaybeUser(user): MaybeUser, Flashes(messages): Flashes) -> Response {
    if user.is_some() {
        return Redirect::to("/").into_response();
    }
    Html(RegisterTemplate {
        layout: Layout::new("Register", None, messages),
        username: String::new(),
        email: String::new(),
        errors: FieldErrors::default(),
    })
    .into_response()
}

pub async fn register_submit(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Form(form): Form<RegistrationForm>,
) -> AppResult<Response> {
    if user.is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    let errors = {
        let conn = state.db.get()?;
        form.errors(&conn)?
    };
    if !errors.is_empty() {
        return Ok(Html(RegisterTemplate {
            layout: Layout::new("Register", None, Vec::new()),
            username: form.username,
            email: form.email,
            errors,
        })
        .into_response());
    }

    let hash = hash_password(form.password.clone(), state.config.auth.bcrypt_cost).await?;
    let created = {
        let conn = state.db.get()?;
        users::create(&conn, form.username.trim(), form.email.trim(), &hash)
    };
    if let Err(e) = created {
        // Another request took the name or email while the hash was computed
        let Some(column) = users::unique_violation(&e) else {
            return Err(e.into());
        };
        let mut errors = FieldErrors::default();
        errors.already_exists(column);
        return Ok(Html(RegisterTemplate {
            layout: Layout::new("Register", None, Vec::new()),
            username: form.username,
            email: form.email,
            errors,
        })
        .into_response());
    }
    tracing::info!(username = %form.username.trim(), "Registered new user");

    Ok(flash::redirect(
        "/login",
        "Congratulations, you are now a registered user!",
    ))
}

// -- Password reset --

pub async fn reset_request_page(
    MaybeUser(user): MaybeUser,
    Flashes(messages): Flashes,
) -> Response {
    if user.is_some() {
        return Redirect::to("/").into_response();
    }
    Html(ResetRequestTemplate {
        layout: Layout::new("Reset Password", None, messages),
        email: String::new(),
        errors: FieldErrors::default(),
    })
    .into_response()
}

pub async fn reset_request_submit(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Form(form): Form<ResetPasswordRequestForm>,
) -> AppResult<Response> {
    if user.is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    let errors = form.errors();
    if !errors.is_empty() {
        return Ok(Html(ResetRequestTemplate {
            layout: Layout::new("Reset Password", None, Vec::new()),
            email: form.email,
            errors,
        })
        .into_response());
    }

    let conn = state.db.get()?;
    if let Some(user) = users::find_by_email(&conn, form.email.trim())? {
        let token = reset::issue_token(&conn, user.id, state.config.auth.reset_token_minutes)?;
        mail::send_password_reset_email(&state.config, &user, &token);
    }

    Ok(flash::redirect(
        "/login",
        "Check your email for the instructions to reset your password",
    ))
}

pub async fn reset_password_page(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Flashes(messages): Flashes,
    Path(token): Path<String>,
) -> AppResult<Response> {
    if user.is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    let valid = {
        let conn = state.db.get()?;
        reset::verify_token(&conn, &token)?.is_some()
    };
    if !valid {
        return Ok(Redirect::to("/").into_response());
    }

    Ok(Html(ResetPasswordTemplate {
        layout: Layout::new("Reset Password", None, messages),
        errors: FieldErrors::default(),
    })
    .into_response())
}

pub async fn reset_password_submit(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(token): Path<String>,
    Form(form): Form<ResetPasswordForm>,
) -> AppResult<Response> {
    if user.is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    let user_id = {
        let conn = state.db.get()?;
        reset::verify_token(&conn, &token)?
    };
    let Some(user_id) = user_id else {
        return Ok(Redirect::to("/").into_response());
    };

    let errors = form.errors();
    if !errors.is_empty() {
        return Ok(Html(ResetPasswordTemplate {
            layout: Layout::new("Reset Password", None, Vec::new()),
            errors,
        })
        .into_response());
    }

    let claimed = {
        let conn = state.db.get()?;
        reset::redeem(&conn, &token)?
    };
    if claimed != Some(user_id) {
        return Ok(Redirect::to("/").into_response());
    }

    let hash = hash_password(form.password, state.config.auth.bcrypt_cost).await?;
    {
        let conn = state.db.get()?;
        users::set_password_hash(&conn, user_id, &hash)?;
        reset::consume_tokens(&conn, user_id)?;
    }
    tracing::info!(user_id, "Password reset");

    Ok(flash::redirect("/login", "Your password has been reset."))
}
