use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};

use crate::auth::session;
use crate::db::models::User;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Represents the currently authenticated user.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
    pub about_me: Option<String>,
}

impl From<User> for CurrentUser {
    fn from(user: User) -> Self {
        CurrentUser {
            id: user.id,
            username: user.username,
            about_me: user.about_me,
        }
    }
}

/// Extractor that requires authentication.
/// Anonymous requests are sent to the login page with the original path as `next`.
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match session_user(parts, state)? {
            Some(user) => Ok(user),
            None => {
                let next = parts
                    .uri
                    .path_and_query()
                    .map(|pq| pq.as_str().to_string())
                    .unwrap_or_else(|| "/".to_string());
                Err(AppError::LoginRequired { next })
            }
        }
    }
}

/// Optional user extractor. Returns None instead of redirecting when not authenticated.
pub struct MaybeUser(pub Option<CurrentUser>);

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(session_user(parts, state)?))
    }
}

fn session_user(parts: &Parts, state: &AppState) -> AppResult<Option<CurrentUser>> {
    let Some(token) = cookie_value(&parts.headers, &state.config.auth.cookie_name) else {
        return Ok(None);
    };

    let conn = state.db.get()?;
    Ok(session::lookup_user(&conn, token)?.map(CurrentUser::from))
}

pub(crate) fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|s| s.split(';'))
        .map(|s| s.trim())
        .find_map(|cookie| {
            let mut split = cookie.splitn(2, '=');
            let key = split.next()?.trim();
            let val = split.next()?.trim();
            if key == name && !val.is_empty() {
                Some(val)
            } else {
                None
            }
        })
}
