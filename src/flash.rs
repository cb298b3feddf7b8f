use std::convert::Infallible;

use axum::extract::{FromRequestParts, Request};
use axum::http::request::Parts;
use axum::http::{header, HeaderValue};
use axum::middleware::Next;
use axum::response::{AppendHeaders, IntoResponse, Redirect, Response};

use crate::extractors::cookie_value;

pub const FLASH_COOKIE: &str = "microblog_flash";

const CLEAR_FLASH_COOKIE: &str = "microblog_flash=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0";

/// One-time messages queued by the previous response.
#[derive(Debug, Default)]
pub struct Flashes(pub Vec<String>);

impl<S: Send + Sync> FromRequestParts<S> for Flashes {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let messages = cookie_value(&parts.headers, FLASH_COOKIE)
            .map(decode)
            .unwrap_or_default();
        Ok(Flashes(messages))
    }
}

/// Redirect (303) and queue a message for the next page the browser renders.
pub fn redirect(to: &str, message: impl Into<String>) -> Response {
    let cookie = format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/",
        FLASH_COOKIE,
        encode(&[message.into()])
    );
    (AppendHeaders([(header::SET_COOKIE, cookie)]), Redirect::to(to)).into_response()
}

/// Middleware: once a request carrying flash messages has produced a page
/// (anything but a redirect), expire the cookie so they show only once.
pub async fn clear_consumed(request: Request, next: Next) -> Response {
    let had_flash = cookie_value(request.headers(), FLASH_COOKIE).is_some();
    let mut response = next.run(request).await;

    if had_flash && !response.status().is_redirection() && !sets_flash(&response) {
        response.headers_mut().append(
            header::SET_COOKIE,
            HeaderValue::from_static(CLEAR_FLASH_COOKIE),
        );
    }
    response
}

fn sets_flash(response: &Response) -> bool {
    let prefix = format!("{}=", FLASH_COOKIE);
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.starts_with(&prefix))
}

fn encode(messages: &[String]) -> String {
    hex::encode(serde_json::to_vec(messages).unwrap_or_default())
}

fn decode(value: &str) -> Vec<String> {
    hex::decode(value)
        .ok()
        .and_then(|bytes| serde_json::from_slice(&bytes).ok())
        .unwrap_or_default()
}
