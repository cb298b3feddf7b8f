use askama::Template;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};

use crate::routes::Layout;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found")]
    NotFound,

    #[error("Login required")]
    LoginRequired { next: String },

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Password hashing error: {0}")]
    Password(#[from] bcrypt::BcryptError),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Template)]
#[template(path = "pages/error.html")]
struct ErrorTemplate {
    layout: Layout,
    heading: String,
    detail: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self {
            AppError::NotFound => (
                StatusCode::NOT_FOUND,
                "The page you asked for does not exist.".to_string(),
            ),
            AppError::LoginRequired { next } => {
                let target = format!("/login?next={}", urlencoding::encode(next));
                return Redirect::to(&target).into_response();
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                internal()
            }
            AppError::Pool(e) => {
                tracing::error!("Pool error: {}", e);
                internal()
            }
            AppError::Password(e) => {
                tracing::error!("Password hashing error: {}", e);
                internal()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                internal()
            }
        };

        render_error_page(status, detail)
    }
}

fn internal() -> (StatusCode, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "An unexpected error has occurred. The administrator has been notified.".to_string(),
    )
}

fn render_error_page(status: StatusCode, detail: String) -> Response {
    let heading = status
        .canonical_reason()
        .unwrap_or("Error")
        .to_string();
    let page = ErrorTemplate {
        layout: Layout::new(&heading, None, Vec::new()),
        heading,
        detail,
    };

    match page.render() {
        Ok(body) => (
            status,
            [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Template render error: {}", e);
            (status, status.canonical_reason().unwrap_or("Error")).into_response()
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
