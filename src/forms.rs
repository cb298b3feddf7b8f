//! Submitted forms and their validation rules.
//!
//! Every form deserializes from an urlencoded body with missing fields
//! defaulting to empty. Field rules are declared with `validator`; checks that
//! need the database take a connection and run before any write. Both end up
//! in [`FieldErrors`], which the templates read.

use std::borrow::Cow;
use std::collections::BTreeMap;

use rusqlite::Connection;
use serde::Deserialize;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::db::users;

const REQUIRED: &str = "This field is required.";

/// Validation messages keyed by field name.
#[derive(Debug, Default, Clone)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Record a uniqueness failure for `username` or `email`.
    pub fn already_exists(&mut self, field: &str) {
        match field {
            "username" => self.add("username", "Username already exists; please use another."),
            "email" => self.add("email", "Email already exists; please use another."),
            other => self.add(other, "Value already exists; please use another."),
        }
    }
}

/// A blank field reports only that it is required, not every other rule it
/// also fails.
impl From<ValidationErrors> for FieldErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields = FieldErrors::default();
        for (field, list) in errors.field_errors() {
            let required = list.iter().find(|e| e.code == "required");
            let shown: Vec<&ValidationError> = match required {
                Some(e) => vec![e],
                None => list.iter().collect(),
            };
            for error in shown {
                let message = error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| error.code.to_string());
                fields.add(&field, message);
            }
        }
        fields
    }
}

fn check<T: Validate>(form: &T) -> FieldErrors {
    match form.validate() {
        Ok(()) => FieldErrors::default(),
        Err(errors) => errors.into(),
    }
}

/// Required means something other than whitespace.
fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("required").with_message(Cow::Borrowed(REQUIRED)));
    }
    Ok(())
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct LoginForm {
    #[validate(custom(function = "not_blank"))]
    pub username: String,
    #[validate(custom(function = "not_blank"))]
    pub password: String,
    pub remember_me: Option<String>,
}

impl LoginForm {
    pub fn errors(&self) -> FieldErrors {
        check(self)
    }

    pub fn remember(&self) -> bool {
        self.remember_me.is_some()
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct RegistrationForm {
    #[validate(custom(function = "not_blank"))]
    pub username: String,
    #[validate(
        custom(function = "not_blank"),
        email(message = "Invalid email address.")
    )]
    pub email: String,
    #[validate(custom(function = "not_blank"))]
    pub password: String,
    #[validate(
        custom(function = "not_blank"),
        must_match(other = "password", message = "Field must be equal to password.")
    )]
    pub password2: String,
}

impl RegistrationForm {
    pub fn errors(&self, conn: &Connection) -> rusqlite::Result<FieldErrors> {
        let mut errors = check(self);

        if errors.get("username").is_empty() && users::username_taken(conn, self.username.trim())? {
            errors.already_exists("username");
        }
        if errors.get("email").is_empty() && users::email_taken(conn, self.email.trim())? {
            errors.already_exists("email");
        }
        Ok(errors)
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct EditProfileForm {
    #[validate(custom(function = "not_blank"))]
    pub username: String,
    #[validate(length(max = 140, message = "Field cannot be longer than 140 characters."))]
    pub about_me: String,
}

impl EditProfileForm {
    pub fn errors(&self, conn: &Connection, original_username: &str) -> rusqlite::Result<FieldErrors> {
        let mut errors = check(self);
        let username = self.username.trim();

        if errors.get("username").is_empty()
            && username != original_username
            && users::username_taken(conn, username)?
        {
            errors.already_exists("username");
        }
        Ok(errors)
    }

    /// The about-me text to store; blank means none.
    pub fn about_me(&self) -> Option<&str> {
        let about = self.about_me.trim();
        (!about.is_empty()).then_some(about)
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct PostForm {
    #[validate(
        custom(function = "not_blank"),
        length(min = 1, max = 140, message = "Field must be between 1 and 140 characters long.")
    )]
    pub post: String,
}

impl PostForm {
    pub fn errors(&self) -> FieldErrors {
        check(self)
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct ResetPasswordRequestForm {
    #[validate(
        custom(function = "not_blank"),
        email(message = "Invalid email address.")
    )]
    pub email: String,
}

impl ResetPasswordRequestForm {
    pub fn errors(&self) -> FieldErrors {
        check(self)
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct ResetPasswordForm {
    #[validate(custom(function = "not_blank"))]
    pub password: String,
    #[validate(
        custom(function = "not_blank"),
        must_match(other = "password", message = "Field must be equal to password.")
    )]
    pub password2: String,
}

impl ResetPasswordForm {
    pub fn errors(&self) -> FieldErrors {
        check(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    fn registration(username: &str, email: &str) -> RegistrationForm {
        RegistrationForm {
            username: username.into(),
            email: email.into(),
            password: "secret".into(),
            password2: "secret".into(),
        }
    }

    #[test]
    fn login_requires_both_fields() {
        let errors = LoginForm::default().errors();
        assert_eq!(errors.get("username"), [REQUIRED]);
        assert_eq!(errors.get("password"), [REQUIRED]);
        assert!(errors.get("remember_me").is_empty());
    }

    #[test]
    fn whitespace_only_counts_as_missing() {
        let form = LoginForm {
            username: "   ".into(),
            password: "secret".into(),
            remember_me: None,
        };
        assert_eq!(form.errors().get("username"), [REQUIRED]);
    }

    #[test]
    fn registration_accepts_fresh_user() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let errors = registration("susan", "susan@example.com")
            .errors(&conn)
            .unwrap();
        assert!(errors.is_empty(), "{:?}", errors);
    }

    #[test]
    fn registration_rejects_taken_username_and_email() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        users::create(&conn, "susan", "susan@example.com", "h").unwrap();

        let errors = registration("susan", "susan@example.com")
            .errors(&conn)
            .unwrap();
        assert_eq!(
            errors.get("username"),
            ["Username already exists; please use another."]
        );
        assert_eq!(
            errors.get("email"),
            ["Email already exists; please use another."]
        );
    }

    #[test]
    fn registration_checks_email_shape_and_password_match() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let mut form = registration("susan", "not-an-email");
        form.password2 = "different".into();

        let errors = form.errors(&conn).unwrap();
        assert_eq!(errors.get("email"), ["Invalid email address."]);
        assert_eq!(errors.get("password2"), ["Field must be equal to password."]);
    }

    #[test]
    fn blank_email_only_reports_required() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let errors = registration("susan", "").errors(&conn).unwrap();
        assert_eq!(errors.get("email"), [REQUIRED]);
    }

    #[test]
    fn edit_profile_allows_keeping_own_username() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        users::create(&conn, "susan", "susan@example.com", "h").unwrap();
        users::create(&conn, "john", "john@example.com", "h").unwrap();

        let keep = EditProfileForm {
            username: "susan".into(),
            about_me: "hi".into(),
        };
        assert!(keep.errors(&conn, "susan").unwrap().is_empty());

        let steal = EditProfileForm {
            username: "john".into(),
            about_me: String::new(),
        };
        assert_eq!(steal.errors(&conn, "susan").unwrap().get("username").len(), 1);
        assert_eq!(steal.about_me(), None);
    }

    #[test]
    fn about_me_length_counts_characters() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let fits = EditProfileForm {
            username: "susan".into(),
            about_me: "é".repeat(140),
        };
        assert!(fits.errors(&conn, "susan").unwrap().is_empty());

        let too_long = EditProfileForm {
            username: "susan".into(),
            about_me: "a".repeat(141),
        };
        assert_eq!(
            too_long.errors(&conn, "susan").unwrap().get("about_me"),
            ["Field cannot be longer than 140 characters."]
        );
    }

    #[test]
    fn post_body_must_be_1_to_140_chars() {
        assert_eq!(
            PostForm { post: "   ".into() }.errors().get("post"),
            [REQUIRED]
        );
        assert!(PostForm { post: "x".repeat(140) }.errors().is_empty());
        assert_eq!(
            PostForm { post: "x".repeat(141) }.errors().get("post"),
            ["Field must be between 1 and 140 characters long."]
        );
    }

    #[test]
    fn reset_forms() {
        assert!(ResetPasswordRequestForm {
            email: "susan@example.com".into()
        }
        .errors()
        .is_empty());
        assert!(!ResetPasswordRequestForm {
            email: "susan@".into()
        }
        .errors()
        .is_empty());

        let mismatch = ResetPasswordForm {
            password: "one".into(),
            password2: "two".into(),
        };
        assert_eq!(mismatch.errors().get("password2").len(), 1);
    }

    #[test]
    fn already_exists_uses_field_specific_text() {
        let mut errors = FieldErrors::default();
        errors.already_exists("email");
        assert_eq!(
            errors.get("email"),
            ["Email already exists; please use another."]
        );
    }
}
