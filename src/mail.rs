use crate::config::Config;
use crate::db::models::User;

/// The outgoing password reset message.
#[derive(Debug, Clone)]
pub struct ResetEmail {
    pub to: String,
    pub subject: String,
    pub link: String,
}

impl ResetEmail {
    pub fn new(config: &Config, user: &User, token: &str) -> Self {
        ResetEmail {
            to: user.email.clone(),
            subject: "[Microblog] Reset Your Password".to_string(),
            link: format!("{}/reset_password/{}", config.base_url(), token),
        }
    }

    pub fn body(&self, username: &str) -> String {
        format!(
            "Dear {},\n\nTo reset your password click on the following link:\n\n{}\n\n\
             If you have not requested a password reset simply ignore this message.\n",
            username, self.link
        )
    }
}

/// Hand the reset message to the delivery channel. There is no SMTP
/// transport; the message goes to the log for the operator to relay.
pub fn send_password_reset_email(config: &Config, user: &User, token: &str) -> ResetEmail {
    let email = ResetEmail::new(config, user, token);
    tracing::info!(
        to = %email.to,
        subject = %email.subject,
        link = %email.link,
        "Password reset email"
    );
    tracing::debug!("{}", email.body(&user.username));
    email
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_link_points_at_public_url() {
        let mut config = Config::default();
        config.server.public_url = Some("https://blog.example.com/".into());
        let user = User {
            id: 1,
            username: "susan".into(),
            email: "susan@example.com".into(),
            password_hash: None,
            about_me: None,
            last_seen: None,
        };

        let email = send_password_reset_email(&config, &user, "abc123");
        assert_eq!(email.to, "susan@example.com");
        assert_eq!(email.link, "https://blog.example.com/reset_password/abc123");
        assert!(email.body("susan").contains("Dear susan"));
    }
}
