use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "microblog", about = "A small microblogging web application")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Path to data directory
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub feed: FeedConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Base URL used when building links that leave the site (reset emails).
    pub public_url: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AuthConfig {
    pub cookie_name: String,
    pub session_hours: u64,
    pub reset_token_minutes: u64,
    pub bcrypt_cost: u32,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct FeedConfig {
    pub posts_per_page: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            public_url: None,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            cookie_name: "microblog_session".to_string(),
            session_hours: 720,
            reset_token_minutes: 10,
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self { posts_per_page: 3 }
    }
}

impl Config {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let data_dir = Self::data_dir(cli)?;
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| data_dir.join("config.toml"));

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Config::default()
        };

        // CLI overrides
        if let Some(ref host) = cli.host {
            config.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            config.server.port = port;
        }

        if config.database.path.is_none() {
            config.database.path = Some(data_dir.join("microblog.db"));
        }
        if config.feed.posts_per_page < 1 {
            anyhow::bail!("feed.posts_per_page must be at least 1");
        }

        Ok(config)
    }

    pub fn data_dir(cli: &Cli) -> anyhow::Result<PathBuf> {
        match cli.data_dir.clone() {
            Some(dir) => Ok(dir),
            None => dirs::home_dir()
                .map(|home| home.join(".microblog"))
                .ok_or_else(|| anyhow::anyhow!("Could not determine home directory")),
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from("microblog.db"))
    }

    /// Root URL for absolute links, without a trailing slash.
    pub fn base_url(&self) -> String {
        match &self.server.public_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("http://{}:{}", self.server.host, self.server.port),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli_with(data_dir: PathBuf) -> Cli {
        Cli {
            config: None,
            host: None,
            port: None,
            data_dir: Some(data_dir),
        }
    }

    #[test]
    fn default_config_has_expected_values() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.auth.cookie_name, "microblog_session");
        assert_eq!(config.auth.session_hours, 720);
        assert_eq!(config.auth.reset_token_minutes, 10);
        assert_eq!(config.feed.posts_per_page, 3);
        assert!(config.database.path.is_none());
    }

    #[test]
    fn data_dir_uses_cli_override() {
        let cli = cli_with(PathBuf::from("/tmp/test-microblog"));
        assert_eq!(
            Config::data_dir(&cli).unwrap(),
            PathBuf::from("/tmp/test-microblog")
        );
    }

    #[test]
    fn load_with_no_config_file_uses_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::load(&cli_with(tmp.path().to_path_buf())).unwrap();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.db_path(), tmp.path().join("microblog.db"));
    }

    #[test]
    fn load_reads_toml_file_and_cli_wins() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(
            &config_path,
            r#"
[server]
host = "192.168.1.1"
port = 9000
public_url = "https://blog.example.com/"

[auth]
session_hours = 24

[feed]
posts_per_page = 10
"#,
        )
        .unwrap();

        let cli = Cli {
            config: Some(config_path),
            host: None,
            port: Some(4000),
            data_dir: Some(tmp.path().to_path_buf()),
        };
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.server.host, "192.168.1.1");
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.auth.session_hours, 24);
        assert_eq!(config.auth.cookie_name, "microblog_session");
        assert_eq!(config.feed.posts_per_page, 10);
        assert_eq!(config.base_url(), "https://blog.example.com");
    }

    #[test]
    fn load_rejects_zero_page_size() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(&config_path, "[feed]\nposts_per_page = 0\n").unwrap();

        let cli = Cli {
            config: Some(config_path),
            host: None,
            port: None,
            data_dir: Some(tmp.path().to_path_buf()),
        };
        assert!(Config::load(&cli).is_err());
    }

    #[test]
    fn base_url_falls_back_to_bind_address() {
        let config = Config::default();
        assert_eq!(config.base_url(), "http://0.0.0.0:5000");
    }
}
