use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "forum", about = "A small forum server")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long, global = true)]
    pub port: Option<u16>,

    /// Path to data directory
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the HTTP server (default)
    Serve,

    /// Create a user account
    AddUser {
        #[arg(long)]
        username: String,

        /// Display name shown next to posts and comments
        #[arg(long)]
        name: String,

        #[arg(long)]
        password: String,

        /// Generate a TOTP secret so the user can enter admin mode
        #[arg(long)]
        totp: bool,
    },
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
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
    pub totp_issuer: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
            cors_origins: vec![
                "http://localhost:5173".to_string(),
                "http://127.0.0.1:5173".to_string(),
            ],
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            cookie_name: "forum_session".to_string(),
            session_hours: 24,
            totp_issuer: "Forum".to_string(),
        }
    }
}

impl Config {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let data_dir = Self::data_dir(cli);
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
            config.database.path = Some(data_dir.join("forum.db"));
        }

        Ok(config)
    }

    pub fn data_dir(cli: &Cli) -> PathBuf {
        cli.data_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".forum")
        })
    }

    pub fn db_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from("forum.db"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli_with(data_dir: Option<PathBuf>) -> Cli {
        Cli {
            config: None,
            host: None,
            port: None,
            data_dir,
            command: None,
        }
    }

    #[test]
    fn default_config_has_expected_values() {
        let config = Config::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3001);
        assert_eq!(config.server.cors_origins.len(), 2);
        assert_eq!(config.auth.cookie_name, "forum_session");
        assert_eq!(config.auth.session_hours, 24);
        assert_eq!(config.auth.totp_issuer, "Forum");
        assert!(config.database.path.is_none());
    }

    #[test]
    fn data_dir_uses_cli_override() {
        let cli = cli_with(Some(PathBuf::from("/tmp/test-forum")));
        assert_eq!(Config::data_dir(&cli), PathBuf::from("/tmp/test-forum"));
    }

    #[test]
    fn data_dir_defaults_to_home_dot_forum() {
        let dir = Config::data_dir(&cli_with(None));
        assert!(dir.ends_with(".forum"));
    }

    #[test]
    fn load_with_no_config_file_uses_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::load(&cli_with(Some(tmp.path().to_path_buf()))).unwrap();
        assert_eq!(config.server.port, 3001);
        assert_eq!(config.db_path(), tmp.path().join("forum.db"));
    }

    #[test]
    fn load_reads_toml_file_and_cli_wins() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(
            &config_path,
            r#"
[server]
host = "0.0.0.0"
port = 9000
cors_origins = ["https://forum.example"]

[database]
path = "/var/lib/forum/forum.db"

[auth]
cookie_name = "sid"
session_hours = 2
"#,
        )
        .unwrap();

        let cli = Cli {
            config: Some(config_path),
            host: None,
            port: Some(4000),
            data_dir: Some(tmp.path().to_path_buf()),
            command: None,
        };
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.server.cors_origins, vec!["https://forum.example"]);
        assert_eq!(config.db_path(), PathBuf::from("/var/lib/forum/forum.db"));
        assert_eq!(config.auth.cookie_name, "sid");
        assert_eq!(config.auth.session_hours, 2);
        // Unset keys keep their defaults
        assert_eq!(config.auth.totp_issuer, "Forum");
    }

    #[test]
    fn add_user_subcommand_parses() {
        let cli = Cli::try_parse_from([
            "forum",
            "add-user",
            "--username",
            "alice",
            "--name",
            "Alice",
            "--password",
            "secret",
            "--totp",
        ])
        .unwrap();
        match cli.command {
            Some(Command::AddUser { username, totp, .. }) => {
                assert_eq!(username, "alice");
                assert!(totp);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
