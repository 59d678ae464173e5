use std::net::SocketAddr;
use std::path::Path;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use url::Url;

use crate::CLIENT_NAME;

const CONFIG_NAME: &str = "config.toml";
const ENV_PREFIX: &str = "BANKLINK";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub db_file: String,
    pub listen_addr: String,
    pub plaid: Plaid,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Plaid {
    pub client_id: String,
    pub secret: String,
    pub env: String,
    pub redirect_uri: Option<String>,
    pub user_id: String,
    pub client_name: String,
}

impl Plaid {
    pub fn environment(&self) -> Result<plaid_link::Environment, ConfigError> {
        plaid_link::parse_environment(&self.env).ok_or_else(|| {
            ConfigError::Message(format!(
                "plaid.env must be one of sandbox, development, or production, got {:?}",
                self.env
            ))
        })
    }
}

impl Settings {
    /// Loads settings from defaults, then the config file, then `BANKLINK_`
    /// environment variables (`BANKLINK_PLAID__CLIENT_ID` sets
    /// `plaid.client_id`). Fails if required values are missing or invalid.
    pub fn new(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut s = Config::builder()
            .set_default("db_file", default_data_path())?
            .set_default("listen_addr", "127.0.0.1:5000")?
            .set_default("plaid.env", "production")?
            .set_default("plaid.user_id", "user-123")?
            .set_default("plaid.client_name", "Personal Finance Tracker")?;

        if let Some(path) = config_path {
            s = s.add_source(File::with_name(path));
        } else {
            s = s.add_source(File::with_name(&default_config_path()).required(false));
        }

        let settings: Settings = s
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;
        settings.validate()?;

        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.plaid.client_id.trim().is_empty() {
            return Err(ConfigError::Message(
                "plaid.client_id must not be empty".into(),
            ));
        }

        if self.plaid.secret.trim().is_empty() {
            return Err(ConfigError::Message("plaid.secret must not be empty".into()));
        }

        self.plaid.environment()?;

        if let Some(uri) = &self.plaid.redirect_uri {
            Url::parse(uri).map_err(|e| {
                ConfigError::Message(format!("plaid.redirect_uri {:?} is invalid: {}", uri, e))
            })?;
        }

        self.socket_addr()?;

        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.listen_addr.parse().map_err(|_| {
            ConfigError::Message(format!(
                "listen_addr {:?} is not a socket address",
                self.listen_addr
            ))
        })
    }

    /// A SQLite connection string for `db_file`, creating its parent
    /// directory when missing.
    pub fn database_uri(&self) -> std::io::Result<String> {
        if let Some(parent) = Path::new(&self.db_file).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        Ok(format!("sqlite://{}?mode=rwc", self.db_file))
    }
}

fn default_data_path() -> String {
    dirs::data_dir()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| std::env::temp_dir()))
        .join(CLIENT_NAME)
        .join(format!("{}.db", CLIENT_NAME))
        .display()
        .to_string()
}

pub(crate) fn default_config_path() -> String {
    dirs::config_dir()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| std::env::temp_dir()))
        .join(CLIENT_NAME)
        .join(CONFIG_NAME)
        .display()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> Settings {
        Settings {
            db_file: "banklink.db".into(),
            listen_addr: "127.0.0.1:5000".into(),
            plaid: Plaid {
                client_id: "client-id".into(),
                secret: "secret".into(),
                env: "sandbox".into(),
                redirect_uri: None,
                user_id: "user-123".into(),
                client_name: "Personal Finance Tracker".into(),
            },
        }
    }

    #[test]
    fn valid_settings() {
        assert!(settings().validate().is_ok());
    }

    #[test]
    fn rejects_invalid_settings() {
        let base = settings();
        let tests = vec![
            Settings {
                plaid: Plaid {
                    client_id: "".into(),
                    ..base.plaid.clone()
                },
                ..base.clone()
            },
            Settings {
                plaid: Plaid {
                    secret: "  ".into(),
                    ..base.plaid.clone()
                },
                ..base.clone()
            },
            Settings {
                plaid: Plaid {
                    env: "staging".into(),
                    ..base.plaid.clone()
                },
                ..base.clone()
            },
            Settings {
                plaid: Plaid {
                    redirect_uri: Some("not a url".into()),
                    ..base.plaid.clone()
                },
                ..base.clone()
            },
            Settings {
                listen_addr: "localhost".into(),
                ..base.clone()
            },
        ];

        for t in tests {
            assert!(t.validate().is_err(), "{:?}", t);
        }
    }

    #[test]
    fn loads_config_file() {
        let dir = std::env::temp_dir().join(format!("banklink-settings-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(
            &path,
            r#"
            db_file = "/tmp/banklink-test.db"

            [plaid]
            client_id = "file-client-id"
            secret = "file-secret"
            env = "sandbox"
            redirect_uri = "https://localhost:5000/oauth"
            "#,
        )
        .unwrap();

        let settings = Settings::new(path.to_str()).unwrap();

        assert_eq!(settings.plaid.client_id, "file-client-id");
        assert_eq!(settings.plaid.user_id, "user-123");
        assert_eq!(settings.listen_addr, "127.0.0.1:5000");
        assert!(matches!(
            settings.plaid.environment().unwrap(),
            plaid_link::Environment::Sandbox
        ));

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn database_uri_from_file() {
        let dir = std::env::temp_dir().join(format!("banklink-db-{}", std::process::id()));
        let s = Settings {
            db_file: dir.join("data.db").display().to_string(),
            ..settings()
        };

        let uri = s.database_uri().unwrap();

        assert_eq!(uri, format!("sqlite://{}?mode=rwc", s.db_file));
        assert!(dir.exists());
        std::fs::remove_dir_all(dir).unwrap();
    }
}
