use config::{Config, ConfigError, Environment, File, FileFormat};
use secrecy::Secret;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub tls: TlsConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct TlsConfig {
    pub enabled: bool,
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
}

/// Which `Datastore` implementation backs the API.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Sqlite,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    pub backend: StoreBackend,
    /// Database file, used by the sqlite backend.
    pub path: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UserCredentials {
    pub username: String,
    pub password: Secret<String>,
}

/// A long-lived API token that logs in as `username`.
#[derive(Debug, Deserialize, Clone)]
pub struct ApiToken {
    pub token: Secret<String>,
    pub username: String,
}

/// Who may log in. Empty by default; the server refuses to start until at
/// least one user or API token is configured.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AuthConfig {
    pub users: Vec<UserCredentials>,
    pub api_tokens: Vec<ApiToken>,
    pub session_ttl_secs: u64,
    pub cookie_name: String,
}

impl AuthConfig {
    pub fn with_user(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.users.push(UserCredentials {
            username: username.into(),
            password: Secret::new(password.into()),
        });
        self
    }

    pub fn with_api_token(mut self, token: impl Into<String>, username: impl Into<String>) -> Self {
        self.api_tokens.push(ApiToken {
            token: Secret::new(token.into()),
            username: username.into(),
        });
        self
    }

    /// True when nobody could ever log in.
    pub fn is_empty(&self) -> bool {
        self.users.is_empty() && self.api_tokens.is_empty()
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct LoggingConfig {
    pub json: bool,
}

impl AppConfig {
    /// Load configuration from an optional JSON file, then `TO__*` environment overrides.
    ///
    /// Without a file, `config/default` is read when present. Anything left
    /// unset falls back to the built-in defaults.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let builder = match path {
            Some(path) => Config::builder().add_source(File::new(path, FileFormat::Json)),
            None => Config::builder().add_source(File::with_name("config/default").required(false)),
        };

        let s = builder
            // Map TO__SERVER__PORT=8443 to server.port
            .add_source(Environment::with_prefix("TO").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8443,
            tls: TlsConfig::default(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            users: Vec::new(),
            api_tokens: Vec::new(),
            session_ttl_secs: 3600,
            cookie_name: "mojolicious".into(),
        }
    }
}
