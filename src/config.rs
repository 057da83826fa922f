/// Configuration Module
///
/// Configuration for the snippets: connection string resolution plus the
/// optional driver settings (timeouts, pool bounds, TLS material, logging,
/// transaction write concern, OIDC authentication, search index polling).

use crate::core::db::search_index::PollPolicy;
use crate::core::{Result, SnippetError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Environment variable consulted for the connection string by default.
pub const DEFAULT_URI_ENV: &str = "MONGODB_URI";

static URI_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^mongodb(\+srv)?://\S+$").expect("valid URI pattern"));

static CREDENTIALS_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"://[^@/?]+@").expect("valid credentials pattern"));

/// Top-level configuration structure parsed from a TOML file.
///
/// Every section is optional; an empty file is a valid configuration as long
/// as a connection string arrives from the command line or environment.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub connection: ConnectionConfig,
    pub pool: Option<PoolConfig>,
    pub tls: Option<TlsConfig>,
    pub logging: LoggingConfig,
    pub transaction: TransactionConfig,
    pub auth: Option<AuthConfig>,
    pub search: SearchConfig,
}

/// Connection string and cluster settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Environment variable holding the connection string
    pub uri_env: String,
    /// Fallback connection string when neither flag nor environment provide one
    pub uri: Option<String>,
    pub app_name: Option<String>,
    /// Wall-clock bound on acquiring the connection; `0` means unbounded
    pub connect_deadline_secs: Option<u64>,
    pub server_selection_timeout_ms: Option<u64>,
    pub local_threshold_ms: Option<u64>,
    pub connect_timeout_ms: Option<u64>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        ConnectionConfig {
            uri_env: DEFAULT_URI_ENV.to_string(),
            uri: None,
            app_name: None,
            connect_deadline_secs: None,
            server_selection_timeout_ms: None,
            local_threshold_ms: None,
            connect_timeout_ms: None,
        }
    }
}

impl ConnectionConfig {
    pub fn connect_deadline(&self) -> Option<Duration> {
        match self.connect_deadline_secs {
            None | Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
        }
    }
}

/// Connection pool bounds.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub min_pool_size: Option<u32>,
    pub max_pool_size: Option<u32>,
    pub max_idle_time_ms: Option<u64>,
}

/// TLS material. The client certificate and its private key live in one PEM file.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct TlsConfig {
    pub ca_file: Option<PathBuf>,
    pub cert_key_file: Option<PathBuf>,
    pub allow_invalid_certificates: bool,
}

/// Logging configuration: process level plus per-component driver levels.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Truncation length for documents embedded in driver log events
    pub max_document_length: Option<usize>,
    /// Component name (`command`, `connection`, `server_selection`, `topology`) to level
    pub components: BTreeMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
            max_document_length: None,
            components: BTreeMap::new(),
        }
    }
}

/// Transaction settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TransactionConfig {
    pub write_concern: String,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        TransactionConfig {
            write_concern: "majority".to_string(),
        }
    }
}

/// External identity provider authentication.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub mechanism: String,
    /// File the machine callback reads the access token from
    pub token_file: Option<PathBuf>,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

/// Search index readiness polling.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub poll_interval_secs: u64,
    /// `0` waits indefinitely
    pub poll_timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            poll_interval_secs: 5,
            poll_timeout_secs: 600,
        }
    }
}

impl SearchConfig {
    pub fn poll_policy(&self) -> PollPolicy {
        let timeout = match self.poll_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        PollPolicy::new(Duration::from_secs(self.poll_interval_secs), timeout)
    }
}

/// Parsed `[transaction].write_concern` value.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteConcernSetting {
    Majority,
    Nodes(u32),
    Tag(String),
}

impl FromStr for WriteConcernSetting {
    type Err = SnippetError;

    fn from_str(value: &str) -> Result<Self> {
        let value = value.trim();
        if value.is_empty() {
            return Err(SnippetError::Config(
                "write_concern must not be empty".to_string(),
            ));
        }
        if value.eq_ignore_ascii_case("majority") {
            return Ok(WriteConcernSetting::Majority);
        }
        match value.parse::<u32>() {
            Ok(nodes) => Ok(WriteConcernSetting::Nodes(nodes)),
            Err(_) => Ok(WriteConcernSetting::Tag(value.to_string())),
        }
    }
}

impl Config {
    /// Parses a configuration from TOML text and validates it.
    pub fn from_toml_str(content: &str) -> Result<Config> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads the configuration.
    ///
    /// An explicit path must exist. Without one, the default path is used when
    /// present, and defaults otherwise.
    pub fn load(explicit: Option<&Path>) -> Result<Config> {
        match explicit {
            Some(path) => load_config(path),
            None => match default_config_path() {
                Some(path) if path.exists() => load_config(path),
                _ => Ok(Config::default()),
            },
        }
    }

    /// Checks cross-field constraints the TOML schema cannot express.
    pub fn validate(&self) -> Result<()> {
        if let Some(uri) = &self.connection.uri {
            validate_uri(uri)?;
        }

        if let Some(pool) = &self.pool {
            if let (Some(min), Some(max)) = (pool.min_pool_size, pool.max_pool_size) {
                if min > max {
                    return Err(SnippetError::Config(format!(
                        "min_pool_size ({}) exceeds max_pool_size ({})",
                        min, max
                    )));
                }
            }
        }

        self.transaction.write_concern.parse::<WriteConcernSetting>()?;

        for name in self.logging.components.keys() {
            name.parse::<crate::logging::LogComponent>()?;
        }

        if let Some(auth) = &self.auth {
            if auth.mechanism != "MONGODB-OIDC" {
                return Err(SnippetError::Config(format!(
                    "unsupported auth mechanism '{}'; only MONGODB-OIDC is configurable",
                    auth.mechanism
                )));
            }
            if auth.token_file.is_some() && auth.properties.contains_key("ENVIRONMENT") {
                return Err(SnippetError::Config(
                    "ENVIRONMENT cannot be combined with a token_file callback".to_string(),
                ));
            }
        }

        if self.search.poll_interval_secs == 0 {
            return Err(SnippetError::Config(
                "poll_interval_secs must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Resolves the connection string.
    ///
    /// Precedence: explicit flag, then the `uri_env` environment variable, then
    /// `[connection].uri`. Empty values count as absent. No connection string
    /// at all is a fatal configuration error.
    pub fn resolve_uri(&self, flag: Option<&str>) -> Result<String> {
        let from_env = std::env::var(&self.connection.uri_env).ok();
        let candidate = [flag.map(str::to_string), from_env, self.connection.uri.clone()]
            .into_iter()
            .flatten()
            .map(|uri| uri.trim().to_string())
            .find(|uri| !uri.is_empty());

        match candidate {
            Some(uri) => {
                validate_uri(&uri)?;
                Ok(uri)
            }
            None => Err(SnippetError::Config(format!(
                "You must set your '{}' environment variable or pass --uri",
                self.connection.uri_env
            ))),
        }
    }
}

/// Loads configuration from a TOML file at the given path.
///
/// # Example
///
/// ```no_run
/// let config = driver_snippets::config::load_config("config.toml").expect("Failed to load config");
/// println!("{:?}", config);
/// ```
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = fs::read_to_string(path)?;
    Config::from_toml_str(&content)
}

/// `<config dir>/driver-snippets/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("driver-snippets").join("config.toml"))
}

/// Rejects connection strings without a `mongodb://` or `mongodb+srv://` scheme.
pub fn validate_uri(uri: &str) -> Result<()> {
    if URI_PATTERN.is_match(uri) {
        Ok(())
    } else {
        Err(SnippetError::Config(format!(
            "connection string must start with mongodb:// or mongodb+srv://, got '{}'",
            redact_uri(uri)
        )))
    }
}

/// Masks the `user:password@` portion of a connection string for logging.
pub fn redact_uri(uri: &str) -> String {
    CREDENTIALS_PATTERN
        .replace(uri, "://<credentials>@")
        .into_owned()
}
