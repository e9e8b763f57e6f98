//! Configuration management for the transaction webhook receiver.

use std::{env, fmt, net::SocketAddr, str::FromStr, time::Duration};

use anyhow::{Context, Result};
use axum::http::HeaderName;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};

use crate::{crypto::HmacVerifier, IngestSettings};

const CONFIG_FILE: &str = "config.toml";

/// Variables read byte-for-byte instead of through figment's value parsing,
/// which would turn `1234567890` or `true` into non-string values.
const VERBATIM_VARS: &[&str] = &["DATABASE_URL", "SHOPIFY_WEBHOOK_SECRET"];

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development; the connection string decides TLS.
    #[default]
    Development,
    /// Production; database connections require TLS.
    #[serde(alias = "prod")]
    Production,
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
        }
    }
}

/// Complete service configuration with defaults, file, and environment
/// overrides.
///
/// Configuration is loaded in priority order:
/// 1. Environment variables (highest priority)
/// 2. Configuration file (`config.toml`)
/// 3. Built-in defaults (lowest priority)
///
/// `DATABASE_URL` has no usable default and must be provided. The webhook
/// secret is optional at load time so the process can start and report the
/// fault; every webhook is then answered with 500.
///
/// # Example
///
/// ```no_run
/// use txhook_api::Config;
///
/// let config = Config::load().expect("Failed to load configuration");
///
/// println!("Server will bind to {}:{}", config.host, config.port);
/// ```
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    // Database
    /// PostgreSQL connection URL.
    ///
    /// Environment variable: `DATABASE_URL`
    #[serde(default)]
    pub database_url: String,
    /// Maximum number of database connections in the pool.
    ///
    /// Environment variable: `DATABASE_MAX_CONNECTIONS`
    #[serde(default = "default_max_connections")]
    pub database_max_connections: u32,
    /// Minimum number of connections to maintain in the pool.
    ///
    /// Environment variable: `DATABASE_MIN_CONNECTIONS`
    #[serde(default)]
    pub database_min_connections: u32,
    /// Seconds to wait for a pooled connection before failing the request.
    ///
    /// Environment variable: `DATABASE_CONNECTION_TIMEOUT`
    #[serde(default = "default_acquire_timeout")]
    pub database_connection_timeout: u64,
    /// Database connection idle timeout in seconds.
    ///
    /// Environment variable: `DATABASE_IDLE_TIMEOUT`
    #[serde(default = "default_idle_timeout")]
    pub database_idle_timeout: u64,

    // Server
    /// Server bind address.
    ///
    /// Environment variable: `HOST`
    #[serde(default = "default_host")]
    pub host: String,
    /// Server bind port.
    ///
    /// Environment variable: `PORT`
    #[serde(default = "default_port")]
    pub port: u16,
    /// HTTP request timeout in seconds.
    ///
    /// Environment variable: `REQUEST_TIMEOUT`
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
    /// Largest accepted webhook body in bytes.
    ///
    /// Environment variable: `MAX_PAYLOAD_BYTES`
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: usize,

    // Webhooks
    /// Shared secret used to verify webhook signatures.
    ///
    /// Environment variable: `SHOPIFY_WEBHOOK_SECRET`
    #[serde(default, skip_serializing)]
    pub shopify_webhook_secret: Option<String>,
    /// Header carrying the base64 HMAC-SHA256 signature.
    ///
    /// Environment variable: `SIGNATURE_HEADER`
    #[serde(default = "default_signature_header")]
    pub signature_header: String,

    /// Deployment environment.
    ///
    /// Environment variable: `APP_ENV`
    #[serde(default)]
    pub app_env: Environment,
}

impl Config {
    /// Load configuration from defaults, config file, and environment variable
    /// overrides, then validate it.
    ///
    /// # Errors
    ///
    /// Returns error if a source cannot be parsed or validation fails.
    pub fn load() -> Result<Self> {
        let mut figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::raw().ignore(VERBATIM_VARS));

        for var in VERBATIM_VARS {
            if let Ok(value) = env::var(var) {
                figment = figment.merge((var.to_ascii_lowercase(), value));
            }
        }

        let config: Self = figment.extract().context("Failed to load configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Parse server socket address from host and port configuration.
    ///
    /// # Errors
    ///
    /// Returns error if host and port do not form a socket address.
    pub fn parse_server_addr(&self) -> Result<SocketAddr> {
        let addr_str = format!("{}:{}", self.host, self.port);
        SocketAddr::from_str(&addr_str).context("Invalid server address")
    }

    /// Get database URL with password masked for logging.
    pub fn database_url_masked(&self) -> String {
        if let Some(at_pos) = self.database_url.rfind('@') {
            if let Some(colon_pos) = self.database_url[..at_pos].rfind(':') {
                // Skip the scheme separator in `postgresql://host@...`.
                if !self.database_url[colon_pos..].starts_with("://") {
                    let mut masked = self.database_url.clone();
                    masked.replace_range(colon_pos + 1..at_pos, "***");
                    return masked;
                }
            }
        }
        self.database_url.clone()
    }

    /// Connection options for the database, with TLS required in
    /// production.
    ///
    /// # Errors
    ///
    /// Returns error if `DATABASE_URL` cannot be parsed.
    pub fn connect_options(&self) -> Result<PgConnectOptions> {
        let options =
            PgConnectOptions::from_str(&self.database_url).context("Invalid DATABASE_URL")?;

        Ok(match self.app_env {
            Environment::Production => options.ssl_mode(PgSslMode::Require),
            Environment::Development => options,
        })
    }

    /// Pool sizing and timeouts.
    pub fn pool_options(&self) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(self.database_max_connections)
            .min_connections(self.database_min_connections)
            .acquire_timeout(Duration::from_secs(self.database_connection_timeout))
            .idle_timeout(Duration::from_secs(self.database_idle_timeout))
    }

    /// Builds the signature verifier from the configured secret.
    pub fn verifier(&self) -> HmacVerifier {
        HmacVerifier::from_optional(self.shopify_webhook_secret.clone())
    }

    /// Request-path settings shared with the handlers.
    ///
    /// # Errors
    ///
    /// Returns error if the signature header is not a valid header name.
    pub fn ingest_settings(&self) -> Result<IngestSettings> {
        let signature_header = HeaderName::from_str(&self.signature_header.to_ascii_lowercase())
            .context("Invalid SIGNATURE_HEADER")?;

        Ok(IngestSettings {
            signature_header,
            max_payload_bytes: self.max_payload_bytes,
            request_timeout: Duration::from_secs(self.request_timeout),
        })
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns error describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        if self.database_url.trim().is_empty() {
            anyhow::bail!("DATABASE_URL must be set");
        }

        if self.port == 0 {
            anyhow::bail!("port must be greater than 0");
        }

        if self.database_max_connections == 0 {
            anyhow::bail!("database max_connections must be greater than 0");
        }

        if self.database_min_connections > self.database_max_connections {
            anyhow::bail!("database min_connections cannot exceed max_connections");
        }

        if self.request_timeout == 0 {
            anyhow::bail!("request_timeout must be greater than 0");
        }

        if self.max_payload_bytes == 0 {
            anyhow::bail!("max_payload_bytes must be greater than 0");
        }

        self.ingest_settings()?;

        Ok(())
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &self.database_url_masked())
            .field("database_max_connections", &self.database_max_connections)
            .field("database_min_connections", &self.database_min_connections)
            .field("database_connection_timeout", &self.database_connection_timeout)
            .field("database_idle_timeout", &self.database_idle_timeout)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("request_timeout", &self.request_timeout)
            .field("max_payload_bytes", &self.max_payload_bytes)
            .field(
                "shopify_webhook_secret",
                &self.shopify_webhook_secret.as_ref().map(|_| "[redacted]"),
            )
            .field("signature_header", &self.signature_header)
            .field("app_env", &self.app_env)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            database_max_connections: default_max_connections(),
            database_min_connections: 0,
            database_connection_timeout: default_acquire_timeout(),
            database_idle_timeout: default_idle_timeout(),
            host: default_host(),
            port: default_port(),
            request_timeout: default_request_timeout(),
            max_payload_bytes: default_max_payload_bytes(),
            shopify_webhook_secret: None,
            signature_header: default_signature_header(),
            app_env: Environment::default(),
        }
    }
}

fn default_max_connections() -> u32 {
    5
}

fn default_acquire_timeout() -> u64 {
    2
}

fn default_idle_timeout() -> u64 {
    300
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_request_timeout() -> u64 {
    30
}

fn default_max_payload_bytes() -> usize {
    1024 * 1024
}

fn default_signature_header() -> String {
    "X-Shopify-Hmac-Sha256".to_string()
}
