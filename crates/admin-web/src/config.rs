//! Configuration loaded from environment variables.

use std::env;
use std::net::SocketAddr;

/// Admin backend configuration.
#[derive(Clone)]
pub struct Config {
    /// Server bind address.
    pub addr: SocketAddr,
    /// SQLite database URL.
    pub database_url: String,
    /// Base URL of the auth provider (`{url}/auth/v1/...`).
    pub auth_url: String,
    /// Public API key sent as `apikey` to the auth provider.
    pub auth_anon_key: String,
    /// Shared secret expected in `x-webhook-signature`.
    pub webhook_secret: Option<String>,
    /// Token for the webhook `hub.verify_token` handshake.
    pub webhook_verify_token: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `ADMIN_ADDR` | Server bind address | `127.0.0.1:8788` |
    /// | `DATABASE_URL` | SQLite database URL | `sqlite:bargainb.db?mode=rwc` |
    /// | `SUPABASE_URL` | Auth provider base URL | (required) |
    /// | `SUPABASE_ANON_KEY` | Auth provider public key | (required) |
    /// | `WASENDER_WEBHOOK_SECRET` | Webhook shared secret | unset |
    /// | `WASENDER_VERIFY_TOKEN` | Webhook verify token | unset |
    ///
    /// WASender and agent runtime settings are read by their own clients.
    pub fn from_env() -> Result<Self, ConfigError> {
        let addr = env::var("ADMIN_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8788".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidAddr)?;

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite:bargainb.db?mode=rwc".to_string());

        let auth_url = required("SUPABASE_URL")?;
        let auth_anon_key = required("SUPABASE_ANON_KEY")?;

        Ok(Self {
            addr,
            database_url,
            auth_url: auth_url.trim_end_matches('/').to_string(),
            auth_anon_key,
            webhook_secret: optional("WASENDER_WEBHOOK_SECRET"),
            webhook_verify_token: optional("WASENDER_VERIFY_TOKEN"),
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    optional(name).ok_or(ConfigError::Missing(name))
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("addr", &self.addr)
            .field("database_url", &self.database_url)
            .field("auth_url", &self.auth_url)
            .field("webhook_secret", &self.webhook_secret.as_ref().map(|_| "[redacted]"))
            .field("webhook_verify_token", &self.webhook_verify_token.is_some())
            .finish()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid ADMIN_ADDR format")]
    InvalidAddr,

    #[error("{0} environment variable is required")]
    Missing(&'static str),
}
