use std::net::SocketAddr;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Minimum length of the session-signing secret, in bytes.
pub const MIN_SECRET_LEN: usize = 32;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://quill.db";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// SQLite connection string, e.g. `sqlite://quill.db`.
    pub database_url: String,
    /// Keys the digest under which session tokens are stored.
    pub secret_key: Option<String>,
    pub session_ttl_hours: i64,
}

/// Optional settings read from a TOML file. Every key may be omitted.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database_url: Option<String>,
    pub secret_key: Option<String>,
    pub session_ttl_hours: Option<i64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| Error::Config(format!("invalid config file: {e}")))
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> std::result::Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    /// Layers file settings over the current values.
    #[must_use]
    pub fn with_file(mut self, file: FileConfig) -> Self {
        if let Some(host) = file.host {
            self.host = host;
        }
        if let Some(port) = file.port {
            self.port = port;
        }
        if let Some(url) = file.database_url {
            self.database_url = url;
        }
        if file.secret_key.is_some() {
            self.secret_key = file.secret_key;
        }
        if let Some(ttl) = file.session_ttl_hours {
            self.session_ttl_hours = ttl;
        }
        self
    }

    /// Layers `DATABASE_URL`, `SECRET_KEY`, `QUILL_HOST` and `QUILL_PORT` over the current values.
    pub fn with_env(self) -> Result<Self> {
        self.with_env_from(|key| std::env::var(key).ok())
    }

    pub fn with_env_from<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DATABASE_URL") {
            self.database_url = url;
        }
        if let Some(secret) = lookup("SECRET_KEY") {
            self.secret_key = Some(secret);
        }
        if let Some(host) = lookup("QUILL_HOST") {
            self.host = host;
        }
        if let Some(port) = lookup("QUILL_PORT") {
            self.port = port
                .parse()
                .map_err(|_| Error::Config(format!("QUILL_PORT '{port}' is not a valid port")))?;
        }
        Ok(self)
    }

    /// Returns the session secret, rejecting a missing or short one.
    pub fn require_secret(&self) -> Result<&str> {
        let secret = self
            .secret_key
            .as_deref()
            .ok_or_else(|| Error::Config("SECRET_KEY is not set".to_string()))?;

        if secret.len() < MIN_SECRET_LEN {
            return Err(Error::Config(format!(
                "SECRET_KEY must be at least {MIN_SECRET_LEN} bytes"
            )));
        }
        if self.session_ttl_hours <= 0 {
            return Err(Error::Config(
                "session_ttl_hours must be positive".to_string(),
            ));
        }
        Ok(secret)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            secret_key: None,
            session_ttl_hours: 24 * 7,
        }
    }
}
