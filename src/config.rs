//! Client configuration: connection target, credentials, and timing knobs, loadable from TOML or
//! built fluently in code, mirroring the house's own `Config`/`Args` split
//! (`titanirc-server/src/config.rs`'s `serde::Deserialize` struct plus its binary's CLI overlay).

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 5038;
const DEFAULT_PING_DELAY: Duration = Duration::from_secs(5);
const DEFAULT_RECONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_RECONNECT_TIMEOUT_INCREASE: Duration = Duration::ZERO;
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_LOG: &str = "info";

/// The client's full configuration: connection target, credentials, the reconnect/keepalive
/// timing knobs, and the ambient `connect_timeout` and `log` filter directive.
///
/// A banner callback has no field here: a callback isn't TOML-representable, so it's wired up
/// instead via [`crate::client::Client::with_banner_callback`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub secret: String,
    #[serde(with = "serde_humantime")]
    pub ping_delay: Duration,
    #[serde(with = "serde_humantime")]
    pub reconnect_timeout: Duration,
    #[serde(with = "serde_humantime")]
    pub reconnect_timeout_increase: Duration,
    #[serde(with = "serde_humantime")]
    pub connect_timeout: Duration,
    /// A `tracing_subscriber::EnvFilter` directive string. The demo binary is the only consumer
    /// of this field: the library itself never installs a global subscriber.
    pub log: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            username: String::new(),
            secret: String::new(),
            ping_delay: DEFAULT_PING_DELAY,
            reconnect_timeout: DEFAULT_RECONNECT_TIMEOUT,
            reconnect_timeout_increase: DEFAULT_RECONNECT_TIMEOUT_INCREASE,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            log: DEFAULT_LOG.to_string(),
        }
    }
}

impl ClientConfig {
    #[must_use]
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    #[must_use]
    pub fn ping_enabled(&self) -> bool {
        self.ping_delay > Duration::ZERO
    }

    /// A `reconnect_timeout` of zero means the client gives up and returns an error instead of
    /// retrying the connection.
    #[must_use]
    pub fn reconnect_enabled(&self) -> bool {
        self.reconnect_timeout > Duration::ZERO
    }

    /// Reads and parses a TOML config file, matching the house binary's own
    /// `std::fs::read` + `toml::from_str` load path in `titanirc-server/src/main.rs`.
    pub fn from_toml_file(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|source| std::io::Error::new(std::io::ErrorKind::InvalidData, source))
    }
}

/// Fluent, code-first alternative to a TOML file.
#[derive(Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    #[must_use]
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.config.username = username.into();
        self
    }

    #[must_use]
    pub fn secret(mut self, secret: impl Into<String>) -> Self {
        self.config.secret = secret.into();
        self
    }

    #[must_use]
    pub fn ping_delay(mut self, delay: Duration) -> Self {
        self.config.ping_delay = delay;
        self
    }

    #[must_use]
    pub fn reconnect_timeout(mut self, timeout: Duration) -> Self {
        self.config.reconnect_timeout = timeout;
        self
    }

    #[must_use]
    pub fn reconnect_timeout_increase(mut self, increase: Duration) -> Self {
        self.config.reconnect_timeout_increase = increase;
        self
    }

    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    #[must_use]
    pub fn log(mut self, filter: impl Into<String>) -> Self {
        self.config.log = filter.into();
        self
    }

    #[must_use]
    pub fn build(self) -> ClientConfig {
        self.config
    }
}
