//! Contains constants and other configuration information affecting default & fixed behaviors of this crate

use crate::error::{Error, Result};
use std::borrow::Cow;
use std::fs;
use std::path::Path;
use std::time::Duration;
use serde::{Deserialize, Serialize};


/// How many messages each participant may send -- also the number of replies the initiator
/// waits for before the exchange is considered complete
pub const MESSAGE_LIMIT: u32 = 10;

/// Ceiling, in milliseconds, for each wait on an in-process handoff channel
pub const POLL_TIMEOUT_MILLIS: u64 = 100;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16  = 8080;


/// Configuration for both exchange flavors:
///   - `host` & `port` identify the responder endpoint on the socket exchange;
///   - `message_limit` caps sent messages (and terminates the initiator);
///   - `poll_timeout_millis` bounds each wait in the in-process simulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    pub host:                Cow<'static, str>,
    pub port:                u16,
    pub message_limit:       u32,
    pub poll_timeout_millis: u64,
}

impl ExchangeConfig {

    /// Contains the fixed values of the exchange: `localhost:8080`, 10 messages, 100ms polls
    pub const fn default() -> ExchangeConfig {
        ExchangeConfig {
            host:                Cow::Borrowed(DEFAULT_HOST),
            port:                DEFAULT_PORT,
            message_limit:       MESSAGE_LIMIT,
            poll_timeout_millis: POLL_TIMEOUT_MILLIS,
        }
    }

    /// Parses a `.ron` document -- fields not present keep their [Self::default()] values.\
    /// Example: `(port: 9090, poll_timeout_millis: 50)`
    pub fn from_ron_str(ron_config: &str) -> std::result::Result<Self, ron::error::SpannedError> {
        ron::from_str(ron_config)
    }

    /// Same as [Self::from_ron_str()], reading the document from `path`
    pub fn from_ron_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|err| Error::Config { path: path.to_path_buf(), message: err.to_string() })?;
        Self::from_ron_str(&contents)
            .map_err(|err| Error::Config { path: path.to_path_buf(), message: err.to_string() })
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Cow::Owned(host.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// `host:port`, as accepted by `tokio::net` connect & bind functions
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_millis)
    }
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        ExchangeConfig::default()
    }
}


/// Unit tests & enforces the requisites of the [config](self) module
#[cfg(any(test,doc))]
mod tests {
    use super::*;

    #[cfg_attr(not(doc),test)]
    fn defaults_are_the_fixed_endpoint_and_limits() {
        let config = ExchangeConfig::default();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 8080);
        assert_eq!(config.message_limit, 10);
        assert_eq!(config.poll_timeout(), Duration::from_millis(100));
        assert_eq!(config.address(), "localhost:8080");
        assert_eq!(<ExchangeConfig as Default>::default(), config, "`Default` trait & const default() disagree");
    }

    #[cfg_attr(not(doc),test)]
    fn ron_overrides_only_the_given_fields() {
        let config = ExchangeConfig::from_ron_str("(port: 9191, poll_timeout_millis: 5)")
            .expect("RON config should be parsed");
        assert_eq!(config, ExchangeConfig { port: 9191, poll_timeout_millis: 5, ..ExchangeConfig::default() });

        let config = ExchangeConfig::from_ron_str(r#"(host: "127.0.0.1")"#)
            .expect("RON config should be parsed");
        assert_eq!(config.address(), "127.0.0.1:8080");
    }

    #[cfg_attr(not(doc),test)]
    fn bad_config_files_are_reported() {
        let missing = std::env::temp_dir().join("turn-messaging-no-such-config.ron");
        let result = ExchangeConfig::from_ron_file(&missing);
        assert!(matches!(result, Err(Error::Config { .. })), "a missing file should be a `Error::Config`, not {result:?}");

        let garbage = std::env::temp_dir().join(format!("turn-messaging-garbage-{}.ron", std::process::id()));
        fs::write(&garbage, "(port: \"not a number\")").expect("writing the temp file");
        let result = ExchangeConfig::from_ron_file(&garbage);
        let _ = fs::remove_file(&garbage);
        assert!(matches!(result, Err(Error::Config { .. })), "an unparsable file should be a `Error::Config`, not {result:?}");
    }

    #[cfg_attr(not(doc),test)]
    fn builders() {
        let config = ExchangeConfig::default().with_host("127.0.0.1").with_port(0);
        assert_eq!(config.address(), "127.0.0.1:0");
    }
}
