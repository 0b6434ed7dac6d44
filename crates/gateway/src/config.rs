//! Gateway configuration.
//!
//! A [`Config`] value is handed to the dispatcher builder; nothing here is process-wide, so
//! several gateways with different settings can live in one process (and in one test binary).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Run mode of the gateway.
///
/// `Debug` lowers the log level to DEBUG and makes the access log dump every request and
/// response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    #[default]
    Debug,
    Release,
}

impl RunMode {
    #[inline]
    pub fn is_debug(self) -> bool {
        matches!(self, RunMode::Debug)
    }
}

#[derive(Debug, Error)]
#[error("unknown run mode '{0}', expect 'debug' or 'release'")]
pub struct ParseRunModeError(String);

impl FromStr for RunMode {
    type Err = ParseRunModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(RunMode::Debug),
            "release" => Ok(RunMode::Release),
            _ => Err(ParseRunModeError(s.to_owned())),
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::Debug => f.write_str("debug"),
            RunMode::Release => f.write_str("release"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub mode: RunMode,
    /// Upper bound on idle contexts the pool keeps around; demand beyond it allocates.
    pub max_idle_contexts: usize,
    /// Request body limit enforced by the transport.
    pub max_body_size: usize,
    /// Seconds granted to in-flight connections once shutdown starts.
    pub shutdown_timeout_secs: u64,
}

impl Config {
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: RunMode::default(),
            max_idle_contexts: 1024,
            max_body_size: micro_gateway_http::codec::DEFAULT_MAX_BODY_SIZE,
            shutdown_timeout_secs: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_mode() {
        assert_eq!("debug".parse::<RunMode>().unwrap(), RunMode::Debug);
        assert_eq!(" Release ".parse::<RunMode>().unwrap(), RunMode::Release);
        assert!("verbose".parse::<RunMode>().is_err());
        assert_eq!(RunMode::Release.to_string(), "release");
    }

    #[test]
    fn test_deserialize_partial_config() {
        let config: Config = serde_json::from_str(r#"{"mode":"release","shutdown_timeout_secs":5}"#).unwrap();

        assert_eq!(config.mode, RunMode::Release);
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(5));
        assert_eq!(config.max_idle_contexts, 1024);
        assert_eq!(config.max_body_size, 4 * 1024 * 1024);
    }
}
