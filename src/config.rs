// Recorder configuration.
//
// Read from the environment by the binary; tests build it directly or through `from_lookup`.

use std::net::SocketAddr;
use thiserror::Error;

pub const LISTEN_ADDR_VAR: &str = "RECORDER_LISTEN_ADDR";
pub const CHANNEL_CAPACITY_VAR: &str = "RECORDER_CHANNEL_CAPACITY";

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} has an invalid value {value:?}: {reason}")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecorderConfig {
    pub listen_addr: SocketAddr,
    /// Events queued between the receiver and the event log before receivers have to wait.
    pub channel_capacity: usize,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl RecorderConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let listen_addr = lookup(LISTEN_ADDR_VAR)
            .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());
        let listen_addr = listen_addr
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::InvalidValue {
                name: LISTEN_ADDR_VAR,
                value: listen_addr.clone(),
                reason: e.to_string(),
            })?;

        let channel_capacity = match lookup(CHANNEL_CAPACITY_VAR) {
            None => DEFAULT_CHANNEL_CAPACITY,
            Some(raw) => match raw.parse::<usize>() {
                Ok(0) => {
                    return Err(ConfigError::InvalidValue {
                        name: CHANNEL_CAPACITY_VAR,
                        value: raw,
                        reason: "must be greater than zero".into(),
                    });
                }
                Ok(capacity) => capacity,
                Err(e) => {
                    return Err(ConfigError::InvalidValue {
                        name: CHANNEL_CAPACITY_VAR,
                        value: raw,
                        reason: e.to_string(),
                    });
                }
            },
        };

        Ok(Self {
            listen_addr,
            channel_capacity,
        })
    }

    /// Loopback address with an OS-assigned port.
    pub fn ephemeral() -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            ..Self::default()
        }
    }
}
