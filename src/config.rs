use crate::error::{RegistryError, Result};
use std::net::SocketAddr;
use std::time::Duration;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_HEARTBEAT_SECS: u64 = 30;

/// Server configuration parsed from environment variables.
///
/// Optional:
///   DEVICE_REGISTRY_HOST           — bind address, defaults to "0.0.0.0"
///   DEVICE_REGISTRY_PORT           — listening port, defaults to 3000
///   DEVICE_REGISTRY_HEARTBEAT_SECS — WebSocket ping interval, defaults to 30
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub heartbeat_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            heartbeat_secs: DEFAULT_HEARTBEAT_SECS,
        }
    }
}

impl ServerConfig {
    /// Parse configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let host = std::env::var("DEVICE_REGISTRY_HOST").unwrap_or_else(|_| DEFAULT_HOST.into());

        let port = match std::env::var("DEVICE_REGISTRY_PORT") {
            Ok(raw) => raw.parse::<u16>().map_err(|_| {
                RegistryError::InvalidInput(format!("Invalid DEVICE_REGISTRY_PORT: {}", raw))
            })?,
            Err(_) => DEFAULT_PORT,
        };

        let heartbeat_secs = match std::env::var("DEVICE_REGISTRY_HEARTBEAT_SECS") {
            Ok(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    return Err(RegistryError::InvalidInput(format!(
                        "Invalid DEVICE_REGISTRY_HEARTBEAT_SECS: {}",
                        raw
                    )))
                },
            },
            Err(_) => DEFAULT_HEARTBEAT_SECS,
        };

        Ok(Self {
            host,
            port,
            heartbeat_secs,
        })
    }

    /// Apply command-line overrides on top of the environment values
    pub fn with_overrides(
        mut self,
        host: Option<String>,
        port: Option<u16>,
        heartbeat_secs: Option<u64>,
    ) -> Self {
        if let Some(host) = host {
            self.host = host;
        }
        if let Some(port) = port {
            self.port = port;
        }
        if let Some(secs) = heartbeat_secs {
            self.heartbeat_secs = secs.max(1);
        }
        self
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| {
                RegistryError::InvalidInput(format!(
                    "Invalid listen address: {}:{}",
                    self.host, self.port
                ))
            })
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_secs)
    }
}
