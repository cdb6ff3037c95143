use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;

use crate::engine::EngineConfig;

/// Name the service reports about itself: health payloads, log file prefix.
pub const SERVICE_NAME: &str = "eiq-backend";

/// Process-level configuration: where to listen, how loudly to log, and the
/// behavioral-core tunables.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub engine: EngineConfig,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            host: env_or("HOST", IpAddr::V4(Ipv4Addr::UNSPECIFIED)),
            port: env_or("PORT", 3000),
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            engine: EngineConfig::from_env(),
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Parse an env var, falling back to the default when unset or malformed.
pub(crate) fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
