use std::env;
use std::net::SocketAddr;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::with_security_headers;

use crate::inventory::HoldPolicy;

pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub default_hold_ttl_secs: u64,
    pub max_hold_ttl_secs: u64,
    pub sweep_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost/gather".to_string()),
            bind_addr: env_parsed("BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 3001))),
            default_hold_ttl_secs: env_parsed("HOLD_TTL_SECS", 600),
            max_hold_ttl_secs: env_parsed("HOLD_MAX_TTL_SECS", 1800),
            sweep_interval_secs: env_parsed("HOLD_SWEEP_INTERVAL_SECS", 30),
        }
    }

    pub fn hold_policy(&self) -> HoldPolicy {
        HoldPolicy {
            default_ttl: chrono::Duration::seconds(self.default_hold_ttl_secs as i64),
            max_ttl: chrono::Duration::seconds(self.max_hold_ttl_secs as i64),
        }
    }
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default)
}
