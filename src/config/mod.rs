use std::env;
use std::time::Duration;

/// Config holds all application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    pub db_max_connections: u32,
    pub event_spool_path: String,
    pub spool_poll_interval: Duration,
    /// Optional topology seed applied at startup
    pub seed_path: Option<String>,
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn load() -> Self {
        Self {
            db_path: get_env("DB_PATH", "/data/leases.db"),
            db_max_connections: get_env("DB_MAX_CONNECTIONS", "5")
                .parse()
                .unwrap_or(5),
            event_spool_path: get_env("EVENT_SPOOL_PATH", "/var/lib/lease-reconciler/events.jsonl"),
            spool_poll_interval: Duration::from_secs(
                get_env("SPOOL_POLL_SECS", "2").parse().unwrap_or(2).max(1),
            ),
            seed_path: env::var("SEED_PATH").ok().filter(|p| !p.is_empty()),
        }
    }
}

fn get_env(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
