use std::time::Duration;

/// Tunables matching spec §5's timeouts, overridable via env vars so tests
/// can shrink them. Defaults match the spec's stated constants exactly.
#[derive(Debug, Clone, Copy)]
pub struct Settings {
    pub client_ttl: Duration,
    pub queue_ttl: Duration,
    pub heartbeat_timeout: Duration,
    pub grace_period: Duration,
    pub notification_staleness: Duration,
    pub poll_interval: Duration,
    pub notification_poll_interval: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            client_ttl: Duration::from_secs(600),
            queue_ttl: Duration::from_secs(300),
            heartbeat_timeout: Duration::from_secs(30),
            grace_period: Duration::from_secs(15),
            notification_staleness: Duration::from_secs(30),
            poll_interval: Duration::from_millis(500),
            notification_poll_interval: Duration::from_millis(1000),
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            client_ttl: env_secs("CLIENT_TTL_SECS", defaults.client_ttl),
            queue_ttl: env_secs("QUEUE_TTL_SECS", defaults.queue_ttl),
            heartbeat_timeout: env_secs("HEARTBEAT_TIMEOUT_SECS", defaults.heartbeat_timeout),
            grace_period: env_secs("GRACE_PERIOD_SECS", defaults.grace_period),
            notification_staleness: env_secs(
                "NOTIFICATION_STALENESS_SECS",
                defaults.notification_staleness,
            ),
            poll_interval: env_millis("POLL_INTERVAL_MS", defaults.poll_interval),
            notification_poll_interval: env_millis(
                "NOTIFICATION_POLL_INTERVAL_MS",
                defaults.notification_poll_interval,
            ),
        }
    }
}

fn env_secs(name: &str, default: Duration) -> Duration {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}

fn env_millis(name: &str, default: Duration) -> Duration {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(default)
}
