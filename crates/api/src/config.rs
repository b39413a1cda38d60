//! Application configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

use fulfillment::PoolConfig;

/// Secret used to sign tokens when `JWT_SECRET` is unset. Local runs only.
pub const DEV_JWT_SECRET: &str = "fallback-secret-for-dev-only";

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `8080`)
/// - `DATABASE_URL` — PostgreSQL URL; unset runs on the in-memory store
/// - `REDIS_URL` — Redis URL; unset uses an in-process catalog cache
/// - `JWT_SECRET` — HMAC secret for bearer tokens
/// - `ORDER_QUEUE_CAPACITY` (default: `100`) and `ORDER_WORKER_COUNT` (default: `3`)
/// - `SHUTDOWN_GRACE_SECS` — bound on draining HTTP intake (default: `5`)
/// - `NOTIFICATION_LATENCY_MS` (default: `2000`) and `INVENTORY_SYNC_LATENCY_MS`
///   (default: `1000`) for the simulated integrations
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: Option<String>,
    pub redis_url: Option<String>,
    pub jwt_secret: Option<String>,
    pub queue_capacity: usize,
    pub worker_count: usize,
    pub shutdown_grace: Duration,
    pub notification_latency: Duration,
    pub inventory_sync_latency: Duration,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    ///
    /// Unparseable numbers fall back to their defaults. Queue capacity and
    /// worker count are raised to at least one.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            host: non_empty("HOST").unwrap_or(defaults.host),
            port: parse_or(&lookup, "PORT", defaults.port),
            database_url: non_empty("DATABASE_URL"),
            redis_url: non_empty("REDIS_URL"),
            jwt_secret: non_empty("JWT_SECRET"),
            queue_capacity: parse_or(&lookup, "ORDER_QUEUE_CAPACITY", defaults.queue_capacity)
                .max(1),
            worker_count: parse_or(&lookup, "ORDER_WORKER_COUNT", defaults.worker_count).max(1),
            shutdown_grace: Duration::from_secs(parse_or(
                &lookup,
                "SHUTDOWN_GRACE_SECS",
                defaults.shutdown_grace.as_secs(),
            )),
            notification_latency: Duration::from_millis(parse_or(
                &lookup,
                "NOTIFICATION_LATENCY_MS",
                2000,
            )),
            inventory_sync_latency: Duration::from_millis(parse_or(
                &lookup,
                "INVENTORY_SYNC_LATENCY_MS",
                1000,
            )),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the token signing secret, or the development fallback.
    pub fn jwt_secret(&self) -> &str {
        self.jwt_secret.as_deref().unwrap_or(DEV_JWT_SECRET)
    }

    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            queue_capacity: self.queue_capacity,
            worker_count: self.worker_count,
        }
    }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "invalid configuration value, using default");
            default
        }),
        None => default,
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            database_url: None,
            redis_url: None,
            jwt_secret: None,
            queue_capacity: 100,
            worker_count: 3,
            shutdown_grace: Duration::from_secs(5),
            notification_latency: Duration::from_millis(2000),
            inventory_sync_latency: Duration::from_millis(1000),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use super::*;

    fn from_pairs(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_values() {
        let config = from_pairs(&[]);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert_eq!(config.database_url, None);
        assert_eq!(config.redis_url, None);
        assert_eq!(config.queue_capacity, 100);
        assert_eq!(config.worker_count, 3);
        assert_eq!(config.shutdown_grace, Duration::from_secs(5));
        assert_eq!(config.notification_latency, Duration::from_secs(2));
        assert_eq!(config.inventory_sync_latency, Duration::from_secs(1));
        assert_eq!(config.jwt_secret(), DEV_JWT_SECRET);
    }

    #[test]
    fn test_values_from_environment() {
        let config = from_pairs(&[
            ("PORT", "9000"),
            ("DATABASE_URL", "postgres://localhost/shop"),
            ("JWT_SECRET", "s3cret"),
            ("ORDER_QUEUE_CAPACITY", "7"),
            ("ORDER_WORKER_COUNT", "2"),
            ("SHUTDOWN_GRACE_SECS", "1"),
        ]);
        assert_eq!(config.port, 9000);
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/shop")
        );
        assert_eq!(config.jwt_secret(), "s3cret");
        assert_eq!(
            config.pool_config(),
            PoolConfig {
                queue_capacity: 7,
                worker_count: 2
            }
        );
        assert_eq!(config.shutdown_grace, Duration::from_secs(1));
    }

    #[test]
    fn test_invalid_and_zero_values() {
        let config = from_pairs(&[
            ("PORT", "not-a-port"),
            ("ORDER_QUEUE_CAPACITY", "0"),
            ("ORDER_WORKER_COUNT", "-4"),
            ("REDIS_URL", "  "),
        ]);
        assert_eq!(config.port, 8080);
        assert_eq!(config.queue_capacity, 1);
        assert_eq!(config.worker_count, 3);
        assert_eq!(config.redis_url, None);
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_invalid_values_are_logged() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        let config = tracing::subscriber::with_default(subscriber, || {
            from_pairs(&[("PORT", "not-a-port"), ("SHUTDOWN_GRACE_SECS", "soon")])
        });

        assert_eq!(config.port, 8080);
        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("invalid configuration value"), "{output}");
        assert!(output.contains("PORT"));
        assert!(output.contains("SHUTDOWN_GRACE_SECS"));
    }

    #[test]
    fn test_addr_formatting() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            ..Config::default()
        };
        assert_eq!(config.addr(), "127.0.0.1:8080");
    }
}
