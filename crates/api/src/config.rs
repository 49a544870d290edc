use jobwire_events::{Topics, DEFAULT_QUEUE_LIST};

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development. With neither
/// `REDIS_URL` nor `DATABASE_URL` set the server runs fully in process.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Interval between WebSocket ping frames (default: `30`).
    pub heartbeat_interval_secs: u64,
    /// Redis broker. `None` selects the in-process bus.
    pub redis_url: Option<String>,
    /// PostgreSQL job store. `None` selects the in-memory store.
    pub database_url: Option<String>,
    /// Topic the worker publishes status events on.
    pub status_topic: String,
    /// Topic the worker publishes completion events on.
    pub complete_topic: String,
    /// Durable list job descriptors are pushed onto.
    pub queue_list: String,
    /// Optional topic every enqueued descriptor is also published on.
    pub queue_announce_topic: Option<String>,
    /// Emit logs as JSON lines instead of the human-readable format.
    pub json_logs: bool,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default                 |
    /// |---------------------------|-------------------------|
    /// | `HOST`                    | `0.0.0.0`               |
    /// | `PORT`                    | `3000`                  |
    /// | `CORS_ORIGINS`            | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`    | `30`                    |
    /// | `HEARTBEAT_INTERVAL_SECS` | `30`                    |
    /// | `REDIS_URL`               | unset (in-process bus)  |
    /// | `DATABASE_URL`            | unset (in-memory store) |
    /// | `STATUS_TOPIC`            | `job:status`            |
    /// | `COMPLETE_TOPIC`          | `job:complete`          |
    /// | `QUEUE_LIST`              | `job:queue`             |
    /// | `QUEUE_ANNOUNCE_TOPIC`    | unset                   |
    /// | `LOG_FORMAT`              | `text` (`json` to switch) |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let heartbeat_interval_secs: u64 = std::env::var("HEARTBEAT_INTERVAL_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("HEARTBEAT_INTERVAL_SECS must be a valid u64");
        assert!(heartbeat_interval_secs > 0, "HEARTBEAT_INTERVAL_SECS must be positive");

        let json_logs = std::env::var("LOG_FORMAT")
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            heartbeat_interval_secs,
            redis_url: non_empty_var("REDIS_URL"),
            database_url: non_empty_var("DATABASE_URL"),
            status_topic: non_empty_var("STATUS_TOPIC").unwrap_or_else(|| "job:status".into()),
            complete_topic: non_empty_var("COMPLETE_TOPIC")
                .unwrap_or_else(|| "job:complete".into()),
            queue_list: non_empty_var("QUEUE_LIST").unwrap_or_else(|| DEFAULT_QUEUE_LIST.into()),
            queue_announce_topic: non_empty_var("QUEUE_ANNOUNCE_TOPIC"),
            json_logs,
        }
    }

    /// The relay topics as configured.
    pub fn topics(&self) -> Topics {
        Topics::new(self.status_topic.clone(), self.complete_topic.clone())
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
