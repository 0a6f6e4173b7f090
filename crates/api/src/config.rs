use afya_core::integrations::MAX_ROUTE_TIMEOUT_SECS;

use crate::auth::jwt::JwtConfig;

/// Where rate-limit windows are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitBackend {
    /// Shared `rate_limit_windows` table; correct across API instances.
    Postgres,
    /// Process-local map; only correct with a single API instance.
    Memory,
}

impl RateLimitBackend {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "pg" => Some(Self::Postgres),
            "memory" | "in-memory" => Some(Self::Memory),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Memory => "memory",
        }
    }
}

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `330`, above the longest
    /// route timeout so gateway calls are not cut short).
    pub request_timeout_secs: u64,
    /// How long to wait for background tasks after the server stops (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Rate limiter storage (default: `postgres`).
    pub rate_limit_backend: RateLimitBackend,
    /// Seconds between reminder dispatch ticks (default: `60`).
    pub reminder_dispatch_interval_secs: u64,
    /// JWT token configuration (secret, expiry).
    pub jwt: JwtConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                           | Default                    |
    /// |-----------------------------------|----------------------------|
    /// | `HOST`                            | `0.0.0.0`                  |
    /// | `PORT`                            | `3000`                     |
    /// | `CORS_ORIGINS`                    | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`            | `330`                      |
    /// | `SHUTDOWN_TIMEOUT_SECS`           | `30`                       |
    /// | `RATE_LIMIT_BACKEND`              | `postgres`                 |
    /// | `REMINDER_DISPATCH_INTERVAL_SECS` | `60`                       |
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
            .unwrap_or_else(|_| "330".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");
        if let Err(msg) = check_request_timeout(request_timeout_secs) {
            panic!("{msg}");
        }

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let backend = std::env::var("RATE_LIMIT_BACKEND").unwrap_or_else(|_| "postgres".into());
        let rate_limit_backend = RateLimitBackend::from_str(&backend)
            .unwrap_or_else(|| panic!("RATE_LIMIT_BACKEND must be 'postgres' or 'memory', got '{backend}'"));

        let reminder_dispatch_interval_secs: u64 =
            std::env::var("REMINDER_DISPATCH_INTERVAL_SECS")
                .unwrap_or_else(|_| "60".into())
                .parse()
                .expect("REMINDER_DISPATCH_INTERVAL_SECS must be a valid u64");
        assert!(
            reminder_dispatch_interval_secs > 0,
            "REMINDER_DISPATCH_INTERVAL_SECS must be positive"
        );

        let jwt = JwtConfig::from_env();

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            rate_limit_backend,
            reminder_dispatch_interval_secs,
            jwt,
        }
    }
}

/// The HTTP timeout must exceed the longest route timeout.
fn check_request_timeout(secs: u64) -> Result<(), String> {
    let longest_route = MAX_ROUTE_TIMEOUT_SECS as u64;
    if secs <= longest_route {
        return Err(format!(
            "REQUEST_TIMEOUT_SECS must exceed the longest route timeout ({longest_route}s), got {secs}"
        ));
    }
    Ok(())
}
