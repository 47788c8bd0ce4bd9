use rkids_core::codes::{CHECKIN_CODE_EXPIRY_MINS, MFA_CODE_EXPIRY_MINS, PICKUP_CODE_EXPIRY_MINS};

use crate::auth::jwt::JwtConfig;

/// Origins allowed when `CORS_ORIGINS` is unset: the hosted frontend plus
/// the usual local dev servers.
const DEFAULT_CORS_ORIGINS: &str = "https://r-kids-ministry.vercel.app,\
http://localhost:5173,http://localhost:3000,http://localhost:8080,\
http://127.0.0.1:5173,http://127.0.0.1:3000,http://127.0.0.1:8080";

/// Default number of days a guardian renewal extends `active_until`.
const DEFAULT_GUARDIAN_RENEWAL_DAYS: i64 = 365;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development except the
/// database URL and JWT secret.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `5000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Seconds to wait for background tasks after the server stops (default: `5`).
    pub shutdown_timeout_secs: u64,
    /// JWT token configuration (secret, expiry).
    pub jwt: JwtConfig,
    /// Lifetimes and behaviour of QR, OTP and MFA codes.
    pub codes: CodeConfig,
}

/// Which pending-code store backs the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeStoreKind {
    Postgres,
    Memory,
}

impl CodeStoreKind {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => CodeStoreKind::Memory,
            _ => CodeStoreKind::Postgres,
        }
    }
}

/// Code lifetimes in minutes, plus development switches.
#[derive(Debug, Clone)]
pub struct CodeConfig {
    pub checkin_expiry_mins: i64,
    pub pickup_expiry_mins: i64,
    pub mfa_expiry_mins: i64,
    pub guardian_renewal_days: i64,
    /// Echo MFA codes in the login response instead of only emailing them.
    pub expose_dev_codes: bool,
    pub store: CodeStoreKind,
}

impl Default for CodeConfig {
    fn default() -> Self {
        Self {
            checkin_expiry_mins: CHECKIN_CODE_EXPIRY_MINS,
            pickup_expiry_mins: PICKUP_CODE_EXPIRY_MINS,
            mfa_expiry_mins: MFA_CODE_EXPIRY_MINS,
            guardian_renewal_days: DEFAULT_GUARDIAN_RENEWAL_DAYS,
            expose_dev_codes: false,
            store: CodeStoreKind::Postgres,
        }
    }
}

impl CodeConfig {
    /// | Env Var                      | Default    |
    /// |------------------------------|------------|
    /// | `QR_CODE_EXPIRY_MINUTES`     | `15`       |
    /// | `PICKUP_CODE_EXPIRY_MINUTES` | `30`       |
    /// | `MFA_CODE_EXPIRY_MINUTES`    | `10`       |
    /// | `GUARDIAN_RENEWAL_DAYS`      | `365`      |
    /// | `EXPOSE_DEV_CODES`           | `false`    |
    /// | `CODE_STORE`                 | `postgres` |
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            checkin_expiry_mins: env_i64("QR_CODE_EXPIRY_MINUTES", defaults.checkin_expiry_mins),
            pickup_expiry_mins: env_i64("PICKUP_CODE_EXPIRY_MINUTES", defaults.pickup_expiry_mins),
            mfa_expiry_mins: env_i64("MFA_CODE_EXPIRY_MINUTES", defaults.mfa_expiry_mins),
            guardian_renewal_days: env_i64(
                "GUARDIAN_RENEWAL_DAYS",
                defaults.guardian_renewal_days,
            ),
            expose_dev_codes: std::env::var("EXPOSE_DEV_CODES")
                .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            store: std::env::var("CODE_STORE")
                .map(|v| CodeStoreKind::parse(&v))
                .unwrap_or(defaults.store),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                         |
    /// |------------------------|---------------------------------|
    /// | `HOST`                 | `0.0.0.0`                       |
    /// | `PORT`                 | `5000`                          |
    /// | `CORS_ORIGINS`         | hosted frontend + localhost     |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                            |
    /// | `SHUTDOWN_TIMEOUT_SECS`| `5`                             |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "5000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins = parse_origins(
            &std::env::var("CORS_ORIGINS").unwrap_or_else(|_| DEFAULT_CORS_ORIGINS.into()),
        );

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "5".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            jwt: JwtConfig::from_env(),
            codes: CodeConfig::from_env(),
        }
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn env_i64(name: &str, default: i64) -> i64 {
    match std::env::var(name) {
        Ok(v) => v
            .trim()
            .parse()
            .unwrap_or_else(|_| panic!("{name} must be a valid integer")),
        Err(_) => default,
    }
}
