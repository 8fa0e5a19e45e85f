use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub email: EmailConfig,
    pub verification: VerificationConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let defaults = EmailConfig::default();
        let email = EmailConfig {
            from_address: env::var("EMAIL_FROM").unwrap_or(defaults.from_address),
            workers: parse_var("EMAIL_WORKERS", defaults.workers)?,
            max_retries: parse_var("EMAIL_MAX_RETRIES", defaults.max_retries)?,
            retry_delay: Duration::from_secs(parse_var(
                "EMAIL_RETRY_DELAY_SECS",
                defaults.retry_delay.as_secs(),
            )?),
        };
        if email.workers == 0 {
            return Err(ConfigError::InvalidNumber {
                key: "EMAIL_WORKERS",
                value: "0".to_string(),
            });
        }

        let defaults = VerificationConfig::default();
        let verification = VerificationConfig {
            notification_retention_days: parse_days(
                "NOTIFICATION_RETENTION_DAYS",
                defaults.notification_retention_days,
            )?,
            expiry_reminder_days: parse_days("EXPIRY_REMINDER_DAYS", defaults.expiry_reminder_days)?,
            maintenance_interval: Duration::from_secs(parse_var(
                "MAINTENANCE_INTERVAL_SECS",
                defaults.maintenance_interval.as_secs(),
            )?),
        };
        if verification.maintenance_interval.is_zero() {
            return Err(ConfigError::InvalidNumber {
                key: "MAINTENANCE_INTERVAL_SECS",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            email,
            verification,
        })
    }
}

fn parse_var<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { key, value: raw }),
        Err(_) => Ok(default),
    }
}

/// Upper bound for the day-based windows: one hundred years.
pub const MAX_WINDOW_DAYS: i64 = 36_500;

fn parse_days(key: &'static str, default: i64) -> Result<i64, ConfigError> {
    let days = parse_var(key, default)?;
    if (0..=MAX_WINDOW_DAYS).contains(&days) {
        Ok(days)
    } else {
        Err(ConfigError::InvalidNumber {
            key,
            value: days.to_string(),
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Outbound email queue settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailConfig {
    pub from_address: String,
    pub workers: usize,
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            from_address: "noreply@campus-verify.local".to_string(),
            workers: 2,
            max_retries: 3,
            retry_delay: Duration::from_secs(60),
        }
    }
}

/// Windows used by the periodic verification jobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationConfig {
    pub notification_retention_days: i64,
    pub expiry_reminder_days: i64,
    pub maintenance_interval: Duration,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            notification_retention_days: 90,
            expiry_reminder_days: 30,
            maintenance_interval: Duration::from_secs(24 * 60 * 60),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { key: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { key, value } => {
                write!(f, "{key} must be a positive number (found '{value}')")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidNumber { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}

/// Serialises tests that touch the process environment.
#[cfg(test)]
pub(crate) fn env_guard() -> &'static std::sync::Mutex<()> {
    static GUARD: std::sync::OnceLock<std::sync::Mutex<()>> = std::sync::OnceLock::new();
    GUARD.get_or_init(|| std::sync::Mutex::new(()))
}
