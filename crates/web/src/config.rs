//! Keyhole configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `KEYHOLE_SESSION_SECRET` - Session cookie signing secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `KEYHOLE_DATABASE_URL` - `PostgreSQL` connection string (falls back to
//!   `DATABASE_URL`; in-memory stores are used when neither is set)
//! - `KEYHOLE_HOST` - Bind address (default: 127.0.0.1)
//! - `KEYHOLE_PORT` - Listen port (default: 3001)
//! - `KEYHOLE_BASE_URL` - Public URL (default: <http://localhost:3001>)
//! - `KEYHOLE_SESSION_TTL_HOURS` - Session inactivity expiry (default: 168)
//! - `KEYHOLE_LOOKUP_TIMEOUT_MS` - Session user lookup timeout (default: 2000)
//! - `KEYHOLE_HASH_MEMORY_KIB` - Argon2 memory cost (default: 19456)
//! - `KEYHOLE_HASH_ITERATIONS` - Argon2 time cost (default: 2)
//! - `KEYHOLE_HASH_PARALLELISM` - Argon2 lanes (default: 1)
//! - `KEYHOLE_AUTH_RATE_LIMIT` - Rate limit login/register POSTs (default: true)
//! - `KEYHOLE_TRUST_PROXY_HEADERS` - Key the rate limit on `X-Forwarded-For` /
//!   `X-Real-IP` instead of the peer address (default: false)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag
//! - `SENTRY_SAMPLE_RATE` - Error event sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.0)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

use crate::services::auth::HashParams;

const MIN_SESSION_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Keyhole application configuration.
#[derive(Debug, Clone)]
pub struct KeyholeConfig {
    /// `PostgreSQL` connection URL; `None` selects in-memory stores
    pub database_url: Option<SecretString>,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL
    pub base_url: Url,
    /// Session cookie signing secret
    pub session_secret: SecretString,
    /// Inactivity period after which a session expires
    pub session_ttl: Duration,
    /// Upper bound on the per-request user lookup behind a session
    pub lookup_timeout: Duration,
    /// Password hashing work factor
    pub hash_params: HashParams,
    /// Whether login/register submissions are rate limited
    pub auth_rate_limit: bool,
    /// Whether the rate limiter trusts reverse-proxy client IP headers
    pub trust_proxy_headers: bool,
    /// Sentry error tracking configuration
    pub sentry: SentryConfig,
}

/// Sentry error tracking configuration.
#[derive(Debug, Clone)]
pub struct SentryConfig {
    /// Sentry DSN; tracking is disabled when absent
    pub dsn: Option<String>,
    /// Environment tag (e.g. "production")
    pub environment: Option<String>,
    /// Fraction of error events sent
    pub sample_rate: f32,
    /// Fraction of transactions traced
    pub traces_sample_rate: f32,
}

impl Default for SentryConfig {
    fn default() -> Self {
        Self {
            dsn: None,
            environment: None,
            sample_rate: 1.0,
            traces_sample_rate: 0.0,
        }
    }
}

impl KeyholeConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the session secret fails validation (length, placeholder detection,
    /// entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("KEYHOLE_DATABASE_URL");
        let host = get_parsed_or_default::<IpAddr>("KEYHOLE_HOST", "127.0.0.1")?;
        let port = get_parsed_or_default::<u16>("KEYHOLE_PORT", "3001")?;
        let base_url = get_parsed_or_default::<Url>("KEYHOLE_BASE_URL", "http://localhost:3001")?;

        let session_secret = get_validated_secret("KEYHOLE_SESSION_SECRET")?;
        validate_session_secret(&session_secret, "KEYHOLE_SESSION_SECRET")?;

        let ttl_hours = get_nonzero_or_default("KEYHOLE_SESSION_TTL_HOURS", "168")?;
        let lookup_timeout_ms = get_nonzero_or_default("KEYHOLE_LOOKUP_TIMEOUT_MS", "2000")?;
        let hash_params = hash_params_from_env()?;

        let auth_rate_limit = get_parsed_or_default::<bool>("KEYHOLE_AUTH_RATE_LIMIT", "true")?;
        let trust_proxy_headers =
            get_parsed_or_default::<bool>("KEYHOLE_TRUST_PROXY_HEADERS", "false")?;

        let sentry = SentryConfig {
            dsn: get_optional_env("SENTRY_DSN"),
            environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sample_rate: get_parsed_or_default("SENTRY_SAMPLE_RATE", "1.0")?,
            traces_sample_rate: get_parsed_or_default("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
        };

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            session_secret,
            session_ttl: Duration::from_secs(ttl_hours * 60 * 60),
            lookup_timeout: Duration::from_millis(lookup_timeout_ms),
            hash_params,
            auth_rate_limit,
            trust_proxy_headers,
            sentry,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` attribute.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.scheme() == "https"
    }
}

/// Load the password hashing work factor from `KEYHOLE_HASH_*`.
///
/// Each unset variable keeps its [`HashParams::default`] value.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` if a value is not a number or the
/// combination is rejected by Argon2.
pub fn hash_params_from_env() -> Result<HashParams, ConfigError> {
    let defaults = HashParams::default();
    let hash_params = HashParams {
        memory_kib: get_parsed_or_default(
            "KEYHOLE_HASH_MEMORY_KIB",
            &defaults.memory_kib.to_string(),
        )?,
        iterations: get_parsed_or_default(
            "KEYHOLE_HASH_ITERATIONS",
            &defaults.iterations.to_string(),
        )?,
        parallelism: get_parsed_or_default(
            "KEYHOLE_HASH_PARALLELISM",
            &defaults.parallelism.to_string(),
        )?,
    };
    hash_params
        .validate()
        .map_err(|e| ConfigError::InvalidEnvVar("KEYHOLE_HASH_*".to_string(), e.to_string()))?;
    Ok(hash_params)
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Option<SecretString> {
    std::env::var(primary_key)
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(SecretString::from)
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable parsed into `T`, using `default` when unset.
fn get_parsed_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = std::env::var(key).unwrap_or_else(|_| default.to_string());
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Get a positive integer environment variable, using `default` when unset.
fn get_nonzero_or_default(key: &str, default: &str) -> Result<u64, ConfigError> {
    require_nonzero(key, get_parsed_or_default::<u64>(key, default)?)
}

/// Reject a zero duration setting.
fn require_nonzero(key: &str, value: u64) -> Result<u64, ConfigError> {
    if value == 0 {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be greater than zero".to_string(),
        ));
    }
    Ok(value)
}

/// Validate that a session secret meets minimum length requirements.
fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SESSION_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn test_config(base_url: &str) -> KeyholeConfig {
        KeyholeConfig {
            database_url: None,
            host: "127.0.0.1".parse().unwrap(),
            port: 3001,
            base_url: Url::parse(base_url).unwrap(),
            session_secret: SecretString::from("x".repeat(32)),
            session_ttl: Duration::from_secs(3600),
            lookup_timeout: Duration::from_secs(2),
            hash_params: HashParams::default(),
            auth_rate_limit: false,
            trust_proxy_headers: false,
            sentry: SentryConfig::default(),
        }
    }

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_single_char() {
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_shannon_entropy_high() {
        let entropy = shannon_entropy("aB3$xY9!mK2@nL5#");
        assert!(entropy > 3.3);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-session-key-here", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_changeme() {
        assert!(validate_secret_strength("changeme123", "TEST_VAR").is_err());
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("abababababababababababababababab", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_session_secret_too_short() {
        let secret = SecretString::from("short");
        assert!(validate_session_secret(&secret, "TEST_SESSION").is_err());
    }

    #[test]
    fn test_validate_session_secret_valid_length() {
        let secret = SecretString::from("a".repeat(32));
        assert!(validate_session_secret(&secret, "TEST_SESSION").is_ok());
    }

    #[test]
    fn test_zero_durations_rejected() {
        assert!(matches!(
            require_nonzero("KEYHOLE_LOOKUP_TIMEOUT_MS", 0),
            Err(ConfigError::InvalidEnvVar(key, _)) if key == "KEYHOLE_LOOKUP_TIMEOUT_MS"
        ));
        assert!(require_nonzero("KEYHOLE_SESSION_TTL_HOURS", 0).is_err());
        assert_eq!(require_nonzero("KEYHOLE_LOOKUP_TIMEOUT_MS", 2000).unwrap(), 2000);
    }

    #[test]
    fn test_socket_addr() {
        let addr = test_config("http://localhost:3001").socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3001);
    }

    #[test]
    fn test_is_secure_follows_scheme() {
        assert!(!test_config("http://localhost:3001").is_secure());
        assert!(test_config("https://auth.example.org").is_secure());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut config = test_config("http://localhost:3001");
        config.session_secret = SecretString::from("super_secret_session_value_1234567");
        config.database_url = Some(SecretString::from("postgres://u:hunter2@db/keyhole"));

        let debug_output = format!("{config:?}");
        assert!(!debug_output.contains("super_secret_session_value"));
        assert!(!debug_output.contains("hunter2"));
    }
}
