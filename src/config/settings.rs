//! Application settings and configuration structures.

use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Root configuration structure containing all application settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Server configuration (host, port)
    pub server: ServerSettings,

    /// Which provider implementations back the service ports
    pub providers: ProviderSettings,

    /// Firebase project, service account and REST endpoints
    pub firebase: FirebaseSettings,

    /// Stream Chat credentials and REST endpoint
    pub stream: StreamSettings,

    /// Internal JWT settings (service-to-service tokens)
    pub jwt: JwtSettings,

    /// Rate limiting configuration
    pub rate_limit: RateLimitSettings,

    /// CORS configuration
    pub cors: CorsSettings,

    /// API key gate for `/api/*`
    pub security: SecuritySettings,

    /// Values exposed through the platform configuration bridge
    #[serde(default)]
    pub platform: PlatformSettings,

    /// Default administrator created by `ovo-admin setup`
    #[serde(default)]
    pub admin: AdminSettings,

    /// Current environment (development, staging, production)
    pub environment: String,
}

/// Server binding configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// Host address to bind to (e.g., "0.0.0.0")
    pub host: String,

    /// Port number to listen on
    pub port: u16,

    /// Maximum accepted request body in bytes
    pub body_limit_bytes: usize,
}

/// Provider backend selection.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProviderMode {
    /// Firebase + Firestore + Stream Chat over HTTPS
    Live,
    /// In-process fakes for local development and tests
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSettings {
    pub mode: ProviderMode,

    /// Per-request timeout for upstream HTTP calls, in seconds
    pub request_timeout_secs: u64,
}

/// Firebase service account and endpoint configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FirebaseSettings {
    pub project_id: Option<String>,
    pub client_email: Option<String>,
    /// PEM private key; literal `\n` sequences are accepted
    pub private_key: Option<String>,
    /// Path to a service-account JSON file
    pub credentials_file: Option<String>,
    pub token_uri: String,
    pub jwks_url: String,
    pub identity_base_url: String,
    pub firestore_base_url: String,
}

/// Stream Chat configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamSettings {
    pub api_key: String,
    pub secret: String,
    pub base_url: String,
}

/// Internal JWT configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtSettings {
    /// Secret key for signing tokens
    pub secret: String,

    /// Lifetime of issued tokens, e.g. "24h", "30m", "3600"
    pub expires_in: String,

    /// Issuer claim written and required on internal tokens
    pub issuer: String,
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitSettings {
    /// Window length in milliseconds
    pub window_ms: u64,

    /// Requests allowed per client within one window
    pub max_requests: u32,
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CorsSettings {
    /// Allowed origins (comma-separated in env)
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecuritySettings {
    /// Accepted `x-api-key` values; empty accepts any non-empty key
    pub api_keys: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlatformSettings {
    pub google_api_key: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminSettings {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Minimum required length for JWT secret (256 bits = 32 bytes)
pub const MIN_JWT_SECRET_LENGTH: usize = 32;

impl Settings {
    /// Load and validate settings.
    ///
    /// The loading order is:
    /// 1. built-in defaults
    /// 2. config/default.toml
    /// 3. config/{RUN_ENV}.toml
    /// 4. `APP__*` environment variables
    /// 5. plain environment variable names (`PORT`, `FIREBASE_PROJECT_ID`, ...)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if configuration cannot be loaded or parsed,
    /// or if the result fails [`Settings::validate`].
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Self::load_unchecked()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings without validating them. Used by `ovo-admin check-config`
    /// so that an incomplete configuration can still be reported on.
    pub fn load_unchecked() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let environment = std::env::var("RUN_ENV").unwrap_or_else(|_| "development".into());

        Config::builder()
            .set_default("environment", environment.clone())?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("server.body_limit_bytes", 10 * 1024 * 1024_i64)?
            .set_default("providers.mode", "live")?
            .set_default("providers.request_timeout_secs", 30)?
            .set_default("firebase.token_uri", "https://oauth2.googleapis.com/token")?
            .set_default(
                "firebase.jwks_url",
                "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com",
            )?
            .set_default("firebase.identity_base_url", "https://identitytoolkit.googleapis.com")?
            .set_default("firebase.firestore_base_url", "https://firestore.googleapis.com")?
            .set_default("stream.api_key", "")?
            .set_default("stream.secret", "")?
            .set_default("stream.base_url", "https://chat.stream-io-api.com")?
            .set_default("jwt.expires_in", "24h")?
            .set_default("jwt.issuer", "ovo-meet-chat-backend")?
            .set_default("rate_limit.window_ms", 15 * 60 * 1000_i64)?
            .set_default("rate_limit.max_requests", 100)?
            .set_default("cors.allowed_origins", vec!["http://localhost:3000"])?
            .set_default("security.api_keys", Vec::<String>::new())?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // APP__SERVER__PORT=3000 -> server.port = 3000
            .add_source(
                Environment::default()
                    .prefix("APP")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("cors.allowed_origins")
                    .with_list_parse_key("security.api_keys")
                    .try_parsing(true),
            )
            .set_override_option("server.host", env("HOST"))?
            .set_override_option("server.port", env("PORT"))?
            .set_override_option("providers.mode", env("PROVIDER_MODE"))?
            .set_override_option("firebase.project_id", env("FIREBASE_PROJECT_ID"))?
            .set_override_option("firebase.client_email", env("FIREBASE_CLIENT_EMAIL"))?
            .set_override_option("firebase.private_key", env("FIREBASE_PRIVATE_KEY"))?
            .set_override_option(
                "firebase.credentials_file",
                env("FIREBASE_SERVICE_ACCOUNT_PATH").or_else(|| env("GOOGLE_APPLICATION_CREDENTIALS")),
            )?
            .set_override_option("stream.api_key", env("STREAM_CHAT_API_KEY"))?
            .set_override_option("stream.secret", env("STREAM_CHAT_SECRET"))?
            .set_override_option("jwt.secret", env("JWT_SECRET"))?
            .set_override_option("jwt.expires_in", env("JWT_EXPIRES_IN"))?
            .set_override_option("rate_limit.window_ms", env("RATE_LIMIT_WINDOW_MS"))?
            .set_override_option("rate_limit.max_requests", env("RATE_LIMIT_MAX_REQUESTS"))?
            .set_override_option("cors.allowed_origins", env("ALLOWED_ORIGINS").map(split_list))?
            .set_override_option("security.api_keys", env("API_KEYS").map(split_list))?
            .set_override_option("platform.google_api_key", env("GOOGLE_API_KEY"))?
            .set_override_option("admin.email", env("ADMIN_EMAIL"))?
            .set_override_option("admin.password", env("ADMIN_PASSWORD"))?
            .build()?
            .try_deserialize()
    }

    /// Check invariants that deserialization alone cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt.secret.len() < MIN_JWT_SECRET_LENGTH {
            return Err(ConfigError::Message(format!(
                "JWT secret must be at least {} characters for security. Current length: {}",
                MIN_JWT_SECRET_LENGTH,
                self.jwt.secret.len()
            )));
        }

        parse_duration(&self.jwt.expires_in).ok_or_else(|| {
            ConfigError::Message(format!("Invalid JWT_EXPIRES_IN value: {}", self.jwt.expires_in))
        })?;

        if self.providers.mode == ProviderMode::Live {
            if self.firebase.project_id.as_deref().unwrap_or_default().is_empty() {
                return Err(ConfigError::Message(
                    "FIREBASE_PROJECT_ID is required in live provider mode".into(),
                ));
            }
            if !self.firebase.has_credentials() {
                return Err(ConfigError::Message(
                    "Firebase credentials not configured. Set FIREBASE_CLIENT_EMAIL and FIREBASE_PRIVATE_KEY or FIREBASE_SERVICE_ACCOUNT_PATH".into(),
                ));
            }
            if self.stream.api_key.is_empty() || self.stream.secret.is_empty() {
                return Err(ConfigError::Message(
                    "Stream Chat API_KEY and SECRET are required".into(),
                ));
            }
        }

        Ok(())
    }

    /// Get the full server address as a string.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }
}

impl FirebaseSettings {
    pub fn has_credentials(&self) -> bool {
        let inline = self.client_email.as_deref().is_some_and(|v| !v.is_empty())
            && self.private_key.as_deref().is_some_and(|v| !v.is_empty());
        inline || self.credentials_file.as_deref().is_some_and(|v| !v.is_empty())
    }
}

impl JwtSettings {
    /// Token lifetime; falls back to 24 hours for an unparsable value.
    pub fn expires_in(&self) -> Duration {
        parse_duration(&self.expires_in).unwrap_or(Duration::from_secs(24 * 60 * 60))
    }
}

impl RateLimitSettings {
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

fn env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn split_list(raw: String) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Parse durations of the form `90`, `90s`, `15m`, `24h` or `7d`.
pub fn parse_duration(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    let (digits, unit) = match raw.find(|c: char| !c.is_ascii_digit()) {
        Some(idx) => raw.split_at(idx),
        None => (raw, "s"),
    };
    let value: u64 = digits.parse().ok()?;
    let secs = match unit {
        "s" => value,
        "m" => value.checked_mul(60)?,
        "h" => value.checked_mul(60 * 60)?,
        "d" => value.checked_mul(24 * 60 * 60)?,
        _ => return None,
    };
    Some(Duration::from_secs(secs))
}
