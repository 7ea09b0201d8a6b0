use std::env;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub swagger: SwaggerConfig,
    pub classifier: ClassifierConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
}

#[derive(Debug, Clone)]
pub struct SwaggerConfig {
    pub title: String,
    pub version: String,
    pub description: String,
}

/// Settings for the LLM ticket classifier
///
/// A missing or empty `OPENAI_API_KEY` puts the classifier in unconfigured
/// mode, where every ticket gets the static default labels.
#[derive(Clone)]
pub struct ClassifierConfig {
    /// API key for the completion service (None = unconfigured mode)
    pub api_key: Option<String>,
    /// Base URL of an OpenAI-compatible API, without trailing slash
    pub base_url: String,
    /// Model used for chat completions
    pub model: String,
    /// Upper bound for a single classification request
    pub timeout: Duration,
}

impl fmt::Debug for ClassifierConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassifierConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        // Load .env file if exists, ignore if not found (optional for production)
        if let Err(e) = dotenvy::dotenv() {
            if !e.to_string().contains("not found") {
                eprintln!("Warning: Error loading .env file: {}", e);
            }
        }

        let lookup = |key: &str| env::var(key).ok();

        Ok(Config {
            app: AppConfig::from_lookup(lookup)?,
            database: DatabaseConfig::from_lookup(lookup)?,
            swagger: SwaggerConfig::from_lookup(lookup),
            classifier: ClassifierConfig::from_lookup(lookup)?,
        })
    }
}

/// Read `key` through `var`, falling back to `default`, and parse it
fn parse_var<T, F>(var: &F, key: &str, default: T) -> Result<T, String>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| format!("{} must be a valid number", key)),
        None => Ok(default),
    }
}

impl AppConfig {
    pub fn from_lookup<F>(var: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = var("HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = parse_var(&var, "PORT", 3000u16)?;

        // Parse CORS allowed origins from comma-separated string
        let cors_allowed_origins = var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            host,
            port,
            cors_allowed_origins,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl DatabaseConfig {
    // Default values for database connection pool (conservative defaults for small-medium apps)
    const DEFAULT_MAX_CONNECTIONS: u32 = 10;
    const DEFAULT_MIN_CONNECTIONS: u32 = 1;
    const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 5;
    const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600; // 10 minutes
    const DEFAULT_MAX_LIFETIME_SECS: u64 = 1800; // 30 minutes

    pub fn from_lookup<F>(var: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = var("DATABASE_URL").ok_or_else(|| "DATABASE_URL must be set".to_string())?;

        Ok(Self {
            url,
            max_connections: parse_var(&var, "DB_MAX_CONNECTIONS", Self::DEFAULT_MAX_CONNECTIONS)?,
            min_connections: parse_var(&var, "DB_MIN_CONNECTIONS", Self::DEFAULT_MIN_CONNECTIONS)?,
            acquire_timeout_secs: parse_var(
                &var,
                "DB_ACQUIRE_TIMEOUT_SECS",
                Self::DEFAULT_ACQUIRE_TIMEOUT_SECS,
            )?,
            idle_timeout_secs: parse_var(
                &var,
                "DB_IDLE_TIMEOUT_SECS",
                Self::DEFAULT_IDLE_TIMEOUT_SECS,
            )?,
            max_lifetime_secs: parse_var(
                &var,
                "DB_MAX_LIFETIME_SECS",
                Self::DEFAULT_MAX_LIFETIME_SECS,
            )?,
        })
    }
}

impl SwaggerConfig {
    pub fn from_lookup<F>(var: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            title: var("SWAGGER_TITLE").unwrap_or_else(|| "Ticketdesk API".to_string()),
            version: var("SWAGGER_VERSION").unwrap_or_else(|| "0.1.0".to_string()),
            description: var("SWAGGER_DESCRIPTION")
                .unwrap_or_else(|| "Support ticket management API".to_string()),
        }
    }
}

impl ClassifierConfig {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.openai.com/v1";
    pub const DEFAULT_MODEL: &'static str = "gpt-3.5-turbo";
    const DEFAULT_TIMEOUT_SECS: u64 = 5;

    pub fn from_lookup<F>(var: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Only use the key if it is non-empty
        let api_key = var("OPENAI_API_KEY")
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());

        let base_url = var("OPENAI_BASE_URL")
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| Self::DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let model = var("OPENAI_MODEL")
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| Self::DEFAULT_MODEL.to_string());

        let timeout_secs = parse_var(&var, "CLASSIFIER_TIMEOUT_SECS", Self::DEFAULT_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            return Err("CLASSIFIER_TIMEOUT_SECS must be greater than 0".to_string());
        }

        Ok(Self {
            api_key,
            base_url,
            model,
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// Whether a credential is present (service mode)
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}
