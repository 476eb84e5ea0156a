use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    /// Allowed origins. Empty or containing `*` allows any origin.
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

impl CorsConfig {
    pub fn allows_any(&self) -> bool {
        self.allow_origins.is_empty() || self.allow_origins.iter().any(|o| o == "*")
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// HS256 secret shared with the identity provider.
    pub jwt_secret: String,
    /// Expected `aud` claim. Audience is not checked when unset.
    pub audience: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PolishConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Directory the photo bucket lives in.
    pub root: String,
    /// Max accepted photo size in bytes.
    pub max_photo_size: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RateLimitConfig {
    /// Requests allowed per window and client IP. 0 disables limiting.
    pub max_requests: u32,
    pub window_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub polish: PolishConfig,
    pub storage: StorageConfig,
    pub rate_limit: RateLimitConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.cors.allow_origins", Vec::<String>::new())?
            .set_default("server.cors.max_age", 3600)?
            .set_default("database.max_connections", 20)?
            .set_default("database.min_connections", 2)?
            .set_default("polish.model", "gpt-4o")?
            .set_default("polish.base_url", "https://api.openai.com/v1")?
            .set_default("polish.timeout_secs", 60)?
            .set_default("storage.root", "./data/photos")?
            .set_default("storage.max_photo_size", 10 * 1024 * 1024)?
            .set_default("rate_limit.max_requests", 100)?
            .set_default("rate_limit.window_secs", 15 * 60)?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., JOURNAL__AUTH__JWT_SECRET)
            .add_source(
                Environment::with_prefix("JOURNAL")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.cors.allow_origins")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = s.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject blank credentials so a misconfigured deployment fails at startup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("database.url", &self.database.url),
            ("auth.jwt_secret", &self.auth.jwt_secret),
            ("polish.api_key", &self.polish.api_key),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::Message(format!("{key} must not be empty")));
            }
        }
        if self.polish.timeout_secs == 0 {
            return Err(ConfigError::Message(
                "polish.timeout_secs must be greater than 0".into(),
            ));
        }
        if self.rate_limit.max_requests > 0 && self.rate_limit.window_secs == 0 {
            return Err(ConfigError::Message(
                "rate_limit.window_secs must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}
