use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Placeholder secret written into fresh configs. `validate` refuses to run a
/// server with it unless explicitly allowed.
pub const INSECURE_DEFAULT_SECRET: &str = "change-me-to-a-long-random-secret";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub auth: AuthConfig,

    pub security: SecurityConfig,

    pub history: HistoryConfig,

    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    /// Maximum database connections (default: 5)
    pub max_db_connections: u32,

    /// Minimum database connections (default: 1)
    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/gridwatch.db".to_string(),
            log_level: "info".to_string(),
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub enabled: bool,

    pub port: u16,

    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 8000,
            cors_allowed_origins: vec![
                "http://localhost:8000".to_string(),
                "http://127.0.0.1:8000".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Symmetric signing key for access tokens.
    /// Overridden by the `AUTH_SECRET_KEY` environment variable.
    pub secret_key: String,

    /// HMAC algorithm name: HS256, HS384 or HS512.
    /// Overridden by the `AUTH_ALGORITHM` environment variable.
    pub algorithm: String,

    /// Lifetime of tokens issued by the login endpoint.
    pub access_token_expire_minutes: u32,

    /// Lifetime used when a caller issues a token without an explicit ttl.
    pub default_token_expire_minutes: u32,

    /// Lets `validate` pass with the placeholder secret (tests, local demos).
    pub allow_insecure_secret: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret_key: INSECURE_DEFAULT_SECRET.to_string(),
            algorithm: "HS256".to_string(),
            access_token_expire_minutes: 30,
            default_token_expire_minutes: 15,
            allow_insecure_secret: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Argon2 memory cost in KiB (default: 8192 = 8MB)
    pub argon2_memory_cost_kib: u32,

    /// Argon2 time cost (iterations)
    pub argon2_time_cost: u32,

    /// Argon2 parallelism (default: 1)
    pub argon2_parallelism: u32,

    /// Minimum accepted password length on registration and password change.
    pub min_password_length: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            argon2_memory_cost_kib: 8192,
            argon2_time_cost: 3,
            argon2_parallelism: 1,
            min_password_length: 6,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Window length used when a history query omits `start_time`.
    pub default_window_hours: u32,

    /// Spacing used when a history query omits `interval_minutes`.
    pub default_interval_minutes: i64,

    /// Upper bound on points per synthesized series.
    pub max_points: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            default_window_hours: 24,
            default_interval_minutes: 5,
            max_points: 10_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,

    pub loki_enabled: bool,

    pub loki_url: String,

    pub loki_labels: std::collections::HashMap<String, String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        let mut labels = std::collections::HashMap::new();
        labels.insert("app".to_string(), "gridwatch".to_string());

        Self {
            metrics_enabled: true,
            loki_enabled: false,
            loki_url: "http://localhost:3100".to_string(),
            loki_labels: labels,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            server: ServerConfig::default(),
            auth: AuthConfig::default(),
            security: SecurityConfig::default(),
            history: HistoryConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        // A missing .env is the normal case outside development.
        let _ = dotenvy::dotenv();

        let mut config = Self::load_file()?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn load_file() -> Result<Self> {
        for path in &Self::config_paths() {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Environment variables win over the config file, matching the variable
    /// names used by existing deployments.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("DATABASE_URL")
            && !url.is_empty()
        {
            self.general.database_path = url;
        }

        if let Ok(secret) = std::env::var("AUTH_SECRET_KEY")
            && !secret.is_empty()
        {
            self.auth.secret_key = secret;
        }

        if let Ok(algorithm) = std::env::var("AUTH_ALGORITHM")
            && !algorithm.is_empty()
        {
            self.auth.algorithm = algorithm;
        }
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("gridwatch").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".gridwatch").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.auth.secret_key.trim().is_empty() {
            anyhow::bail!("auth.secret_key cannot be empty");
        }

        if self.auth.secret_key == INSECURE_DEFAULT_SECRET {
            if self.auth.allow_insecure_secret {
                warn!("Using the placeholder auth secret; do not deploy this configuration");
            } else {
                anyhow::bail!(
                    "auth.secret_key is still the placeholder; set AUTH_SECRET_KEY or edit config.toml"
                );
            }
        }

        if !matches!(self.auth.algorithm.as_str(), "HS256" | "HS384" | "HS512") {
            anyhow::bail!(
                "Unsupported auth.algorithm '{}': expected HS256, HS384 or HS512",
                self.auth.algorithm
            );
        }

        if self.auth.access_token_expire_minutes == 0 || self.auth.default_token_expire_minutes == 0
        {
            anyhow::bail!("Token lifetimes must be > 0 minutes");
        }

        if self.history.default_interval_minutes <= 0 {
            anyhow::bail!("history.default_interval_minutes must be > 0");
        }

        if self.history.max_points == 0 {
            anyhow::bail!("history.max_points must be > 0");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.auth.access_token_expire_minutes, 30);
        assert_eq!(config.auth.default_token_expire_minutes, 15);
        assert_eq!(config.auth.algorithm, "HS256");
        assert_eq!(config.history.default_interval_minutes, 5);
        assert_eq!(config.history.default_window_hours, 24);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[auth]"));
        assert!(toml_str.contains("[history]"));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = toml::from_str("[auth]\nsecret_key = \"abc\"\n").unwrap();
        assert_eq!(config.auth.secret_key, "abc");
        assert_eq!(config.auth.algorithm, "HS256");
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn test_validate_rejects_placeholder_secret() {
        let config = Config::default();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.auth.allow_insecure_secret = true;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_unknown_algorithm() {
        let mut config = Config::default();
        config.auth.secret_key = "a-real-secret".to_string();
        config.auth.algorithm = "RS256".to_string();
        assert!(config.validate().is_err());

        config.auth.algorithm = "HS512".to_string();
        assert!(config.validate().is_ok());
    }
}
