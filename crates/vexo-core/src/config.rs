//! Configuration module
//!
//! Environment-driven configuration for the validation service: server
//! settings, model-server endpoint, Drive OAuth paths, and ingestion limits.

use std::env;

// Common constants
const SERVER_PORT: u16 = 8000;
const MODEL_SERVER_URL: &str = "http://localhost:9000";
const MODEL_REQUEST_TIMEOUT_SECS: u64 = 60;
const OAUTH_CALLBACK_PORT: u16 = 8080;
const DRIVE_API_BASE_URL: &str = "https://www.googleapis.com/drive/v3";
const MAX_FILE_SIZE_MB: usize = 10;
const MAX_REQUEST_BODY_MB: usize = 64;

/// Application configuration, loaded once at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,
    // Inference sidecar
    pub model_server_url: String,
    pub model_request_timeout_secs: u64,
    // Drive OAuth
    pub credentials_path: String,
    pub token_path: String,
    pub oauth_callback_port: u16,
    pub drive_api_base_url: String,
    // Ingestion limits
    pub max_file_size_bytes: usize,
    pub max_request_body_bytes: usize,
    /// Whether zip validation descends into nested directories.
    pub zip_recurse_nested: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
        let is_production =
            environment.to_lowercase() == "production" || environment.to_lowercase() == "prod";
        if is_production && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        let max_file_size_mb = env::var("MAX_FILE_SIZE_MB")
            .unwrap_or_else(|_| MAX_FILE_SIZE_MB.to_string())
            .parse::<usize>()
            .unwrap_or(MAX_FILE_SIZE_MB);

        let max_request_body_mb = env::var("MAX_REQUEST_BODY_MB")
            .unwrap_or_else(|_| MAX_REQUEST_BODY_MB.to_string())
            .parse::<usize>()
            .unwrap_or(MAX_REQUEST_BODY_MB);

        let config = Config {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| SERVER_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            cors_origins,
            environment,
            model_server_url: env::var("MODEL_SERVER_URL")
                .unwrap_or_else(|_| MODEL_SERVER_URL.to_string()),
            model_request_timeout_secs: env::var("MODEL_REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|_| MODEL_REQUEST_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(MODEL_REQUEST_TIMEOUT_SECS),
            credentials_path: env::var("CREDENTIALS_PATH")
                .unwrap_or_else(|_| "credentials.json".to_string()),
            token_path: env::var("TOKEN_PATH").unwrap_or_else(|_| "token.json".to_string()),
            oauth_callback_port: env::var("OAUTH_CALLBACK_PORT")
                .unwrap_or_else(|_| OAUTH_CALLBACK_PORT.to_string())
                .parse()
                .unwrap_or(OAUTH_CALLBACK_PORT),
            drive_api_base_url: env::var("DRIVE_API_BASE_URL")
                .unwrap_or_else(|_| DRIVE_API_BASE_URL.to_string()),
            max_file_size_bytes: max_file_size_mb * 1024 * 1024,
            max_request_body_bytes: max_request_body_mb * 1024 * 1024,
            zip_recurse_nested: env::var("ZIP_RECURSE_NESTED")
                .unwrap_or_else(|_| "false".to_string())
                .to_lowercase()
                .parse()
                .unwrap_or(false),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.model_server_url.trim().is_empty() {
            return Err(anyhow::anyhow!("MODEL_SERVER_URL must not be empty"));
        }
        if !self.model_server_url.starts_with("http://")
            && !self.model_server_url.starts_with("https://")
        {
            return Err(anyhow::anyhow!(
                "MODEL_SERVER_URL must be an http(s) URL, got '{}'",
                self.model_server_url
            ));
        }
        if self.max_file_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_FILE_SIZE_MB must be greater than 0"));
        }
        if self.max_request_body_bytes < self.max_file_size_bytes {
            return Err(anyhow::anyhow!(
                "MAX_REQUEST_BODY_MB must be at least MAX_FILE_SIZE_MB"
            ));
        }
        Ok(())
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            server_port: 8000,
            cors_origins: vec!["*".to_string()],
            environment: "development".to_string(),
            model_server_url: "http://localhost:9000".to_string(),
            model_request_timeout_secs: 60,
            credentials_path: "credentials.json".to_string(),
            token_path: "token.json".to_string(),
            oauth_callback_port: 8080,
            drive_api_base_url: "https://www.googleapis.com/drive/v3".to_string(),
            max_file_size_bytes: 10 * 1024 * 1024,
            max_request_body_bytes: 64 * 1024 * 1024,
            zip_recurse_nested: false,
        }
    }

    #[test]
    fn test_validate_ok() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_non_http_model_url() {
        let mut config = base_config();
        config.model_server_url = "localhost:9000".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_body_limit_below_file_limit() {
        let mut config = base_config();
        config.max_request_body_bytes = config.max_file_size_bytes - 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_is_production() {
        let mut config = base_config();
        assert!(!config.is_production());
        config.environment = "Production".to_string();
        assert!(config.is_production());
        config.environment = "prod".to_string();
        assert!(config.is_production());
    }
}
