use crate::error::AppError;
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub fcm: FcmConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FcmConfig {
    pub project_id: String,
    /// Path to the Google service-account JSON file.
    pub credentials_path: String,
    pub enabled: bool,
}

impl AppConfig {
    pub fn load() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        Ok(AppConfig {
            server: ServerConfig {
                host: get_env("HOST", Some("localhost"), is_prod)?,
                port: get_env("PORT", Some("5000"), is_prod)?
                    .parse()
                    .map_err(|e| {
                        AppError::Config(anyhow::anyhow!("PORT must be a port number: {}", e))
                    })?,
            },
            fcm: FcmConfig {
                project_id: get_env("FCM_PROJECT_ID", Some(""), is_prod)?,
                credentials_path: get_env(
                    "FCM_CREDENTIALS_PATH",
                    Some("config/serviceAccount.json"),
                    is_prod,
                )?,
                enabled: env::var("FCM_ENABLED")
                    .unwrap_or_else(|_| "false".to_string())
                    .parse()
                    .unwrap_or(false),
            },
        })
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::Config(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::Config(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_rejects_a_malformed_port() {
        std::env::set_var("PORT", "not-a-port");
        let result = AppConfig::load();
        std::env::remove_var("PORT");

        assert!(matches!(result, Err(AppError::Config(_))));
    }
}
