use secrecy::Secret;
use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectsConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub store: StoreBackend,
    pub mongodb: MongoConfig,
    pub sheet: SheetConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<Secret<String>>,
    pub auth_source: Option<String>,
    pub app_name: String,
    pub collection: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SheetConfig {
    /// Largest row range a single bulk upsert may cover.
    pub max_batch_rows: usize,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    MongoDb,
    Memory,
}

impl ProjectsConfig {
    pub fn load() -> Result<Self, AppError> {
        // Load common config (handles .env, PORT and APP__ prefix)
        let common_config = core_config::Config::load()?;

        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        Ok(ProjectsConfig {
            common: common_config,
            store: get_env("STORE_BACKEND", Some("mongodb"), false)?
                .parse()
                .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?,
            mongodb: MongoConfig {
                uri: get_env("MONGODB_URI", Some("mongodb://localhost:27017"), is_prod)?,
                database: get_env("MONGODB_DATABASE", Some("projects_db"), is_prod)?,
                username: env::var("MONGODB_USERNAME").ok(),
                password: env::var("MONGODB_PASSWORD").ok().map(Secret::new),
                auth_source: env::var("MONGODB_AUTH_SOURCE").ok(),
                app_name: get_env("MONGODB_APP_NAME", Some("projects-service"), false)?,
                collection: get_env("PROJECTS_COLLECTION", Some("projects"), false)?,
            },
            sheet: SheetConfig {
                max_batch_rows: get_env("SHEET_MAX_ROWS", Some("500"), false)?
                    .parse()
                    .map_err(|e| {
                        AppError::ConfigError(anyhow::anyhow!("Invalid SHEET_MAX_ROWS: {}", e))
                    })?,
            },
        })
    }
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mongodb" | "mongo" => Ok(StoreBackend::MongoDb),
            "memory" => Ok(StoreBackend::Memory),
            _ => Err(format!("Invalid store backend: {}", s)),
        }
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required in production but not set",
                    key
                ))))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required but not set",
                    key
                ))))
            }
        }
    }
}
