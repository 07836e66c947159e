// src/config.rs

use dotenvy::dotenv;
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub rust_log: String,
    /// Directory exported DOCX files are written to.
    pub export_dir: String,
    /// Age in seconds after which exported files are deleted by the cleanup job.
    pub export_retention_secs: u64,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://exam_bank.db?mode=rwc".to_string());

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let export_dir = env::var("EXPORT_DIR").unwrap_or_else(|_| "exports".to_string());

        let export_retention_secs = env::var("EXPORT_RETENTION_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3600);

        Self {
            database_url,
            rust_log,
            export_dir,
            export_retention_secs,
        }
    }
}
