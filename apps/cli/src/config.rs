use secmaster_core::securities::{
    SecurityMasterConfig, DEFAULT_BATCH_CONCURRENCY, DEFAULT_ENRICHMENT_COOLDOWN_DAYS,
};
use secmaster_openfigi::FigiConfig;

const DEFAULT_DB_PATH: &str = "./db/secmaster.db";

/// Process configuration, read from the environment (and `.env` when present).
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    pub log_format: String,
    pub enrichment_cooldown_days: i64,
    pub batch_concurrency: usize,
    pub figi: FigiConfig,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let mut config = Self::from_lookup(|key| std::env::var(key).ok());
        config.figi = FigiConfig::from_env();
        config
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            db_path: value("SECMASTER_DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.to_string()),
            log_format: value("SECMASTER_LOG_FORMAT").unwrap_or_else(|| "text".to_string()),
            enrichment_cooldown_days: value("SECMASTER_ENRICH_COOLDOWN_DAYS")
                .and_then(|v| v.trim().parse::<i64>().ok())
                .filter(|days| *days >= 0)
                .unwrap_or(DEFAULT_ENRICHMENT_COOLDOWN_DAYS),
            batch_concurrency: value("SECMASTER_BATCH_CONCURRENCY")
                .and_then(|v| v.trim().parse::<usize>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_BATCH_CONCURRENCY),
            figi: FigiConfig::default(),
        }
    }

    pub fn security_master(&self) -> SecurityMasterConfig {
        SecurityMasterConfig {
            enrichment_cooldown: chrono::Duration::days(self.enrichment_cooldown_days),
            batch_concurrency: self.batch_concurrency,
        }
    }
}
