use std::sync::Arc;

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Config;
use secmaster_core::securities::{SecurityMasterService, SecurityMasterServiceTrait};
use secmaster_openfigi::OpenFigiClient;
use secmaster_storage_sqlite::{
    db::{self, write_actor},
    SecurityRepository,
};

pub struct AppState {
    pub security_master: Arc<dyn SecurityMasterServiceTrait>,
}

/// Logs go to stderr; stdout carries command output.
pub fn init_tracing(log_format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_line_number(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

/// Opens the store and wires the service. Must run inside a tokio runtime.
pub fn build_state(config: &Config) -> anyhow::Result<AppState> {
    let db_path = db::init(&config.db_path)?;
    tracing::info!("Database path in use: {}", db_path);

    let pool = db::create_pool(&db_path)?;
    db::run_migrations(&pool)?;
    let writer = write_actor::spawn_writer((*pool).clone());

    let repository = Arc::new(SecurityRepository::new(pool.clone(), writer));
    let mapper = Arc::new(OpenFigiClient::new(config.figi.clone())?);
    let service = SecurityMasterService::new(repository, mapper)
        .with_config(config.security_master());

    Ok(AppState {
        security_master: Arc::new(service),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use secmaster_core::errors::Error;

    #[tokio::test]
    async fn test_build_state_creates_database() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("nested").join("secmaster.db");

        let mut config = Config::from_env();
        config.db_path = db_path.to_string_lossy().to_string();

        let state = build_state(&config).unwrap();
        assert!(db_path.exists());
        assert!(matches!(
            state.security_master.get_security("missing"),
            Err(Error::NotFound(_))
        ));
    }
}
