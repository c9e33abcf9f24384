use anyhow::Result;
use landing_i18n_core::config::Config;
use landing_i18n_core::jobs::{self, Services};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("landing_i18n_core=info".parse()?),
        )
        .init();

    let config = Config::from_env()?;
    if !config.auto_update_enabled {
        info!("Auto-update is disabled, nothing to do");
        return Ok(());
    }

    let services = Services::from_config(&config)?;
    match jobs::run_sync_job(&services).await {
        Ok(outcome) => {
            info!(
                "Sync finished: {} keys, {} validation issues",
                outcome.stats.total_keys, outcome.validation_issues
            );
            Ok(())
        }
        Err(e) => {
            error!("Translation sync job failed: {:#}", e);
            services.notify_failure(&e).await;
            Err(e)
        }
    }
}
