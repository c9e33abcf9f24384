//! Prints a JSON health report: monitoring metrics, translation coverage,
//! validation issues and strings missing from the locale files.

use anyhow::{Context, Result};
use landing_i18n_core::config::Config;
use landing_i18n_core::i18n::LocaleStore;
use landing_i18n_core::jobs::{self, Services};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    // Logs go to stderr so stdout stays valid JSON
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("landing_i18n_core=info".parse()?),
        )
        .init();

    let config = Config::from_env()?;
    let services = Services::from_config(&config)?;
    let locales = LocaleStore::new(config.locales_dir.clone());

    let report = jobs::run_report_job(&services, &locales).await?;
    let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
    println!("{}", json);

    Ok(())
}
