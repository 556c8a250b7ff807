use std::sync::Arc;

use tonbag_provider::application::{build_scheduler, AgentServices};
use tonbag_provider::config::AppConfig;
use tonbag_provider::infrastructure::persistence::{DbPool, RepositoryFactory};
use tonbag_provider::infrastructure::proof::HttpProofGenerator;
use tonbag_provider::infrastructure::storage_daemon::TonutilsStorageClient;
use tonbag_provider::infrastructure::ton::ProviderFactory;
use tonbag_provider::utils::{logging, SystemClock};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_logger();

    let config = AppConfig::from_env();
    logging::log_info(&format!(
        "Starting tonbag-provider {} on {}",
        env!("CARGO_PKG_VERSION"),
        ProviderFactory::get_provider_name(&config.ton)
    ));

    let db_pool = DbPool::new(&config.database).await?;
    db_pool.run_migrations().await?;
    let repositories = RepositoryFactory::create_repositories(&db_pool);

    let provider = ProviderFactory::create_provider(&config.ton);
    let wallet = ProviderFactory::create_wallet(&config.wallet).await?;
    logging::log_info(&format!("Provider wallet: {}", wallet.address()));
    let contract = ProviderFactory::create_storage_contract(provider.clone(), wallet);

    let services = AgentServices {
        conn: db_pool.get_connection().clone(),
        repositories,
        provider,
        contract,
        daemon: Arc::new(TonutilsStorageClient::new(config.storage_daemon.url.clone())),
        proofs: Arc::new(HttpProofGenerator::new(config.proof.url.clone())),
        clock: Arc::new(SystemClock),
    };

    let scheduler = build_scheduler(&config, services);
    scheduler
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                logging::log_error(&format!("Failed to listen for Ctrl+C: {}", e));
                std::future::pending::<()>().await;
            }
        })
        .await?;

    logging::log_info("Shutdown complete");
    Ok(())
}
