use anyhow::{Context, Result};
use assetdao_portal::{
    chain::{
        gateway::{ChainClient, ChainGateway},
        wallet::JsonRpcWallet,
    },
    config,
    proposals::reader::ProposalReader,
    store,
    tasks::reconcile::run_periodic_mirror_reconcile,
};
use chrono::Duration as VotingPeriod;
use dotenv::dotenv;
use std::{sync::Arc, time::Duration};
use tracing::{error, info, instrument};
use utils::tracing::setup_tracing;

#[instrument]
#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    setup_tracing();
    info!("Application starting up");

    config::load().context("Failed to load portal config")?;
    let cfg = config::get_config();

    store::initialize_db()
        .await
        .context("Failed to initialize database")?;
    let db = store::db().clone();

    let dao_address = cfg
        .contracts
        .dao_address
        .parse()
        .context("Invalid DAO contract address")?;

    let connector = Arc::new(
        JsonRpcWallet::connect(&cfg.network.wallet_rpc_url)
            .context("Failed to connect wallet bridge")?,
    );
    let gateway = Arc::new(ChainGateway::new(
        cfg.network.clone(),
        connector,
        cfg.retries.receipt_poll_policy(),
        cfg.retries.default_gas_price_wei,
    ));
    gateway
        .initialize_read_only()
        .await
        .context("Failed to initialize read-only chain connection")?;
    let session_watcher = gateway.clone().spawn_session_watcher();

    let chain: Arc<dyn ChainClient> = gateway.clone();
    let reader = Arc::new(ProposalReader::with_default_sources(
        chain,
        db.clone(),
        dao_address,
        VotingPeriod::days(cfg.governance.voting_period_days),
    ));

    let reconcile_interval = Duration::from_secs(cfg.retries.reconcile_interval_secs);
    let reconcile_handle = tokio::spawn(async move {
        if let Err(e) = run_periodic_mirror_reconcile(reader, db, reconcile_interval).await {
            error!("Error in periodic mirror reconciliation task: {:?}", e);
        }
    });

    info!("All tasks started, application running indefinitely");

    tokio::select! {
        result = reconcile_handle => {
            error!("Mirror reconciliation task completed unexpectedly: {:?}", result);
        }
        result = session_watcher => {
            error!("Wallet session watcher completed unexpectedly: {:?}", result);
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully");
        }
    }

    info!("Application shutting down");
    Ok(())
}
