//! Relayer - observes ledger intents on every configured chain and submits
//! the authenticated reports that deliver them to their destination chain.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};

use xchain_settlement::api::{self, AppState};
use xchain_settlement::chain::{ChainDirectory, ChainManager, KnownSelectors};
use xchain_settlement::config::Settings;
use xchain_settlement::coordination::{
    ChainTrigger, IntentPipeline, OutcomeTallies, Preflight, RelayEngine, TracingSink,
};
use xchain_settlement::metrics::{self, MetricsServer};
use xchain_settlement::tx::{gas, TransactionSender};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    init_logging();

    info!("Starting relayer v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let settings = Settings::load()?;
    info!(
        "Loaded configuration for {} chains",
        settings.enabled_chains().len()
    );

    let directory = Arc::new(ChainDirectory::from_settings(&settings, &KnownSelectors)?);

    // Initialize chain manager (handles all chain connections)
    let chain_manager = Arc::new(ChainManager::new(&settings)?);
    info!(
        "Chain connections initialized: {:?}",
        chain_manager.connected_chains()
    );

    let wallet = TransactionSender::load_wallet(&settings.wallet)?;
    let tallies = Arc::new(OutcomeTallies::new());
    let preflight = Preflight {
        check_fee_token: settings.relayer.check_fee_token,
        check_token: settings.relayer.check_token,
    };

    // One pipeline per enabled chain
    let mut engine = RelayEngine::new(
        Arc::new(TracingSink::new(tallies.clone())),
        settings.relayer.channel_capacity,
    );
    for (name, chain_config) in settings.enabled_chains() {
        let entry = directory
            .by_name(name)
            .cloned()
            .with_context(|| format!("Chain {} missing from directory", name))?;
        let entry_selector = entry.selector;
        let provider = chain_manager.get_provider(name)?;
        let sender = TransactionSender::new(provider.clone(), wallet.clone());

        let pipeline = IntentPipeline::new(
            entry,
            directory.clone(),
            provider,
            Arc::new(sender),
            preflight,
        )
        .with_send_gas_limit(Some(gas::resolve_send_gas_limit(&settings.relayer)))
        .with_dest_gas_limit(gas::destination_gas_limit(&settings.relayer));

        info!(
            chain = %name,
            selector = entry_selector,
            tokens = ?chain_config.tokens.keys().collect::<Vec<_>>(),
            "Relaying chain"
        );
        engine.register(
            name.clone(),
            ChainTrigger {
                source: chain_manager.get_listener(name)?,
                pipeline: Arc::new(pipeline),
                poll_interval: Duration::from_millis(chain_config.poll_interval_ms),
            },
        )?;
    }
    let engine = Arc::new(engine);
    info!("Relay engine initialized");

    // Start API server
    let api_handle = tokio::spawn({
        let config = settings.api.clone();
        let state = AppState {
            instance_id: settings.relayer.instance_id.clone(),
            directory: directory.clone(),
            tallies: tallies.clone(),
        };
        async move {
            if let Err(e) = api::run_server(config, state).await {
                error!("API server error: {}", e);
            }
        }
    });

    // Start metrics server
    let metrics_handle = if settings.metrics.enabled {
        let server = MetricsServer::new(settings.metrics.port);
        Some(tokio::spawn(async move {
            if let Err(e) = server.run().await {
                error!("Metrics server error: {}", e);
            }
        }))
    } else {
        None
    };

    // Start relay engine
    let engine_handle = tokio::spawn({
        let engine = engine.clone();
        async move {
            if let Err(e) = engine.run().await {
                error!("Relay engine error: {}", e);
            }
        }
    });

    // Health check loop
    let health_handle = tokio::spawn({
        let chain_manager = chain_manager.clone();
        let interval = settings.relayer.health_check_interval_secs;
        async move {
            loop {
                tokio::time::sleep(Duration::from_secs(interval)).await;

                for (chain, healthy) in chain_manager.health_check().await {
                    if !healthy {
                        warn!("Chain {} health check failed", chain);
                    }
                }

                metrics::record_health_check();
            }
        }
    });

    info!("Relayer is running");
    info!("API server: http://{}:{}", settings.api.host, settings.api.port);
    if settings.metrics.enabled {
        info!("Metrics: http://0.0.0.0:{}/metrics", settings.metrics.port);
    }

    // Wait for shutdown signal
    shutdown_signal().await;

    info!("Shutdown signal received, stopping...");

    // Graceful shutdown: listeners stop, queued logs drain
    engine.stop().await;
    if let Err(e) = engine_handle.await {
        warn!("Relay engine task ended abnormally: {}", e);
    }

    // Abort background tasks
    api_handle.abort();
    health_handle.abort();
    if let Some(h) = metrics_handle {
        h.abort();
    }

    info!("Relayer stopped");
    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,xchain_settlement=debug,hyper=warn"));

    let json = std::env::var("RELAYER_LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json().with_target(true)).init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_thread_ids(true))
            .init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
