use arc_data::exchange::gateio::symbol::GateioSymbolMapper;
use arc_data::exchange::gateio::GateioProtocol;
use arc_data::exchange::mexc::symbol::MexcSymbolMapper;
use arc_data::exchange::mexc::subscription::MexcProtocol;
use arc_data::{Channel, MarketDataHub, SharedMarketDataHub, WebSocketClient};
use arc_engine::config::ArbitragePairConfig;
use arc_engine::execution::ExchangeHandle;
use arc_engine::{EngineConfig, SymbolResolver, TaskManager};
use arc_execution::client::gateio::GateioExecutionClient;
use arc_execution::client::mexc::MexcExecutionClient;
use arc_execution::ExecutionClient;
use arc_instrument::ExchangeId;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .json()
        .init();
}

fn default_pairs() -> Vec<ArbitragePairConfig> {
    vec![ArbitragePairConfig {
        id: "btc-usdt".to_string(),
        base_asset: "btc".to_string(),
        quote_asset: "usdt".to_string(),
        exchanges: vec![ExchangeId::GateioSpot, ExchangeId::MexcSpot],
        min_profit_bps: dec!(10),
        max_exposure_usd: dec!(5000),
        enabled: true,
        priority: 1,
    }]
}

fn default_risk_limits() -> arc_risk::RiskLimits {
    arc_risk::RiskLimits {
        max_position_size_usd: dec!(20000),
        min_profit_margin_bps: dec!(5),
        max_concurrent_tasks: 8,
        max_order_notional_usd: dec!(5000),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let config = EngineConfig::from_env(
        default_pairs(),
        default_risk_limits(),
        std::path::PathBuf::from("./arcflux-tasks"),
    )?;
    info!(dry_run = config.dry_run, pairs = config.pairs.len(), "arcflux starting");

    let gateio_mapper: Arc<dyn arc_instrument::SymbolMapper + Send + Sync> = Arc::new(GateioSymbolMapper::default());
    let mexc_mapper: Arc<dyn arc_instrument::SymbolMapper + Send + Sync> = Arc::new(MexcSymbolMapper::default());

    let (gateio_key, gateio_secret) = config
        .gateio_credentials
        .as_ref()
        .map(|c| (c.api_key.clone(), c.api_secret.clone()))
        .unwrap_or_default();
    let (mexc_key, mexc_secret) = config
        .mexc_credentials
        .as_ref()
        .map(|c| (c.api_key.clone(), c.api_secret.clone()))
        .unwrap_or_default();

    let gateio_client = Arc::new(GateioExecutionClient::new(gateio_key, gateio_secret, gateio_mapper.clone()));
    let mexc_client = Arc::new(MexcExecutionClient::new(mexc_key, mexc_secret, mexc_mapper.clone()));

    let gateio_handle = ExchangeHandle::Gateio(gateio_client.clone());
    let mexc_handle = ExchangeHandle::Mexc(mexc_client.clone());

    info!("fetching symbol info from both exchanges to resolve configured pairs");
    let gateio_symbols = gateio_client.fetch_symbol_info().await.unwrap_or_else(|error| {
        warn!(%error, "failed to fetch Gate.io symbol info, proceeding with an empty set");
        Vec::new()
    });
    let mexc_symbols = mexc_client.fetch_symbol_info().await.unwrap_or_else(|error| {
        warn!(%error, "failed to fetch MEXC symbol info, proceeding with an empty set");
        Vec::new()
    });

    let resolver = SymbolResolver::build([
        (ExchangeId::GateioSpot, gateio_symbols),
        (ExchangeId::MexcSpot, mexc_symbols),
    ]);
    let resolved_pairs = resolver.resolve_all(&config.pairs);
    info!(resolved = resolved_pairs.len(), configured = config.pairs.len(), "symbol resolution complete");

    let hub: SharedMarketDataHub = Arc::new(MarketDataHub::new());

    let gateio_rest = Arc::new(arc_data::exchange::gateio::rest::public_client());
    let mexc_rest = Arc::new(arc_data::exchange::mexc::rest::public_client());
    {
        let hub = hub.clone();
        let gateio_rest = gateio_rest.clone();
        let mexc_rest = mexc_rest.clone();
        let gateio_mapper = gateio_mapper.clone();
        let mexc_mapper = mexc_mapper.clone();
        hub.on_sequence_gap(move |exchange, symbol| {
            let hub = hub.clone();
            let gateio_rest = gateio_rest.clone();
            let mexc_rest = mexc_rest.clone();
            let gateio_mapper = gateio_mapper.clone();
            let mexc_mapper = mexc_mapper.clone();
            tokio::spawn(async move {
                let snapshot = match exchange {
                    ExchangeId::GateioSpot => match gateio_mapper.to_pair(&symbol) {
                        Ok(pair) => arc_data::exchange::gateio::rest::fetch_order_book_snapshot(&gateio_rest, &pair, 100).await,
                        Err(error) => {
                            warn!(%error, %symbol, "cannot resolve pair for resync");
                            return;
                        }
                    },
                    ExchangeId::MexcSpot => match mexc_mapper.to_pair(&symbol) {
                        Ok(pair) => arc_data::exchange::mexc::rest::fetch_order_book_snapshot(&mexc_rest, &pair, 100).await,
                        Err(error) => {
                            warn!(%error, %symbol, "cannot resolve pair for resync");
                            return;
                        }
                    },
                };

                match snapshot {
                    Ok((bids, asks, update_id)) => {
                        info!(%symbol, ?exchange, "resynced order book from REST after sequence gap");
                        hub.ingest(
                            exchange,
                            arc_data::MarketEvent::OrderBookSnapshot {
                                symbol,
                                bids,
                                asks,
                                timestamp: chrono::Utc::now(),
                                update_id,
                            },
                        );
                    }
                    Err(error) => warn!(%error, %symbol, ?exchange, "failed to fetch REST snapshot after sequence gap"),
                }
            });
        });
    }

    let gateio_ws = WebSocketClient::new(GateioProtocol::new(gateio_mapper.clone()));
    let mexc_ws = WebSocketClient::new(MexcProtocol::new(mexc_mapper.clone()));

    let symbols: Vec<_> = resolved_pairs.iter().map(|pair| pair.symbol.clone()).collect();
    gateio_ws.subscribe(symbols.clone(), vec![Channel::OrderBookL2, Channel::Trades]);
    mexc_ws.subscribe(symbols.clone(), vec![Channel::OrderBookL2, Channel::Trades]);

    let (gateio_shutdown_tx, gateio_shutdown_rx) = tokio::sync::oneshot::channel();
    let (mexc_shutdown_tx, mexc_shutdown_rx) = tokio::sync::oneshot::channel();

    let gateio_hub = hub.clone();
    let gateio_ws_handle = tokio::spawn(async move {
        gateio_ws
            .run(|event| gateio_hub.ingest(ExchangeId::GateioSpot, event), gateio_shutdown_rx)
            .await;
    });

    let mexc_hub = hub.clone();
    let mexc_ws_handle = tokio::spawn(async move {
        mexc_ws
            .run(|event| mexc_hub.ingest(ExchangeId::MexcSpot, event), mexc_shutdown_rx)
            .await;
    });

    let mut task_manager = TaskManager::new(config.task_store_dir.clone());
    let balance_sync_tracker_gateio = Arc::new(arc_execution::tracker::PrivateStateTracker::default());
    let balance_sync_tracker_mexc = Arc::new(arc_execution::tracker::PrivateStateTracker::default());

    match arc_engine::task::load_persisted_tasks(&config.task_store_dir) {
        Ok(snapshots) if !snapshots.is_empty() => {
            info!(recovered = snapshots.len(), "reconciling persisted tasks from a prior run");
            for snapshot in snapshots {
                if snapshot.task_type != "spot_futures_arbitrage" {
                    warn!(task_id = %snapshot.task_id, task_type = %snapshot.task_type, "no recovery path for this task type, dropping its stale snapshot");
                    let _ = arc_engine::task::remove_persisted_task(&config.task_store_dir, &snapshot.task_id);
                    continue;
                }
                match arc_engine::task::tasks::SpotFuturesArbitrageTask::from_snapshot(
                    snapshot.task_id.clone(),
                    &snapshot.context,
                    gateio_handle.clone(),
                    mexc_handle.clone(),
                    balance_sync_tracker_gateio.clone(),
                    balance_sync_tracker_mexc.clone(),
                    hub.clone(),
                    config.risk_limits.clone(),
                )
                .await
                {
                    Ok(task) => task_manager.spawn(Box::new(task)),
                    Err(error) => error!(task_id = %snapshot.task_id, %error, "failed to reconcile persisted task, dropping it"),
                }
            }
        }
        Ok(_) => {}
        Err(error) => error!(%error, "failed to enumerate persisted tasks"),
    }

    task_manager.spawn(Box::new(arc_engine::task::BalanceSyncTask::new(
        gateio_handle.clone(),
        balance_sync_tracker_gateio,
        Duration::from_secs(30),
        chrono::Utc::now().timestamp_millis(),
    )));
    task_manager.spawn(Box::new(arc_engine::task::BalanceSyncTask::new(
        mexc_handle.clone(),
        balance_sync_tracker_mexc,
        Duration::from_secs(30),
        chrono::Utc::now().timestamp_millis(),
    )));

    let mut scan_interval = tokio::time::interval(config.scan_interval);
    let mut shutdown = std::pin::pin!(tokio::signal::ctrl_c());

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("shutdown signal received");
                break;
            }
            _ = scan_interval.tick() => {
                for pair in &resolved_pairs {
                    if let Some(opportunity) = crate_scan(&hub, pair, &config) {
                        info!(
                            opportunity_id = %opportunity.opportunity_id,
                            symbol = %opportunity.symbol,
                            buy_exchange = %opportunity.buy_exchange,
                            sell_exchange = %opportunity.sell_exchange,
                            net_spread_pct = %opportunity.spread_pct,
                            "arbitrage opportunity detected"
                        );
                    }
                }

                task_manager.tick_all().await;
            }
        }
    }

    let _ = gateio_shutdown_tx.send(());
    let _ = mexc_shutdown_tx.send(());
    let _ = gateio_ws_handle.await;
    let _ = mexc_ws_handle.await;

    Ok(())
}

fn crate_scan(
    hub: &MarketDataHub,
    pair: &arc_engine::ResolvedArbitragePair,
    config: &EngineConfig,
) -> Option<arc_engine::ArbitrageOpportunity> {
    let id = format!("{}-{}", pair.id, chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default());
    arc_engine::scanner::scan_pair(
        hub,
        pair,
        config.market_data_staleness,
        config.scan_interval,
        chrono::Utc::now(),
        || id,
    )
}
