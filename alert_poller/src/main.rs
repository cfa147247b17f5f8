use crate::configuration::Settings;
use crate::scheduler::Schedule;
use background_workers::producer::Producer;
use nws::NwsAlertSource;
use redis_client::client::Client;
use shared_kernel::http_client::HttpClient;
use shared_kernel::tracing::{config_telemetry, shutdown_global_tracer_provider};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use use_cases::fanout::{FanoutEngine, FanoutSettings};

mod configuration;
mod scheduler;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    config_telemetry("alert_poller")?;
    let result = start().await;
    shutdown_global_tracer_provider();
    result
}

async fn start() -> anyhow::Result<()> {
    let settings = Settings::parse()?;
    let store = Arc::new(Client::connect(&settings.redis.host).await?);
    let producer = Producer::new(settings.redis.host.clone()).await?;
    let alert_source = NwsAlertSource::new(HttpClient::new(), settings.nws);

    let engine = FanoutEngine::new(
        Arc::new(alert_source),
        store.clone(),
        store.clone(),
        store,
        Arc::new(producer),
        FanoutSettings {
            ledger_concurrency: settings.poller.ledger_concurrency,
        },
    );
    let schedule = Schedule {
        period: Duration::from_secs(settings.poller.interval_seconds),
        run_on_startup: settings.poller.run_on_startup,
    };
    info!(
        "Polling active alerts every {}s",
        settings.poller.interval_seconds
    );

    let engine = &engine;
    let cycles = scheduler::run_until(schedule, shutdown_signal(), move || async move {
        info!("Timer fired, running the fan-out cycle");
        engine.run_fanout_cycle().await;
    })
    .await;

    info!("Alert poller stopped after {cycles} cycles");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for ctrl-c: {err:?}");
        std::future::pending::<()>().await;
    }
}
