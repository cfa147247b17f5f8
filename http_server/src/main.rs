use crate::app_container::Application;
use crate::configuration::Settings;
use actix_web::{web, App, HttpServer};
use anyhow::Context;
use nws::NwsZoneResolver;
use redis_client::client::Client;
use shared_kernel::http_client::HttpClient;
use shared_kernel::tracing::{config_telemetry, shutdown_global_tracer_provider};
use std::sync::Arc;
use tracing_actix_web::TracingLogger;
use use_cases::registration::RegistrationInteractorImpl;

mod app_container;
mod configuration;
mod routes;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    config_telemetry("http_server")?;
    let result = start().await;
    shutdown_global_tracer_provider();
    result
}

async fn start() -> anyhow::Result<()> {
    let settings = Settings::parse()?;
    let store = Arc::new(Client::connect(&settings.redis.host).await?);
    let zone_resolver = Arc::new(NwsZoneResolver::new(HttpClient::new(), settings.nws));
    let registration =
        RegistrationInteractorImpl::new(zone_resolver, store.clone(), store);
    let app = web::Data::new(Application::new(Arc::new(registration)));

    HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .configure(routes::config)
            .app_data(app.clone())
    })
    .bind((settings.application.host, settings.application.port))?
    .run()
    .await
    .context("Server failed to run")
}
