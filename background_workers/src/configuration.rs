use anyhow::{anyhow, Context};
use async_once::AsyncOnce;
use lazy_static::lazy_static;
use redis_client::client::Client;
use secrecy::Secret;
use serde::Deserialize;
use shared_kernel::configuration::config;

#[derive(Debug, Deserialize, Clone)]
pub struct EmailConfig {
    pub host: String,
    pub auth_token: Secret<String>,
    pub sender: String,
}

#[derive(Debug, Deserialize)]
pub struct RedisSettings {
    pub host: String,
}

#[derive(Deserialize, Debug)]
pub struct ExternalApiRateLimits {
    /// Emails per second across all consumers.
    pub email: usize,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub email: EmailConfig,
    pub redis: RedisSettings,
    pub external_api_rate_limits: ExternalApiRateLimits,
}

impl Settings {
    pub fn parse() -> anyhow::Result<Settings> {
        config::<Settings>().context("Failed to deserialize settings to background_worker settings")
    }
}

// Tasks are plain functions invoked by the celery runtime, so the consumer
// side resolves its collaborators lazily.
lazy_static! {
    static ref SETTINGS_CONFIG: anyhow::Result<Settings> = Settings::parse();
    static ref REDIS: AsyncOnce<anyhow::Result<Client>> = AsyncOnce::new(async {
        let host = &settings()?.redis.host;
        Client::connect(host).await
    });
}

pub fn settings() -> anyhow::Result<&'static Settings> {
    SETTINGS_CONFIG
        .as_ref()
        .map_err(|err| anyhow!("Background worker settings are unavailable: {err:?}"))
}

pub async fn redis_connection() -> anyhow::Result<Client> {
    REDIS
        .get()
        .await
        .as_ref()
        .map(Client::clone)
        .map_err(|err| anyhow!("Redis is unavailable: {err:?}"))
}
