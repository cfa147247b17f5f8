use anyhow::Context;
use nws::NwsSettings;
use serde::Deserialize;
use shared_kernel::configuration::config;

#[derive(Debug, Deserialize)]
pub struct RedisSettings {
    pub host: String,
}

fn default_interval_seconds() -> u64 {
    120
}

fn default_ledger_concurrency() -> usize {
    16
}

#[derive(Debug, Deserialize)]
pub struct PollerSettings {
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u64,
    #[serde(default)]
    pub run_on_startup: bool,
    #[serde(default = "default_ledger_concurrency")]
    pub ledger_concurrency: usize,
}

impl PollerSettings {
    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.interval_seconds > 0,
            "poller.interval_seconds must be at least 1"
        );
        anyhow::ensure!(
            self.ledger_concurrency > 0,
            "poller.ledger_concurrency must be at least 1"
        );
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub redis: RedisSettings,
    pub nws: NwsSettings,
    pub poller: PollerSettings,
}

impl Settings {
    pub fn parse() -> anyhow::Result<Settings> {
        let settings = config::<Settings>()
            .context("Failed to deserialize settings to alert_poller settings")?;
        settings.poller.validate()?;
        Ok(settings)
    }
}
