use anyhow::Context;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// Directory holding the yaml files, relative to the working directory
/// unless `APP_CONFIGURATION_DIRECTORY` points somewhere else.
const CONFIGURATION_DIRECTORY: &str = "configuration";

pub fn config<Settings: DeserializeOwned>() -> anyhow::Result<Settings> {
    let configuration_directory = match std::env::var("APP_CONFIGURATION_DIRECTORY") {
        Ok(directory) => PathBuf::from(directory),
        Err(_) => std::env::current_dir()
            .context("Failed to determine the current directory")?
            .join(CONFIGURATION_DIRECTORY),
    };
    config_from(&configuration_directory)
}

/// Reads `base.yaml` (`test.yaml` in tests) from `directory` and overlays
/// `APP_`-prefixed environment variables, using `__` to reach nested keys,
/// e.g. `APP_POLLER__INTERVAL_SECONDS=60`.
pub fn config_from<Settings: DeserializeOwned>(directory: &Path) -> anyhow::Result<Settings> {
    let file = if cfg!(test) { "test.yaml" } else { "base.yaml" };
    let settings = config::Config::builder()
        .add_source(config::File::from(directory.join(file)))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()
        .with_context(|| format!("Failed to build configuration from {}", directory.display()))?;

    settings
        .try_deserialize::<Settings>()
        .context("Failed to deserialize settings")
}
