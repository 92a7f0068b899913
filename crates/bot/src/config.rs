use std::path::PathBuf;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub bind_addr: String,
    pub data_dir: PathBuf,
    pub config_file: PathBuf,
    pub discord_api_url: String,
}

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_DATA_DIR: &str = ".";
const DEFAULT_CONFIG_FILE: &str = "./config.json";
const DEFAULT_DISCORD_API_URL: &str = "https://discord.com/api/v10";

/// Defaults, then `bot.toml` in the working directory, then `APP__*` variables.
pub fn load_settings() -> anyhow::Result<Settings> {
    load_settings_from("bot")
}

fn load_settings_from(file: &str) -> anyhow::Result<Settings> {
    let settings = config::Config::builder()
        .set_default("bind_addr", DEFAULT_BIND_ADDR)?
        .set_default("data_dir", DEFAULT_DATA_DIR)?
        .set_default("config_file", DEFAULT_CONFIG_FILE)?
        .set_default("discord_api_url", DEFAULT_DISCORD_API_URL)?
        .add_source(config::File::with_name(file).required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()
        .context("failed to read settings")?;

    let mut settings: Settings = settings
        .try_deserialize()
        .context("failed to parse settings")?;
    settings.discord_api_url = settings.discord_api_url.trim_end_matches('/').to_string();
    Ok(settings)
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
