use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use dispatcher::Dispatcher;
use remote_admin::HttpRemoteAdmin;
use shared::domain::{Server, Template};
use storage::{ConfigFile, EntityStore};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod app_state;
mod commands;
mod config;
mod discord;
mod interactions;

#[cfg(test)]
#[path = "tests/fakes.rs"]
mod fakes;

use crate::{
    app_state::AppState,
    commands::Deps,
    config::load_settings,
    discord::RestSession,
    interactions::{build_router, parse_public_key},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(log_filter()).init();

    let settings = load_settings()?;
    let config = ConfigFile::load_or_create(&settings.config_file)
        .await
        .with_context(|| format!("failed to open {}", settings.config_file.display()))?;
    let discord = config.snapshot().await.discord.unwrap_or_default();
    if discord.token.is_empty() {
        anyhow::bail!(
            "no discord token configured, fill the discord section of {}",
            config.path().display()
        );
    }
    let guild_id = discord
        .guild_id
        .clone()
        .context("discord.guild must name the server the bot manages")?;
    let application_id = discord
        .application_id
        .clone()
        .context("discord.application_id is required")?;
    let verifying_key = parse_public_key(&discord.public_key)?;

    let servers: EntityStore<Server> = EntityStore::open(settings.data_dir.join("servers")).await?;
    let templates: EntityStore<Template> =
        EntityStore::open(settings.data_dir.join("templates")).await?;

    let http = reqwest::Client::builder()
        .user_agent(concat!("server-watcher/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("failed to build http client")?;
    let session = Arc::new(RestSession::new(
        http.clone(),
        &settings.discord_api_url,
        &discord.token,
        application_id,
    ));

    let deps = Deps {
        servers,
        templates,
        config: config.clone(),
        remote: Arc::new(HttpRemoteAdmin::new(http)),
    };
    let mut dispatcher = Dispatcher::new(guild_id, session);
    commands::register_all(&mut dispatcher, &deps)?;
    let report = dispatcher.synchronize().await.map_err(|error| {
        error!(%error, "could not synchronize commands");
        error
    })?;
    info!(
        created = report.created.len(),
        deleted = report.deleted.len(),
        "commands ready"
    );

    let app = build_router(Arc::new(AppState {
        dispatcher: Arc::new(dispatcher),
        verifying_key,
    }));
    let addr: SocketAddr = settings.bind_addr.parse()?;
    info!(%addr, "interactions endpoint listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("shutting down");
    if let Err(error) = config.save().await {
        warn!(%error, "could not save config");
    }
    Ok(())
}

/// `DEBUG` switches everything to debug, otherwise `RUST_LOG` applies.
fn log_filter() -> EnvFilter {
    if std::env::var_os("DEBUG").is_some() {
        return EnvFilter::new("debug");
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            error!(%error, "could not listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => error!(%error, "could not listen for SIGTERM"),
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
