use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use shared::domain::{Server, Template};
use storage::{ConfigFile, EntityStore};

const MASK: &str = "***";

/// Offline inspection of the bot's data directory.
#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = ".")]
    data_dir: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(subcommand)]
    Servers(ServersCommand),
    #[command(subcommand)]
    Templates(TemplatesCommand),
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug)]
enum ServersCommand {
    List,
    Show { id: String },
    Delete { id: String },
    /// Drops changes that were prepared but never applied.
    ClearPending { id: String },
}

#[derive(Subcommand, Debug)]
enum TemplatesCommand {
    List,
    Show { id: String },
    Delete { id: String },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Servers(command) => {
            let servers: EntityStore<Server> =
                EntityStore::open(cli.data_dir.join("servers")).await?;
            match command {
                ServersCommand::List => {
                    let mut all = servers.all().await?;
                    all.sort_by(|a, b| a.name.cmp(&b.name));
                    for server in all {
                        let pending = if server.pending_update.is_some() {
                            " (pending update)"
                        } else {
                            ""
                        };
                        println!("{}\t{}{pending}", server.server_id, server.name);
                    }
                }
                ServersCommand::Show { id } => {
                    let server = servers
                        .find(&id)
                        .await?
                        .with_context(|| format!("no server with id {id}"))?;
                    let mut value = serde_json::to_value(&server)?;
                    mask(&mut value, &["crcon_credentials", "api_key"]);
                    mask(&mut value, &["tcadmin_credentials", "password"]);
                    println!("{}", serde_json::to_string_pretty(&value)?);
                }
                ServersCommand::Delete { id } => {
                    servers.delete(&id).await?;
                    println!("deleted server {id}");
                }
                ServersCommand::ClearPending { id } => {
                    servers
                        .update(&id, |server| server.pending_update = None)
                        .await?
                        .with_context(|| format!("no server with id {id}"))?;
                    println!("cleared pending update of server {id}");
                }
            }
        }
        Command::Templates(command) => {
            let templates: EntityStore<Template> =
                EntityStore::open(cli.data_dir.join("templates")).await?;
            match command {
                TemplatesCommand::List => {
                    let mut all = templates.all().await?;
                    all.sort_by(|a, b| a.name.cmp(&b.name));
                    for template in all {
                        println!(
                            "{}\t{}\t{} broadcast messages",
                            template.id,
                            template.name,
                            template.broadcast_message.len()
                        );
                    }
                }
                TemplatesCommand::Show { id } => {
                    let template = templates
                        .find(&id)
                        .await?
                        .with_context(|| format!("no template with id {id}"))?;
                    println!("{}", serde_json::to_string_pretty(&template)?);
                }
                TemplatesCommand::Delete { id } => {
                    templates.delete(&id).await?;
                    println!("deleted template {id}");
                }
            }
        }
        Command::Config(ConfigCommand::Show) => {
            let config = ConfigFile::load_or_create(cli.data_dir.join("config.json")).await?;
            let mut value = serde_json::to_value(config.snapshot().await)?;
            mask(&mut value, &["discord", "token"]);
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
    }

    Ok(())
}

/// Replaces the non-empty string at `path` with a placeholder.
fn mask(value: &mut Value, path: &[&str]) {
    let mut current = value;
    for key in path {
        match current.get_mut(*key) {
            Some(next) => current = next,
            None => return,
        }
    }
    if current.as_str().is_some_and(|s| !s.is_empty()) {
        *current = Value::from(MASK);
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn secrets_are_masked_and_missing_paths_ignored() {
        let mut value = json!({
            "crcon_credentials": {"base_url": "https://rcon", "api_key": "key"},
            "tcadmin_credentials": null,
        });
        mask(&mut value, &["crcon_credentials", "api_key"]);
        mask(&mut value, &["tcadmin_credentials", "password"]);
        assert_eq!(value["crcon_credentials"]["api_key"], "***");
        assert_eq!(value["crcon_credentials"]["base_url"], "https://rcon");
        assert!(value["tcadmin_credentials"].is_null());
    }
}
