use std::{
    io,
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::{Deserialize, Serialize};
use shared::domain::{ApplicationId, ChannelId, GuildId, MessageId};
use tokio::{fs, sync::RwLock};
use tracing::info;

use crate::{Result, StoreError};

/// The process-wide singleton record, persisted as `config.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub discord: Option<DiscordConfig>,
    #[serde(default)]
    pub embed_message: Option<EmbedMessage>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscordConfig {
    #[serde(default)]
    pub token: String,
    #[serde(default, rename = "guild")]
    pub guild_id: Option<GuildId>,
    #[serde(default)]
    pub application_id: Option<ApplicationId>,
    #[serde(default)]
    pub public_key: String,
}

/// The management message the bot keeps posted in a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedMessage {
    #[serde(rename = "ChannelId")]
    pub channel_id: ChannelId,
    #[serde(rename = "MessageId")]
    pub message_id: MessageId,
}

/// Shared handle to the configuration record.
///
/// Mutations go through [`ConfigFile::update`], which writes the record back
/// before releasing the lock.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    path: PathBuf,
    state: Arc<RwLock<Config>>,
}

impl ConfigFile {
    /// Reads the record at `path`, creating an empty one if it does not exist yet.
    pub async fn load_or_create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let config = match fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|source| StoreError::Serde {
                    path: path.clone(),
                    source,
                })?,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                info!(path = %path.display(), "config file missing, creating an empty one");
                Config::default()
            }
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        let file = Self {
            path,
            state: Arc::new(RwLock::new(config)),
        };
        file.save().await?;
        Ok(file)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn snapshot(&self) -> Config {
        self.state.read().await.clone()
    }

    pub async fn update<R>(&self, mutate: impl FnOnce(&mut Config) -> R) -> Result<R> {
        let mut state = self.state.write().await;
        let outcome = mutate(&mut *state);
        write_record(&self.path, &*state).await?;
        Ok(outcome)
    }

    pub async fn save(&self) -> Result<()> {
        let state = self.state.read().await;
        write_record(&self.path, &*state).await
    }
}

async fn write_record(path: &Path, config: &Config) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
    }
    let bytes = serde_json::to_vec_pretty(config).map_err(|source| StoreError::Serde {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, bytes).await.map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })
}
