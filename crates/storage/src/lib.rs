use std::{
    collections::HashMap,
    io,
    marker::PhantomData,
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::{de::DeserializeOwned, Serialize};
use shared::domain::Identifiable;
use thiserror::Error;
use tokio::{fs, sync::Mutex};
use tracing::debug;
use uuid::Uuid;

mod config_file;

pub use config_file::{Config, ConfigFile, DiscordConfig, EmbedMessage};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid entity id {0:?}")]
    InvalidId(String),
    #[error("i/o failure on {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed record {}", path.display())]
    Serde {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn serde(path: &Path, source: serde_json::Error) -> Self {
        Self::Serde {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub type Result<T, E = StoreError> = std::result::Result<T, E>;

/// One JSON file per entity, named after the entity id, inside a per-kind directory.
///
/// Clones share the directory and the per-id locks used by [`EntityStore::update`].
pub struct EntityStore<T> {
    dir: PathBuf,
    locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
    _kind: PhantomData<fn() -> T>,
}

impl<T> Clone for EntityStore<T> {
    fn clone(&self) -> Self {
        Self {
            dir: self.dir.clone(),
            locks: Arc::clone(&self.locks),
            _kind: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for EntityStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityStore").field("dir", &self.dir).finish()
    }
}

impl<T> EntityStore<T>
where
    T: Identifiable + Serialize + DeserializeOwned,
{
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .await
            .map_err(|source| StoreError::io(&dir, source))?;
        Ok(Self {
            dir,
            locks: Arc::default(),
            _kind: PhantomData,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn find(&self, id: &str) -> Result<Option<T>> {
        let path = self.path_for(id)?;
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(StoreError::io(&path, error)),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| StoreError::serde(&path, source))
    }

    pub async fn save(&self, entity: &T) -> Result<()> {
        let path = self.path_for(entity.id())?;
        let bytes =
            serde_json::to_vec_pretty(entity).map_err(|source| StoreError::serde(&path, source))?;

        // Readers only ever see a complete record: write aside, then rename over.
        let staging = self
            .dir
            .join(format!(".{}.{}.tmp", entity.id(), Uuid::new_v4()));
        if let Err(error) = fs::write(&staging, &bytes).await {
            return Err(StoreError::io(&staging, error));
        }
        if let Err(error) = fs::rename(&staging, &path).await {
            let _ = fs::remove_file(&staging).await;
            return Err(StoreError::io(&path, error));
        }
        debug!(id = entity.id(), dir = %self.dir.display(), "entity saved");
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        let path = self.path_for(id)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(StoreError::io(&path, error)),
        }
    }

    pub async fn list(&self) -> Result<Vec<String>> {
        let mut entries = fs::read_dir(&self.dir)
            .await
            .map_err(|source| StoreError::io(&self.dir, source))?;
        let mut ids = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|source| StoreError::io(&self.dir, source))?
        {
            let file_type = entry
                .file_type()
                .await
                .map_err(|source| StoreError::io(&entry.path(), source))?;
            if !file_type.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            ids.push(name);
        }
        Ok(ids)
    }

    /// Loads every entity, skipping ids removed between listing and reading.
    pub async fn all(&self) -> Result<Vec<T>> {
        let mut entities = Vec::new();
        for id in self.list().await? {
            if let Some(entity) = self.find(&id).await? {
                entities.push(entity);
            }
        }
        Ok(entities)
    }

    /// Find, mutate and save one entity while holding its id lock.
    ///
    /// Returns `Ok(None)` when no entity exists under `id`.
    pub async fn update<R>(&self, id: &str, mutate: impl FnOnce(&mut T) -> R) -> Result<Option<R>> {
        validate_id(id)?;
        let lock = {
            let mut locks = self.locks.lock().await;
            Arc::clone(locks.entry(id.to_string()).or_default())
        };
        let outcome = {
            let _guard = lock.lock().await;
            self.mutate_and_save(id, mutate).await
        };
        self.release_lock(id, &lock).await;
        outcome
    }

    async fn mutate_and_save<R>(&self, id: &str, mutate: impl FnOnce(&mut T) -> R) -> Result<Option<R>> {
        let Some(mut entity) = self.find(id).await? else {
            return Ok(None);
        };
        let outcome = mutate(&mut entity);
        self.save(&entity).await?;
        Ok(Some(outcome))
    }

    /// Drops the id lock once no other caller holds or waits on it.
    async fn release_lock(&self, id: &str, lock: &Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().await;
        // One reference lives in the map, the other is ours.
        if Arc::strong_count(lock) == 2 {
            locks.remove(id);
        }
    }

    fn path_for(&self, id: &str) -> Result<PathBuf> {
        validate_id(id)?;
        Ok(self.dir.join(id))
    }
}

fn validate_id(id: &str) -> Result<()> {
    let invalid = id.is_empty() || id.starts_with('.') || id.contains(['/', '\\']);
    if invalid {
        return Err(StoreError::InvalidId(id.to_string()));
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
