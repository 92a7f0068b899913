use std::sync::Arc;

use async_trait::async_trait;
use shared::domain::{CrConCredentials, TcAdminCredentials};
use thiserror::Error;
use url::Url;

mod crcon;
mod tcadmin;

pub use crcon::{
    AutoBroadcastConfig, BroadcastEntry, HttpCrCon, OwnPermissions, Permissions, ServerSettings,
    REQUIRED_PERMISSIONS,
};
pub use tcadmin::{HttpTcAdmin, ServerInfo, HLL_FILE_ID, HLL_GAME_ID, HLL_MOD_ID};

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("invalid url {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("forbidden")]
    Forbidden,
    #[error("unexpected status code: {0}")]
    UnexpectedStatus(u16),
    #[error("request failed")]
    Failed,
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Game server administration API.
#[async_trait]
pub trait CrCon: Send + Sync {
    async fn set_team_switch_cooldown(&self, minutes: i64) -> RemoteResult<()>;
    async fn set_autobalance_threshold(&self, max_diff: i64) -> RemoteResult<()>;
    async fn set_welcome_message(&self, message: &str) -> RemoteResult<()>;
    async fn welcome_message(&self) -> RemoteResult<String>;
    async fn server_settings(&self) -> RemoteResult<ServerSettings>;
    async fn player_ids(&self) -> RemoteResult<Vec<String>>;
    async fn own_permissions(&self) -> RemoteResult<OwnPermissions>;
    async fn set_auto_broadcast_config(&self, config: &AutoBroadcastConfig) -> RemoteResult<()>;
    async fn set_profanities(&self, profanities: &[String]) -> RemoteResult<()>;
}

/// Hosting panel that owns the game server process.
#[async_trait]
pub trait TcAdmin: Send + Sync {
    async fn server_info(&self, service_id: &str) -> RemoteResult<ServerInfo>;
    async fn set_server_info(&self, service_id: &str, name: &str, password: &str)
        -> RemoteResult<()>;
    async fn restart(&self, service_id: &str) -> RemoteResult<String>;
}

/// Builds clients from stored credentials.
pub trait RemoteAdmin: Send + Sync {
    fn crcon(&self, credentials: &CrConCredentials) -> RemoteResult<Arc<dyn CrCon>>;
    fn tcadmin(&self, credentials: &TcAdminCredentials) -> RemoteResult<Arc<dyn TcAdmin>>;
}

/// Factory for the reqwest-backed clients. All clients share one connection pool.
#[derive(Debug, Clone, Default)]
pub struct HttpRemoteAdmin {
    http: reqwest::Client,
}

impl HttpRemoteAdmin {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

impl RemoteAdmin for HttpRemoteAdmin {
    fn crcon(&self, credentials: &CrConCredentials) -> RemoteResult<Arc<dyn CrCon>> {
        Ok(Arc::new(HttpCrCon::new(
            self.http.clone(),
            &credentials.base_url,
            &credentials.api_key,
        )?))
    }

    fn tcadmin(&self, credentials: &TcAdminCredentials) -> RemoteResult<Arc<dyn TcAdmin>> {
        Ok(Arc::new(HttpTcAdmin::new(
            self.http.clone(),
            &credentials.base_url,
            &credentials.username,
            &credentials.password,
        )?))
    }
}

/// Parses a base url, keeping any path prefix so endpoints are joined below it.
pub fn parse_base_url(raw: &str) -> RemoteResult<Url> {
    let mut url = Url::parse(raw.trim()).map_err(|source| RemoteError::InvalidUrl {
        url: raw.to_string(),
        source,
    })?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn endpoint(base: &Url, path: &str) -> RemoteResult<Url> {
    base.join(path.trim_start_matches('/'))
        .map_err(|source| RemoteError::InvalidUrl {
            url: format!("{base}{path}"),
            source,
        })
}

fn check_status(response: &reqwest::Response) -> RemoteResult<()> {
    match response.status() {
        reqwest::StatusCode::OK => Ok(()),
        reqwest::StatusCode::FORBIDDEN => Err(RemoteError::Forbidden),
        other => Err(RemoteError::UnexpectedStatus(other.as_u16())),
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
