use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::{check_status, endpoint, parse_base_url, RemoteError, RemoteResult, TcAdmin};

/// Game, mod and file ids the panel uses for Hell Let Loose services.
pub const HLL_GAME_ID: &str = "1098726659";
pub const HLL_MOD_ID: &str = "0";
pub const HLL_FILE_ID: &str = "1";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Serialize)]
struct ServiceSettings<'a> {
    game_id: &'a str,
    mod_id: &'a str,
    file_id: &'a str,
    name: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct RestartStatus {
    #[serde(default)]
    status: String,
}

pub struct HttpTcAdmin {
    http: Client,
    base: Url,
    username: String,
    password: String,
}

impl HttpTcAdmin {
    /// `base_url` may omit the scheme, the panel form asks for a bare host.
    pub fn new(http: Client, base_url: &str, username: &str, password: &str) -> RemoteResult<Self> {
        let base_url = base_url.trim();
        let base = if base_url.contains("://") {
            parse_base_url(base_url)?
        } else {
            parse_base_url(&format!("https://{base_url}"))?
        };
        Ok(Self {
            http,
            base,
            username: username.to_string(),
            password: password.to_string(),
        })
    }

    fn service_url(&self, service_id: &str, action: &str) -> RemoteResult<Url> {
        let mut url = endpoint(&self.base, "api/services/")?;
        url.path_segments_mut()
            .map_err(|()| RemoteError::InvalidUrl {
                url: self.base.to_string(),
                source: url::ParseError::RelativeUrlWithCannotBeABaseBase,
            })?
            .pop_if_empty()
            .push(service_id)
            .extend(action.split('/').filter(|s| !s.is_empty()));
        Ok(url)
    }
}

#[async_trait]
impl TcAdmin for HttpTcAdmin {
    async fn server_info(&self, service_id: &str) -> RemoteResult<ServerInfo> {
        let url = self.service_url(service_id, "")?;
        debug!(%url, "tcadmin server info");
        let response = self
            .http
            .get(url)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await?;
        check_status(&response)?;
        Ok(response.json().await?)
    }

    async fn set_server_info(&self, service_id: &str, name: &str, password: &str) -> RemoteResult<()> {
        let url = self.service_url(service_id, "settings")?;
        debug!(%url, "tcadmin set server info");
        let response = self
            .http
            .put(url)
            .basic_auth(&self.username, Some(&self.password))
            .json(&ServiceSettings {
                game_id: HLL_GAME_ID,
                mod_id: HLL_MOD_ID,
                file_id: HLL_FILE_ID,
                name,
                password,
            })
            .send()
            .await?;
        check_status(&response)
    }

    async fn restart(&self, service_id: &str) -> RemoteResult<String> {
        let url = self.service_url(service_id, "restart")?;
        debug!(%url, "tcadmin restart");
        let response = self
            .http
            .post(url)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await?;
        check_status(&response)?;
        let status: RestartStatus = response.json().await?;
        Ok(status.status)
    }
}

#[cfg(test)]
#[path = "tests/tcadmin_tests.rs"]
mod tests;
