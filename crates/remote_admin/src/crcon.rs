use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::{check_status, endpoint, parse_base_url, CrCon, RemoteError, RemoteResult};

/// Permissions an API key must carry, no more and no less.
pub const REQUIRED_PERMISSIONS: &[&str] = &[
    "can_change_team_switch_cooldown",
    "can_view_team_switch_cooldown",
    "can_view_autobalance_threshold",
    "can_view_autobalance_enabled",
    "can_change_autobalance_enabled",
    "can_change_autobalance_threshold",
    "can_change_welcome_message",
    "can_view_welcome_message",
    "can_change_auto_broadcast_config",
    "can_view_auto_broadcast_config",
    "can_view_admins",
    "can_add_admin_roles",
    "can_remove_admin_roles",
    "can_unban_profanities",
    "can_view_profanities",
    "can_ban_profanities",
    "can_change_profanities",
    "can_view_playerids",
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ServerSettings {
    #[serde(default, rename = "autobalance_enabled")]
    pub auto_balance_enabled: bool,
    #[serde(default, rename = "autobalance_threshold")]
    pub auto_balance_threshold: i64,
    #[serde(default, rename = "idle_autokick_time")]
    pub idle_auto_kick_time: i64,
    #[serde(default, rename = "max_ping_autokick")]
    pub max_ping_auto_kick: i64,
    #[serde(default)]
    pub queue_length: i64,
    #[serde(default)]
    pub team_switch_cooldown: i64,
    #[serde(default, rename = "vip_slots_num")]
    pub vip_slots: i64,
    #[serde(default)]
    pub votekick_enabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Permissions(pub Vec<String>);

impl Permissions {
    /// True when both sides hold exactly the same permissions, in any order.
    pub fn contains_only(&self, required: &[&str]) -> bool {
        let mut granted: Vec<&str> = self.0.iter().map(String::as_str).collect();
        let mut required = required.to_vec();
        granted.sort_unstable();
        required.sort_unstable();
        granted == required
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwnPermissions {
    pub user_name: String,
    pub is_supervisor: bool,
    pub permissions: Permissions,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AutoBroadcastConfig {
    pub enabled: bool,
    pub randomize: bool,
    pub messages: Vec<BroadcastEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BroadcastEntry {
    pub time_sec: i64,
    pub message: String,
}

#[derive(Deserialize)]
struct Envelope<T> {
    result: Option<T>,
    #[serde(default)]
    failed: bool,
}

#[derive(Deserialize)]
struct RawPermissions {
    #[serde(default)]
    user_name: String,
    #[serde(default)]
    is_supervisor: bool,
    #[serde(default)]
    permissions: Vec<RawPermission>,
}

#[derive(Deserialize)]
struct RawPermission {
    permission: String,
}

#[derive(Serialize)]
struct SetTeamSwitchCooldown {
    minutes: i64,
    forward: bool,
}

#[derive(Serialize)]
struct SetAutoBalanceThreshold {
    max_diff: i64,
    forward: bool,
}

#[derive(Serialize)]
struct SetWelcomeMessage<'a> {
    message: &'a str,
    forward: bool,
}

#[derive(Serialize)]
struct SetProfanities<'a> {
    profanities: &'a [String],
}

pub struct HttpCrCon {
    http: Client,
    base: Url,
    api_key: String,
}

impl HttpCrCon {
    pub fn new(http: Client, base_url: &str, api_key: &str) -> RemoteResult<Self> {
        Ok(Self {
            http,
            base: parse_base_url(base_url)?,
            api_key: api_key.to_string(),
        })
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> RemoteResult<()> {
        let url = endpoint(&self.base, path)?;
        debug!(%url, "crcon post");
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;
        check_status(&response)?;
        // Some endpoints answer with an empty body; only an explicit failure counts.
        if let Ok(envelope) = response.json::<Envelope<serde_json::Value>>().await {
            if envelope.failed {
                return Err(RemoteError::Failed);
            }
        }
        Ok(())
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> RemoteResult<T> {
        let url = endpoint(&self.base, path)?;
        debug!(%url, "crcon get");
        let response = self
            .http
            .get(url)
            .query(query)
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        check_status(&response)?;
        let envelope: Envelope<T> = response.json().await?;
        match envelope {
            Envelope {
                failed: false,
                result: Some(result),
            } => Ok(result),
            _ => Err(RemoteError::Failed),
        }
    }
}

#[async_trait]
impl CrCon for HttpCrCon {
    async fn set_team_switch_cooldown(&self, minutes: i64) -> RemoteResult<()> {
        self.post(
            "/api/set_team_switch_cooldown",
            &SetTeamSwitchCooldown {
                minutes,
                forward: false,
            },
        )
        .await
    }

    async fn set_autobalance_threshold(&self, max_diff: i64) -> RemoteResult<()> {
        self.post(
            "/api/set_autobalance_threshold",
            &SetAutoBalanceThreshold {
                max_diff,
                forward: false,
            },
        )
        .await
    }

    async fn set_welcome_message(&self, message: &str) -> RemoteResult<()> {
        self.post(
            "/api/set_welcome_message",
            &SetWelcomeMessage {
                message,
                forward: false,
            },
        )
        .await
    }

    async fn welcome_message(&self) -> RemoteResult<String> {
        self.get("/api/get_welcome_message", &[]).await
    }

    async fn server_settings(&self) -> RemoteResult<ServerSettings> {
        self.get("/api/get_server_settings", &[]).await
    }

    async fn player_ids(&self) -> RemoteResult<Vec<String>> {
        let players: HashMap<String, String> =
            self.get("/api/get_playerids", &[("as_dict", "true")]).await?;
        Ok(players.into_values().collect())
    }

    async fn own_permissions(&self) -> RemoteResult<OwnPermissions> {
        let raw: RawPermissions = self.get("/api/get_own_user_permissions", &[]).await?;
        Ok(OwnPermissions {
            user_name: raw.user_name,
            is_supervisor: raw.is_supervisor,
            permissions: Permissions(raw.permissions.into_iter().map(|p| p.permission).collect()),
        })
    }

    async fn set_auto_broadcast_config(&self, config: &AutoBroadcastConfig) -> RemoteResult<()> {
        self.post("/api/set_auto_broadcasts_config", config).await
    }

    async fn set_profanities(&self, profanities: &[String]) -> RemoteResult<()> {
        self.post("/api/set_profanities", &SetProfanities { profanities })
            .await
    }
}

#[cfg(test)]
#[path = "tests/crcon_tests.rs"]
mod tests;
