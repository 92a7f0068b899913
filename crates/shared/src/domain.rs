use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

id_newtype!(ApplicationId);
id_newtype!(GuildId);
id_newtype!(ChannelId);
id_newtype!(MessageId);
id_newtype!(InteractionId);
id_newtype!(CommandId);

/// A persisted record addressed by a stable string identifier.
pub trait Identifiable {
    fn id(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrConCredentials {
    pub base_url: String,
    pub api_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TcAdminCredentials {
    pub base_url: String,
    pub service_id: String,
    pub username: String,
    pub password: String,
}

/// Changes collected across workflow steps and applied by the save step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerUpdate {
    #[serde(default)]
    pub template_id: String,
    #[serde(default)]
    pub server_name: String,
    #[serde(default)]
    pub server_password: String,
}

impl ServerUpdate {
    pub fn requires_restart(&self) -> bool {
        !self.server_name.is_empty() || !self.server_password.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    pub server_id: String,
    pub name: String,
    #[serde(default)]
    pub crcon_credentials: Option<CrConCredentials>,
    #[serde(default)]
    pub tcadmin_credentials: Option<TcAdminCredentials>,
    #[serde(default)]
    pub pending_update: Option<ServerUpdate>,
}

impl Server {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            server_id: Uuid::new_v4().to_string(),
            name: name.into(),
            crcon_credentials: None,
            tcadmin_credentials: None,
            pending_update: None,
        }
    }

    pub fn pending_update_mut(&mut self) -> &mut ServerUpdate {
        self.pending_update.get_or_insert_with(ServerUpdate::default)
    }
}

impl Identifiable for Server {
    fn id(&self) -> &str {
        &self.server_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastMessage {
    pub time: i64,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub team_switch_cooldown: i64,
    #[serde(default)]
    pub auto_balance_threshold: i64,
    #[serde(default)]
    pub server_name_template: String,
    #[serde(default)]
    pub welcome_message: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub broadcast_message: Vec<BroadcastMessage>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub profanity_filter: Vec<String>,
}

impl Template {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            ..Self::default()
        }
    }
}

impl Identifiable for Template {
    fn id(&self) -> &str {
        &self.id
    }
}

// Records written by older releases store empty lists as `null`.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
