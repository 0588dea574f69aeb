//! User entity - an account on the remote service

use serde::{Deserialize, Serialize};

use super::Identified;
use crate::value_objects::Snowflake;

/// User snapshot
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct User {
    pub id: Snowflake,
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discriminator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default)]
    pub bot: bool,
}

impl User {
    /// Get display name (global name if set, otherwise username)
    pub fn display_name(&self) -> &str {
        self.global_name.as_deref().unwrap_or(&self.username)
    }

    /// Get the avatar CDN path if an avatar is set
    pub fn avatar_url(&self) -> Option<String> {
        self.avatar
            .as_ref()
            .map(|hash| format!("https://cdn.discordapp.com/avatars/{}/{}.png", self.id, hash))
    }

    /// Mention string for this user
    pub fn mention(&self) -> String {
        format!("<@{}>", self.id)
    }
}

impl Identified for User {
    fn id(&self) -> Snowflake {
        self.id
    }
}
