//! Guild entity - represents a server

use serde::{Deserialize, Serialize};

use super::{Channel, Emoji, Identified, Member, Role};
use crate::value_objects::Snowflake;

/// Guild snapshot
///
/// Nested collections are only populated by full guild payloads
/// (e.g. `GUILD_CREATE`); partial updates leave them empty.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Guild {
    pub id: Snowflake,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<Snowflake>,
    #[serde(default)]
    pub unavailable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member_count: Option<u64>,
    #[serde(default)]
    pub channels: Vec<Channel>,
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default)]
    pub emojis: Vec<Emoji>,
}

impl Guild {
    /// Check if a user is the guild owner
    #[inline]
    pub fn is_owner(&self, user_id: Snowflake) -> bool {
        self.owner_id == Some(user_id)
    }

    /// Get the guild icon URL if set
    pub fn icon_url(&self) -> Option<String> {
        self.icon
            .as_ref()
            .map(|hash| format!("https://cdn.discordapp.com/icons/{}/{}.png", self.id, hash))
    }
}

impl Identified for Guild {
    fn id(&self) -> Snowflake {
        self.id
    }
}

/// Guild stub sent in READY and GUILD_DELETE before (or instead of) the full guild
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnavailableGuild {
    pub id: Snowflake,
    #[serde(default)]
    pub unavailable: bool,
}

impl From<UnavailableGuild> for Guild {
    fn from(stub: UnavailableGuild) -> Self {
        Self {
            id: stub.id,
            unavailable: stub.unavailable,
            ..Self::default()
        }
    }
}
