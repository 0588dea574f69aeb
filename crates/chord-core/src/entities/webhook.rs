//! Webhook entity

use serde::{Deserialize, Serialize};

use super::User;
use crate::value_objects::Snowflake;

/// Webhook snapshot
///
/// `token` is only returned for incoming webhooks the bot may execute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Webhook {
    pub id: Snowflake,
    /// 1 incoming, 2 channel follower, 3 application
    #[serde(rename = "type", default = "default_webhook_type")]
    pub kind: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<Snowflake>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_id: Option<Snowflake>,
}

fn default_webhook_type() -> u8 {
    1
}

impl Webhook {
    /// Check if the webhook can be executed with its token
    #[inline]
    pub fn is_executable(&self) -> bool {
        self.kind == 1 && self.token.is_some()
    }
}
