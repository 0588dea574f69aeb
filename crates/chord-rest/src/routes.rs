//! Typed endpoint helpers

use crate::client::RestClient;
use chord_common::{ClientError, ClientResult};
use chord_core::{Channel, Guild, Invite, Message, Snowflake, User, Webhook};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

/// Answer of `GET /gateway`
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayInfo {
    pub url: String,
}

impl RestClient {
    async fn get_typed<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let value = self.call(Method::GET, path, None).await?;
        serde_json::from_value(value).map_err(ClientError::from)
    }

    /// Fetch the WebSocket URL to connect the gateway to
    pub async fn gateway_url(&self) -> ClientResult<String> {
        let info: GatewayInfo = self.get_typed("/gateway").await?;
        Ok(info.url)
    }

    pub async fn current_user(&self) -> ClientResult<User> {
        self.get_typed("/users/@me").await
    }

    /// Partial guild objects for every guild the bot is in
    pub async fn current_user_guilds(&self) -> ClientResult<Vec<Guild>> {
        self.get_typed("/users/@me/guilds").await
    }

    pub async fn guild(&self, guild_id: Snowflake) -> ClientResult<Guild> {
        self.get_typed(&format!("/guilds/{guild_id}")).await
    }

    pub async fn channel(&self, channel_id: Snowflake) -> ClientResult<Channel> {
        self.get_typed(&format!("/channels/{channel_id}")).await
    }

    pub async fn user(&self, user_id: Snowflake) -> ClientResult<User> {
        self.get_typed(&format!("/users/{user_id}")).await
    }

    /// Look up an invite by code, with approximate member counts
    pub async fn invite(&self, code: &str) -> ClientResult<Invite> {
        let code = code.trim_start_matches("https://discord.gg/");
        if code.is_empty() || code.contains('/') {
            return Err(ClientError::invalid_input(format!("invalid invite code: {code:?}")));
        }

        let mut value = self
            .call(Method::GET, &format!("/invites/{code}?with_counts=true"), None)
            .await?;
        flatten_invite(&mut value);
        serde_json::from_value(value).map_err(ClientError::from)
    }

    pub async fn webhook(&self, webhook_id: Snowflake) -> ClientResult<Webhook> {
        self.get_typed(&format!("/webhooks/{webhook_id}")).await
    }

    /// Post a plain text message to a channel
    pub async fn send_message(&self, channel_id: Snowflake, content: &str) -> ClientResult<Message> {
        if content.is_empty() {
            return Err(ClientError::invalid_input("message content must not be empty"));
        }

        let body = json!({ "content": content });
        let value = self
            .call(Method::POST, &format!("/channels/{channel_id}/messages"), Some(&body))
            .await?;
        serde_json::from_value(value).map_err(ClientError::from)
    }
}

/// The invite endpoint nests `channel` and `guild`; lift their ids
fn flatten_invite(value: &mut Value) {
    let Some(invite) = value.as_object_mut() else {
        return;
    };
    for (nested, key) in [("channel", "channel_id"), ("guild", "guild_id")] {
        if invite.contains_key(key) {
            continue;
        }
        if let Some(id) = invite.get(nested).and_then(|n| n.get("id")).cloned() {
            invite.insert(key.to_string(), id);
        }
    }
}
