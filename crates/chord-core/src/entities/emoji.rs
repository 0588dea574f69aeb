//! Emoji entity - custom guild emoji or unicode emoji reference

use serde::{Deserialize, Serialize};

use crate::value_objects::Snowflake;

/// Emoji snapshot
///
/// Unicode emojis have no `id`; custom emojis have both `id` and `name`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Emoji {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Snowflake>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub animated: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<Snowflake>,
}

impl Emoji {
    /// Check if this is a custom guild emoji
    #[inline]
    pub fn is_custom(&self) -> bool {
        self.id.is_some()
    }

    /// Form used in reaction endpoints (`name:id` for custom, raw name otherwise)
    pub fn reaction_key(&self) -> String {
        let name = self.name.as_deref().unwrap_or_default();
        match self.id {
            Some(id) => format!("{name}:{id}"),
            None => name.to_string(),
        }
    }
}
