//! Role entity - represents a permission role in a guild

use serde::{Deserialize, Serialize};

use super::Identified;
use crate::value_objects::{Permissions, Snowflake};

/// Role snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: Snowflake,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub color: u32,
    #[serde(default)]
    pub hoist: bool,
    #[serde(default)]
    pub position: i32,
    #[serde(default)]
    pub permissions: Permissions,
    #[serde(default)]
    pub managed: bool,
    #[serde(default)]
    pub mentionable: bool,
}

impl Role {
    /// Check if this role grants a permission
    #[inline]
    pub fn has_permission(&self, permission: Permissions) -> bool {
        self.permissions.has(permission)
    }

    /// Get color as hex string (e.g., "#FF5733")
    pub fn color_hex(&self) -> String {
        format!("#{:06X}", self.color)
    }

    /// Mention string for this role
    pub fn mention(&self) -> String {
        format!("<@&{}>", self.id)
    }
}

impl Identified for Role {
    fn id(&self) -> Snowflake {
        self.id
    }
}
