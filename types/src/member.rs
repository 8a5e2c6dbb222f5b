use serde::{Deserialize, Serialize};

use crate::{MemberId, RoleId};

/// A role as reported by the platform. Higher `rank` sits higher in the
/// role hierarchy; the implicit everyone-role has rank 0 and is not listed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    #[serde(default)]
    pub rank: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    /// Platform (bot) account.
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub roles: Vec<Role>,
}

impl Member {
    pub fn new(id: impl Into<MemberId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            display_name: None,
            is_bot: false,
            roles: Vec::new(),
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.roles.push(role);
        self
    }

    pub fn bot(mut self) -> Self {
        self.is_bot = true;
        self
    }

    /// Name shown to other members (nickname when set).
    pub fn shown_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    /// Rank of the highest role held, or 0 when the member holds no ranked role.
    pub fn top_rank(&self) -> u32 {
        self.roles.iter().map(|role| role.rank).max().unwrap_or(0)
    }

    pub fn has_role(&self, role: RoleId) -> bool {
        self.roles.iter().any(|r| r.id == role)
    }

    pub fn has_role_named(&self, name: &str) -> bool {
        self.roles.iter().any(|r| r.name == name)
    }
}
