use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Account role carried in every access token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Section,
    Viewer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Section => "section",
            Role::Viewer => "viewer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown role '{0}' (expected admin, section or viewer)")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "section" => Ok(Role::Section),
            "viewer" => Ok(Role::Viewer),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// A verified caller: the subject of a valid access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: i64,
    pub username: String,
    pub role: Role,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Viewers are read-only.
    pub fn can_submit_reports(&self) -> bool {
        matches!(self.role, Role::Admin | Role::Section)
    }

    /// Owner of the report, or an admin.
    pub fn can_manage_report(&self, owner_section_id: i64) -> bool {
        match self.role {
            Role::Admin => true,
            Role::Section => self.user_id == owner_section_id,
            Role::Viewer => false,
        }
    }

    /// Read access to one report: its owner, an admin or a viewer.
    pub fn can_read_report(&self, owner_section_id: i64) -> bool {
        self.can_read_all_sections() || self.user_id == owner_section_id
    }

    /// Cross-section listings (summaries, weekly aggregates of every section).
    pub fn can_read_all_sections(&self) -> bool {
        matches!(self.role, Role::Admin | Role::Viewer)
    }
}
