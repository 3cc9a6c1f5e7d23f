//! Organization Config: the parsed spreadsheet describing groups, optional
//! sub-channels and members to seed into a tenant.
//!
//! Field names follow the camelCase wire format; the spreadsheet parser's
//! original column names (`classes`, `subjects`, `users`, `classCode`, ...)
//! are accepted as aliases.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Visibility of a sub-channel inside its group.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Every member of the group may join.
    #[default]
    Public,
    /// Only roles explicitly permitted for the channel code may join.
    Restricted,
}

/// A top-level collaboration space (e.g. a class).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub code: String,
    #[serde(alias = "name", default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
}

impl Group {
    /// Name shown on the remote server; falls back to the code.
    pub fn label(&self) -> &str {
        if self.display_name.trim().is_empty() {
            &self.code
        } else {
            &self.display_name
        }
    }
}

/// A topic-scoped space nested within every group (e.g. a subject).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", from = "SubChannelWire")]
pub struct SubChannel {
    pub code: String,
    pub display_name: String,
    pub visibility: Visibility,
}

impl SubChannel {
    pub fn is_restricted(&self) -> bool {
        self.visibility == Visibility::Restricted
    }

    pub fn label(&self) -> &str {
        if self.display_name.trim().is_empty() {
            &self.code
        } else {
            &self.display_name
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubChannelWire {
    code: String,
    #[serde(alias = "name", default)]
    display_name: String,
    visibility: Option<Visibility>,
    restricted: Option<bool>,
}

impl From<SubChannelWire> for SubChannel {
    fn from(wire: SubChannelWire) -> Self {
        let visibility = match (wire.visibility, wire.restricted) {
            (Some(visibility), _) => visibility,
            (None, Some(true)) => Visibility::Restricted,
            (None, _) => Visibility::Public,
        };
        SubChannel {
            code: wire.code,
            display_name: wire.display_name,
            visibility,
        }
    }
}

/// A person to create on the remote server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    #[validate(email(message = "Invalid member email"))]
    pub email: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(alias = "fullname", default)]
    pub full_name: String,
    #[serde(default)]
    pub role: String,
    #[serde(alias = "classCode", default)]
    pub group_code: Option<String>,
}

impl Member {
    /// The referenced group code, treating blank cells as absent.
    pub fn group(&self) -> Option<&str> {
        self.group_code
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.role.trim().eq_ignore_ascii_case(role)
    }

    pub fn is_teacher(&self) -> bool {
        self.has_role("teacher")
    }

    /// Source text for the member's remote username handle.
    pub fn username_source(&self) -> &str {
        if self.username.trim().is_empty() {
            &self.email
        } else {
            &self.username
        }
    }

    /// Identifier used in logs and seed reports.
    pub fn display_key(&self) -> &str {
        if self.email.is_empty() {
            &self.username
        } else {
            &self.email
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationConfig {
    #[serde(alias = "classes", default)]
    pub groups: Vec<Group>,
    #[serde(alias = "subjects", default)]
    pub sub_channels: Vec<SubChannel>,
    #[serde(alias = "users", default)]
    pub members: Vec<Member>,
}

impl OrganizationConfig {
    pub fn has_sub_channels(&self) -> bool {
        !self.sub_channels.is_empty()
    }
}
