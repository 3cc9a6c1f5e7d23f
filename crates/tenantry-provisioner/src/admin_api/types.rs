//! Request and response shapes of the remote admin REST API (v4).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Prefix of post types the server generates itself (joins, leaves, renames).
pub const SYSTEM_POST_PREFIX: &str = "system_";

#[derive(Debug, Clone, Serialize)]
pub struct NewUser<'a> {
    pub email: &'a str,
    pub username: &'a str,
    pub password: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    pub first_name: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Team {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub display_name: String,
}

/// Channel type: `O` open, `P` private.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ChannelType {
    #[serde(rename = "O")]
    Open,
    #[serde(rename = "P")]
    Private,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Channel {
    pub id: String,
    pub team_id: String,
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub header: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ChannelPatch<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<&'a str>,
}

impl ChannelPatch<'_> {
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none() && self.header.is_none()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Post {
    pub id: String,
    #[serde(rename = "type", default)]
    pub post_type: String,
    #[serde(default)]
    pub message: String,
}

impl Post {
    pub fn is_system(&self) -> bool {
        self.post_type.starts_with(SYSTEM_POST_PREFIX)
    }
}

/// One page of a channel's posts.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostList {
    #[serde(default)]
    pub order: Vec<String>,
    #[serde(default)]
    pub posts: HashMap<String, Post>,
}

impl PostList {
    /// System posts of the page, newest first.
    pub fn system_posts(&self) -> impl Iterator<Item = &Post> {
        self.order
            .iter()
            .filter_map(|id| self.posts.get(id))
            .filter(|post| post.is_system())
    }
}

/// Error body returned by the remote server.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}
