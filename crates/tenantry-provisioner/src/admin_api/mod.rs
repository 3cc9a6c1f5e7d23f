//! HTTP client for a tenant server's administrative REST API (v4).
//!
//! A client starts unauthenticated (first account creation, login)
//! and is turned into an authenticated one with [`AdminApiClient::with_token`].
//! Every call carries the configured request timeout.

pub mod types;

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::AdminApiError;
pub use types::{Channel, ChannelPatch, ChannelType, NewUser, Post, PostList, Team, User};
use types::ErrorBody;

const API_PREFIX: &str = "/api/v4";

/// Team role string granting group-administrator privileges.
pub const TEAM_ADMIN_ROLES: &str = "team_user team_admin";

#[derive(Clone, Debug)]
pub struct AdminApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl AdminApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AdminApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(AdminApiError::Client)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// Same server, authenticated with a session token.
    pub fn with_token(&self, token: impl Into<String>) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            token: Some(token.into()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    fn build_url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, API_PREFIX, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let request = self.client.request(method, self.build_url(path));
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(
        &self,
        method: &'static str,
        path: &str,
        request: RequestBuilder,
    ) -> Result<Response, AdminApiError> {
        let response = request
            .send()
            .await
            .map_err(|source| AdminApiError::Transport {
                method,
                path: path.to_string(),
                source,
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let (error_id, message) = match response.json::<ErrorBody>().await {
            Ok(body) => (
                body.id,
                body.message.unwrap_or_else(|| "Unknown error".to_string()),
            ),
            Err(_) => (None, "Unknown error".to_string()),
        };

        Err(AdminApiError::Status {
            method,
            path: path.to_string(),
            status: status.as_u16(),
            error_id,
            message,
        })
    }

    async fn decode<T: DeserializeOwned>(
        path: &str,
        response: Response,
    ) -> Result<T, AdminApiError> {
        response
            .json()
            .await
            .map_err(|source| AdminApiError::Decode {
                path: path.to_string(),
                source,
            })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, AdminApiError> {
        let response = self.send("GET", path, self.request(Method::GET, path)).await?;
        Self::decode(path, response).await
    }

    async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, AdminApiError> {
        let request = self.request(Method::POST, path).json(body);
        let response = self.send("POST", path, request).await?;
        Self::decode(path, response).await
    }

    /// POST where the response body is not needed.
    async fn post_unit<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(), AdminApiError> {
        let request = self.request(Method::POST, path).json(body);
        self.send("POST", path, request).await?;
        Ok(())
    }

    async fn put_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Response, AdminApiError> {
        let request = self.request(Method::PUT, path).json(body);
        self.send("PUT", path, request).await
    }

    async fn delete(&self, path: &str) -> Result<(), AdminApiError> {
        self.send("DELETE", path, self.request(Method::DELETE, path))
            .await?;
        Ok(())
    }

    // Session

    /// Log in and return the session token from the `Token` response header.
    pub async fn login(&self, login_id: &str, password: &str) -> Result<String, AdminApiError> {
        let path = "/users/login";
        let request = self
            .request(Method::POST, path)
            .json(&serde_json::json!({ "login_id": login_id, "password": password }));
        let response = self.send("POST", path, request).await?;

        response
            .headers()
            .get("Token")
            .and_then(|value| value.to_str().ok())
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .ok_or(AdminApiError::MissingToken)
    }

    // Users

    pub async fn create_user(&self, user: &NewUser<'_>) -> Result<User, AdminApiError> {
        self.post_json("/users", user).await
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<User, AdminApiError> {
        self.get(&format!("/users/email/{}", urlencoding::encode(email)))
            .await
    }

    // Teams (groups)

    /// Create an invite-only team.
    pub async fn create_team(&self, name: &str, display_name: &str) -> Result<Team, AdminApiError> {
        self.post_json(
            "/teams",
            &serde_json::json!({ "name": name, "display_name": display_name, "type": "I" }),
        )
        .await
    }

    pub async fn get_team_by_name(&self, name: &str) -> Result<Team, AdminApiError> {
        self.get(&format!("/teams/name/{}", urlencoding::encode(name)))
            .await
    }

    pub async fn add_team_member(&self, team_id: &str, user_id: &str) -> Result<(), AdminApiError> {
        self.post_unit(
            &format!("/teams/{}/members", team_id),
            &serde_json::json!({ "team_id": team_id, "user_id": user_id }),
        )
        .await
    }

    pub async fn update_team_member_roles(
        &self,
        team_id: &str,
        user_id: &str,
        roles: &str,
    ) -> Result<(), AdminApiError> {
        self.put_json(
            &format!("/teams/{}/members/{}/roles", team_id, user_id),
            &serde_json::json!({ "roles": roles }),
        )
        .await?;
        Ok(())
    }

    // Channels

    pub async fn create_channel(
        &self,
        team_id: &str,
        name: &str,
        display_name: &str,
        channel_type: ChannelType,
    ) -> Result<Channel, AdminApiError> {
        self.post_json(
            "/channels",
            &serde_json::json!({
                "team_id": team_id,
                "name": name,
                "display_name": display_name,
                "type": channel_type,
            }),
        )
        .await
    }

    pub async fn get_channel_by_name(
        &self,
        team_id: &str,
        name: &str,
    ) -> Result<Channel, AdminApiError> {
        self.get(&format!(
            "/teams/{}/channels/name/{}",
            team_id,
            urlencoding::encode(name)
        ))
        .await
    }

    pub async fn patch_channel(
        &self,
        channel_id: &str,
        patch: &ChannelPatch<'_>,
    ) -> Result<Channel, AdminApiError> {
        let path = format!("/channels/{}/patch", channel_id);
        let response = self.put_json(&path, patch).await?;
        Self::decode(&path, response).await
    }

    /// Archive (soft-delete) a channel.
    pub async fn archive_channel(&self, channel_id: &str) -> Result<(), AdminApiError> {
        self.delete(&format!("/channels/{}", channel_id)).await
    }

    pub async fn add_channel_member(
        &self,
        channel_id: &str,
        user_id: &str,
    ) -> Result<(), AdminApiError> {
        self.post_unit(
            &format!("/channels/{}/members", channel_id),
            &serde_json::json!({ "user_id": user_id }),
        )
        .await
    }

    // Posts

    pub async fn list_channel_posts(
        &self,
        channel_id: &str,
        page: u32,
        per_page: u32,
    ) -> Result<PostList, AdminApiError> {
        self.get(&format!(
            "/channels/{}/posts?page={}&per_page={}",
            channel_id, page, per_page
        ))
        .await
    }

    pub async fn delete_post(&self, post_id: &str) -> Result<(), AdminApiError> {
        self.delete(&format!("/posts/{}", post_id)).await
    }
}
