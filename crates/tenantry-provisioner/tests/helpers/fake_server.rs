//! In-process stand-in for a tenant server's admin REST API.
//!
//! Stateful enough for idempotency tests: entities persist across requests,
//! duplicate creates answer 400 with an "exists" error id, and membership
//! changes leave system posts behind the way the real server does.

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};

pub const SESSION_TOKEN: &str = "fake-session-token";

#[derive(Debug, Clone)]
pub struct FakeUser {
    pub id: String,
    pub email: String,
    pub username: String,
    pub password: String,
    pub first_name: String,
}

#[derive(Debug, Clone)]
pub struct FakeChannel {
    pub id: String,
    pub team_id: String,
    pub name: String,
    pub display_name: String,
    pub header: String,
    pub channel_type: String,
    pub archived: bool,
}

#[derive(Debug, Clone)]
pub struct FakePost {
    pub id: String,
    pub channel_id: String,
    pub post_type: String,
}

#[derive(Debug, Default)]
pub struct FakeState {
    next_id: u64,
    /// Remaining ping requests answered 503.
    pub ping_failures: u32,
    pub ping_calls: u32,
    pub users: Vec<FakeUser>,
    /// team name -> team id
    pub teams: HashMap<String, String>,
    pub team_display_names: HashMap<String, String>,
    pub channels: Vec<FakeChannel>,
    /// (team id, user id) -> roles
    pub team_members: HashMap<(String, String), String>,
    pub channel_members: HashSet<(String, String)>,
    pub posts: Vec<FakePost>,
    /// Method and path of every request after routing, e.g. `POST /teams`.
    pub requests: Vec<String>,
}

impl FakeState {
    fn id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}{}", prefix, self.next_id)
    }

    fn system_post(&mut self, channel_id: &str, post_type: &str) {
        let id = self.id("post");
        self.posts.push(FakePost {
            id,
            channel_id: channel_id.to_string(),
            post_type: post_type.to_string(),
        });
    }

    fn add_channel(&mut self, team_id: &str, name: &str, display_name: &str, channel_type: &str) -> String {
        let id = self.id("channel");
        self.channels.push(FakeChannel {
            id: id.clone(),
            team_id: team_id.to_string(),
            name: name.to_string(),
            display_name: display_name.to_string(),
            header: String::new(),
            channel_type: channel_type.to_string(),
            archived: false,
        });
        id
    }

    pub fn user_by_email(&self, email: &str) -> Option<&FakeUser> {
        self.users
            .iter()
            .find(|user| user.email.eq_ignore_ascii_case(email))
    }

    pub fn channel(&self, team_name: &str, channel_name: &str) -> Option<&FakeChannel> {
        let team_id = self.teams.get(team_name)?;
        self.channels
            .iter()
            .find(|channel| channel.team_id == *team_id && channel.name == channel_name)
    }

    pub fn is_channel_member(&self, team_name: &str, channel_name: &str, email: &str) -> bool {
        match (self.channel(team_name, channel_name), self.user_by_email(email)) {
            (Some(channel), Some(user)) => self
                .channel_members
                .contains(&(channel.id.clone(), user.id.clone())),
            _ => false,
        }
    }

    pub fn team_roles(&self, team_name: &str, email: &str) -> Option<&str> {
        let team_id = self.teams.get(team_name)?;
        let user = self.user_by_email(email)?;
        self.team_members
            .get(&(team_id.clone(), user.id.clone()))
            .map(String::as_str)
    }

    pub fn system_post_count(&self) -> usize {
        self.posts
            .iter()
            .filter(|post| post.post_type.starts_with("system_"))
            .count()
    }

    pub fn request_count(&self, request: &str) -> usize {
        self.requests.iter().filter(|r| r.as_str() == request).count()
    }
}

type Shared = Arc<Mutex<FakeState>>;

pub struct FakeTenantServer {
    pub addr: SocketAddr,
    state: Shared,
}

impl FakeTenantServer {
    pub async fn start() -> Self {
        Self::start_with(FakeState::default()).await
    }

    /// A server whose first `failures` pings answer 503.
    pub async fn start_unhealthy(failures: u32) -> Self {
        Self::start_with(FakeState {
            ping_failures: failures,
            ..FakeState::default()
        })
        .await
    }

    async fn start_with(state: FakeState) -> Self {
        let state: Shared = Arc::new(Mutex::new(state));

        let app = Router::new()
            .route("/api/v4/system/ping", get(ping))
            .route("/api/v4/users", post(create_user))
            .route("/api/v4/users/login", post(login))
            .route("/api/v4/users/email/{email}", get(user_by_email))
            .route("/api/v4/teams", post(create_team))
            .route("/api/v4/teams/name/{name}", get(team_by_name))
            .route("/api/v4/teams/{team_id}/members", post(add_team_member))
            .route(
                "/api/v4/teams/{team_id}/members/{user_id}/roles",
                put(update_team_roles),
            )
            .route(
                "/api/v4/teams/{team_id}/channels/name/{name}",
                get(channel_by_name),
            )
            .route("/api/v4/channels", post(create_channel))
            .route("/api/v4/channels/{channel_id}", delete(archive_channel))
            .route("/api/v4/channels/{channel_id}/patch", put(patch_channel))
            .route(
                "/api/v4/channels/{channel_id}/members",
                post(add_channel_member),
            )
            .route("/api/v4/channels/{channel_id}/posts", get(channel_posts))
            .route("/api/v4/posts/{post_id}", delete(delete_post))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake tenant server");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve fake tenant server");
        });

        Self { addr, state }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().expect("fake state poisoned")
    }

    /// Pretend an account already exists, e.g. from an earlier deploy.
    pub fn seed_user(&self, email: &str, username: &str, password: &str) -> String {
        let mut state = self.state();
        let id = state.id("user");
        state.users.push(FakeUser {
            id: id.clone(),
            email: email.to_string(),
            username: username.to_string(),
            password: password.to_string(),
            first_name: String::new(),
        });
        id
    }
}

fn lock(state: &Shared) -> MutexGuard<'_, FakeState> {
    state.lock().expect("fake state poisoned")
}

fn error(status: StatusCode, id: &str, message: &str) -> Response {
    (status, Json(json!({ "id": id, "message": message, "status_code": status.as_u16() })))
        .into_response()
}

fn unauthorized() -> Response {
    error(
        StatusCode::UNAUTHORIZED,
        "api.context.session_expired.app_error",
        "Invalid or expired session, please login again.",
    )
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .map(|value| value == format!("Bearer {}", SESSION_TOKEN))
        .unwrap_or(false)
}

fn channel_json(channel: &FakeChannel) -> Value {
    json!({
        "id": channel.id,
        "team_id": channel.team_id,
        "name": channel.name,
        "display_name": channel.display_name,
        "header": channel.header,
        "type": channel.channel_type,
    })
}

async fn ping(State(state): State<Shared>) -> Response {
    let mut state = lock(&state);
    state.ping_calls += 1;
    if state.ping_failures > 0 {
        state.ping_failures -= 1;
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    Json(json!({ "status": "OK" })).into_response()
}

async fn create_user(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut state = lock(&state);
    state.requests.push("POST /users".to_string());

    // Open sign-up is closed once the first account exists.
    if !state.users.is_empty() && !authorized(&headers) {
        return error(
            StatusCode::FORBIDDEN,
            "api.user.create_user.signup_email_disabled.app_error",
            "User sign-up is disabled.",
        );
    }

    let email = body["email"].as_str().unwrap_or_default().to_string();
    let username = body["username"].as_str().unwrap_or_default().to_string();
    if email.is_empty() || username.is_empty() {
        return error(StatusCode::BAD_REQUEST, "model.user.is_valid.email.app_error", "Invalid user");
    }
    if state.user_by_email(&email).is_some() {
        return error(
            StatusCode::BAD_REQUEST,
            "app.user.save.email_exists.app_error",
            "An account with that email already exists.",
        );
    }
    if state.users.iter().any(|user| user.username == username) {
        return error(
            StatusCode::BAD_REQUEST,
            "app.user.save.username_exists.app_error",
            "An account with that username already exists.",
        );
    }

    let id = state.id("user");
    state.users.push(FakeUser {
        id: id.clone(),
        email: email.clone(),
        username: username.clone(),
        password: body["password"].as_str().unwrap_or_default().to_string(),
        first_name: body["first_name"].as_str().unwrap_or_default().to_string(),
    });

    (
        StatusCode::CREATED,
        Json(json!({ "id": id, "email": email, "username": username })),
    )
        .into_response()
}

async fn login(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let state = lock(&state);
    let login_id = body["login_id"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default();

    match state.user_by_email(login_id) {
        Some(user) if user.password == password => (
            StatusCode::OK,
            [("token", SESSION_TOKEN)],
            Json(json!({ "id": user.id, "email": user.email, "username": user.username })),
        )
            .into_response(),
        _ => error(
            StatusCode::UNAUTHORIZED,
            "api.user.login.invalid_credentials_email_username",
            "Enter a valid email or username and/or password.",
        ),
    }
}

async fn user_by_email(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(email): Path<String>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let state = lock(&state);
    match state.user_by_email(&email) {
        Some(user) => Json(json!({ "id": user.id, "email": user.email, "username": user.username }))
            .into_response(),
        None => error(StatusCode::NOT_FOUND, "app.user.missing_account.const", "Unable to find the user."),
    }
}

async fn create_team(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let mut state = lock(&state);
    state.requests.push("POST /teams".to_string());

    let name = body["name"].as_str().unwrap_or_default().to_string();
    let display_name = body["display_name"].as_str().unwrap_or_default().to_string();
    if state.teams.contains_key(&name) {
        return error(
            StatusCode::BAD_REQUEST,
            "store.sql_team.save_team.existing.app_error",
            "A team with that name already exists",
        );
    }

    let id = state.id("team");
    state.teams.insert(name.clone(), id.clone());
    state.team_display_names.insert(id.clone(), display_name.clone());
    state.add_channel(&id, "town-square", "Town Square", "O");
    state.add_channel(&id, "off-topic", "Off-Topic", "O");

    (
        StatusCode::CREATED,
        Json(json!({ "id": id, "name": name, "display_name": display_name })),
    )
        .into_response()
}

async fn team_by_name(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(name): Path<String>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let state = lock(&state);
    match state.teams.get(&name) {
        Some(id) => Json(json!({
            "id": id,
            "name": name,
            "display_name": state.team_display_names.get(id).cloned().unwrap_or_default(),
        }))
        .into_response(),
        None => error(StatusCode::NOT_FOUND, "app.team.get_by_name.missing.app_error", "Team not found"),
    }
}

async fn add_team_member(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(team_id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let mut state = lock(&state);
    let user_id = body["user_id"].as_str().unwrap_or_default().to_string();
    let key = (team_id.clone(), user_id.clone());

    if !state.team_members.contains_key(&key) {
        state.team_members.insert(key, "team_user".to_string());
        let town_square = state
            .channels
            .iter()
            .find(|channel| channel.team_id == team_id && channel.name == "town-square")
            .map(|channel| channel.id.clone());
        if let Some(channel_id) = town_square {
            state.channel_members.insert((channel_id.clone(), user_id.clone()));
            state.system_post(&channel_id, "system_join_team");
        }
    }

    (
        StatusCode::CREATED,
        Json(json!({ "team_id": team_id, "user_id": user_id })),
    )
        .into_response()
}

async fn update_team_roles(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path((team_id, user_id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let mut state = lock(&state);
    let key = (team_id, user_id);
    if !state.team_members.contains_key(&key) {
        return error(StatusCode::NOT_FOUND, "app.team.get_member.missing.app_error", "Member not found");
    }
    let roles = body["roles"].as_str().unwrap_or_default().to_string();
    state.team_members.insert(key, roles);
    Json(json!({ "status": "OK" })).into_response()
}

async fn channel_by_name(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path((team_id, name)): Path<(String, String)>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let state = lock(&state);
    match state
        .channels
        .iter()
        .find(|channel| channel.team_id == team_id && channel.name == name && !channel.archived)
    {
        Some(channel) => Json(channel_json(channel)).into_response(),
        None => error(StatusCode::NOT_FOUND, "app.channel.get_by_name.missing.app_error", "Channel not found"),
    }
}

async fn create_channel(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let mut state = lock(&state);
    state.requests.push("POST /channels".to_string());

    let team_id = body["team_id"].as_str().unwrap_or_default().to_string();
    let name = body["name"].as_str().unwrap_or_default().to_string();
    if state
        .channels
        .iter()
        .any(|channel| channel.team_id == team_id && channel.name == name)
    {
        return error(
            StatusCode::BAD_REQUEST,
            "store.sql_channel.save_channel.exists.app_error",
            "A channel with that name already exists on the same team",
        );
    }

    let display_name = body["display_name"].as_str().unwrap_or_default().to_string();
    let channel_type = body["type"].as_str().unwrap_or("O").to_string();
    let id = state.add_channel(&team_id, &name, &display_name, &channel_type);
    state.system_post(&id, "system_join_channel");

    let channel = state
        .channels
        .iter()
        .find(|channel| channel.id == id)
        .map(channel_json)
        .unwrap_or_default();
    (StatusCode::CREATED, Json(channel)).into_response()
}

async fn archive_channel(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(channel_id): Path<String>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let mut state = lock(&state);
    match state.channels.iter_mut().find(|channel| channel.id == channel_id) {
        Some(channel) => {
            channel.archived = true;
            Json(json!({ "status": "OK" })).into_response()
        }
        None => error(StatusCode::NOT_FOUND, "app.channel.get.find.app_error", "Channel not found"),
    }
}

async fn patch_channel(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(channel_id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let mut state = lock(&state);
    match state.channels.iter_mut().find(|channel| channel.id == channel_id) {
        Some(channel) => {
            if let Some(display_name) = body["display_name"].as_str() {
                channel.display_name = display_name.to_string();
            }
            if let Some(header) = body["header"].as_str() {
                channel.header = header.to_string();
            }
            Json(channel_json(channel)).into_response()
        }
        None => error(StatusCode::NOT_FOUND, "app.channel.get.find.app_error", "Channel not found"),
    }
}

async fn add_channel_member(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(channel_id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let mut state = lock(&state);
    let user_id = body["user_id"].as_str().unwrap_or_default().to_string();
    if state
        .channel_members
        .insert((channel_id.clone(), user_id.clone()))
    {
        state.system_post(&channel_id, "system_join_channel");
    }
    (
        StatusCode::CREATED,
        Json(json!({ "channel_id": channel_id, "user_id": user_id })),
    )
        .into_response()
}

async fn channel_posts(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(channel_id): Path<String>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let state = lock(&state);
    let posts: Vec<&FakePost> = state
        .posts
        .iter()
        .filter(|post| post.channel_id == channel_id)
        .collect();

    let order: Vec<&str> = posts.iter().rev().map(|post| post.id.as_str()).collect();
    let by_id: serde_json::Map<String, Value> = posts
        .iter()
        .map(|post| {
            (
                post.id.clone(),
                json!({ "id": post.id, "type": post.post_type, "message": "" }),
            )
        })
        .collect();

    Json(json!({ "order": order, "posts": by_id })).into_response()
}

async fn delete_post(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(post_id): Path<String>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let mut state = lock(&state);
    let before = state.posts.len();
    state.posts.retain(|post| post.id != post_id);
    if state.posts.len() == before {
        return error(StatusCode::NOT_FOUND, "app.post.get.app_error", "Post not found");
    }
    Json(json!({ "status": "OK" })).into_response()
}
